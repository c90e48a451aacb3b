//! Standalone image management for the admin panel: direct uploads, explicit
//! deletes, and bucket browsing. Entity routes handle their own attached
//! uploads; this surface is for everything else.

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extractors::AdminUser;
use crate::media::{self, ImageOwner, UploadMeta};
use crate::routes::read_form;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/images/upload", post(upload))
        .route("/api/images/delete", post(delete))
        .route("/api/images/list", get(list))
}

async fn upload(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = read_form(multipart).await?;

    let file = form
        .files_named("file")
        .next()
        .ok_or_else(|| AppError::validation("Missing file part 'file'"))?;
    let bucket = form.required_text("bucket")?;
    let folder = form.text("folder");

    let owner = match (form.text("packageId"), form.text("destinationId")) {
        (Some(_), Some(_)) => {
            return Err(AppError::validation(
                "An image belongs to a package or a destination, not both",
            ));
        }
        (Some(id), None) => Some(ImageOwner::Package(id.to_string())),
        (None, Some(id)) => Some(ImageOwner::Destination(id.to_string())),
        (None, None) => None,
    };

    let stored = state
        .media
        .upload(bucket, folder, &file.filename, &file.mime_type, &file.data)?;

    let record = media::assets::record_upload(
        &state.db,
        UploadMeta {
            url: stored.url.clone(),
            bucket: bucket.to_string(),
            filename: file.filename.clone(),
            file_path: stored.path,
            file_size: file.data.len() as i64,
            mime_type: file.mime_type.clone(),
            width: form.i64_field("width")?,
            height: form.i64_field("height")?,
            alt: form.text("alt").map(str::to_string),
            is_hero: form.bool_field("isHero").unwrap_or(false),
            display_order: form.i64_field("displayOrder")?.unwrap_or(0),
            owner,
        },
    )?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "url": stored.url, "imageId": record.id })),
    )
        .into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteBody {
    image_id: Option<String>,
    url: Option<String>,
}

/// Delete by record id, or by public URL for objects the admin pasted in.
/// Unlike the entity cascade, a storage failure here is surfaced to the
/// caller.
async fn delete(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Json(body): Json<DeleteBody>,
) -> AppResult<Response> {
    match (body.image_id, body.url) {
        (Some(image_id), _) => {
            let record = media::assets::get(&state.db, &image_id)?;
            state.media.delete(&record.bucket, &record.file_path)?;
            media::assets::delete(&state.db, &image_id)?;
        }
        (None, Some(url)) => {
            if let Some(record) = media::assets::find_by_url(&state.db, &url)? {
                state.media.delete(&record.bucket, &record.file_path)?;
                media::assets::delete(&state.db, &record.id)?;
            } else {
                // No metadata row; fall back to resolving the URL directly
                let (bucket, path) = state.media.parse_public_url(&url)?;
                state.media.delete(&bucket, &path)?;
            }
        }
        (None, None) => {
            return Err(AppError::validation("Provide 'imageId' or 'url'"));
        }
    }

    Ok(Json(serde_json::json!({ "ok": true })).into_response())
}

#[derive(Deserialize)]
struct ListQuery {
    bucket: String,
    folder: Option<String>,
    limit: Option<usize>,
}

async fn list(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    let objects = state
        .media
        .list(&query.bucket, query.folder.as_deref(), query.limit)?;
    Ok(Json(objects).into_response())
}
