use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::cache::EntityKind;
use crate::catalog::destinations::{self, DestinationPatch, NewDestination};
use crate::error::AppResult;
use crate::extractors::{AdminUser, MaybeUser};
use crate::media::{self, ImageOwner, UploadMeta};
use crate::routes::{read_form, FormData, UploadedFile};
use crate::state::AppState;

const BUCKET: &str = "destinations";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/destinations", get(list).post(create))
        .route(
            "/api/destinations/{id}",
            get(get_one).put(update).delete(remove),
        )
}

#[derive(Deserialize)]
struct ListQuery {
    slug: Option<String>,
}

/// Public listing of published destinations; admins see drafts too.
/// `?slug=` narrows to one destination.
async fn list(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    let is_admin = maybe_user.0.map(|u| u.is_admin).unwrap_or(false);

    if let Some(ref slug) = query.slug {
        let destination = destinations::get_by_slug(&state.db, slug, is_admin)?;
        return Ok(Json(vec![destination]).into_response());
    }

    // Only the public shape is cached; admin reads always hit the database
    if !is_admin {
        if let Some(cached) = state.listings.get(EntityKind::Destination, "published") {
            return Ok(Json(cached).into_response());
        }
    }

    let listed = destinations::list(&state.db, !is_admin)?;
    let body = serde_json::to_value(&listed)?;
    if !is_admin {
        state
            .listings
            .put(EntityKind::Destination, "published", body.clone());
    }
    Ok(Json(body).into_response())
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Response> {
    let destination = destinations::get_by_id(&state.db, &id)?;
    Ok(Json(destination).into_response())
}

/// Store one uploaded file in the destinations bucket and record its
/// metadata against the owner.
fn store_image(
    state: &AppState,
    destination_id: &str,
    file: &UploadedFile,
    is_hero: bool,
    display_order: i64,
) -> AppResult<String> {
    let stored = state.media.upload(
        BUCKET,
        None,
        &file.filename,
        &file.mime_type,
        &file.data,
    )?;
    media::assets::record_upload(
        &state.db,
        UploadMeta {
            url: stored.url.clone(),
            bucket: BUCKET.to_string(),
            filename: file.filename.clone(),
            file_path: stored.path,
            file_size: file.data.len() as i64,
            mime_type: file.mime_type.clone(),
            width: None,
            height: None,
            alt: None,
            is_hero,
            display_order,
            owner: Some(ImageOwner::Destination(destination_id.to_string())),
        },
    )?;
    Ok(stored.url)
}

async fn create(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = read_form(multipart).await?;

    let new = NewDestination {
        name: form.required_text("name")?.to_string(),
        slug: form.required_text("slug")?.to_string(),
        tagline: form.text("tagline").unwrap_or_default().to_string(),
        description: form.text("description").unwrap_or_default().to_string(),
        hero_image: None,
        sections: form.json_field("sections")?.unwrap_or_default(),
        highlights: form.string_list_field("highlights")?.unwrap_or_default(),
        fun_facts: form.string_list_field("funFacts")?.unwrap_or_default(),
        is_published: form.bool_field("isPublished").unwrap_or(false),
        created_by: Some(user.id),
    };

    let destination = destinations::create(&state.db, new)?;

    // An upload failure from here on aborts the request; the row exists but
    // the client sees the error, never a partial success
    let mut hero_url = None;
    if let Some(file) = form.files_named("heroImage").next() {
        hero_url = Some(store_image(&state, &destination.id, file, true, 0)?);
    }
    for (i, file) in form.files_named("images").enumerate() {
        store_image(&state, &destination.id, file, false, (i + 1) as i64)?;
    }

    let destination = if let Some(hero_url) = hero_url {
        destinations::update(
            &state.db,
            &destination.id,
            DestinationPatch {
                hero_image: Some(Some(hero_url)),
                ..Default::default()
            },
        )?
    } else {
        destinations::get_by_id(&state.db, &destination.id)?
    };

    state.listings.invalidate(EntityKind::Destination);
    Ok((StatusCode::CREATED, Json(destination)).into_response())
}

fn patch_from_form(form: &FormData) -> AppResult<DestinationPatch> {
    Ok(DestinationPatch {
        name: form.text("name").map(str::to_string),
        slug: form.text("slug").map(str::to_string),
        tagline: form.text("tagline").map(str::to_string),
        description: form.text("description").map(str::to_string),
        hero_image: None,
        sections: form.json_field("sections")?,
        highlights: form.string_list_field("highlights")?,
        fun_facts: form.string_list_field("funFacts")?,
        is_published: form.bool_field("isPublished"),
    })
}

async fn update(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = read_form(multipart).await?;
    let mut patch = patch_from_form(&form)?;

    let existing = destinations::get_by_id(&state.db, &id)?;
    let image_count = existing.images.len() as i64;

    if let Some(file) = form.files_named("heroImage").next() {
        let url = store_image(&state, &id, file, true, 0)?;
        patch.hero_image = Some(Some(url));
    }
    for (i, file) in form.files_named("images").enumerate() {
        store_image(&state, &id, file, false, image_count + 1 + i as i64)?;
    }

    let destination = destinations::update(&state.db, &id, patch)?;
    state.listings.invalidate(EntityKind::Destination);
    Ok(Json(destination).into_response())
}

async fn remove(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    destinations::delete(&state.db, &state.media, &id)?;
    state.listings.invalidate(EntityKind::Destination);
    Ok(Json(serde_json::json!({ "ok": true })).into_response())
}
