use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::cache::EntityKind;
use crate::catalog::packages::{self, NewPackage, PackagePatch};
use crate::catalog::query::{self, FilterSpec, DEFAULT_PAGE_SIZE};
use crate::db::models::PackageType;
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, MaybeUser};
use crate::media::{self, ImageOwner, UploadMeta};
use crate::routes::{read_form, FormData, UploadedFile};
use crate::state::AppState;

const BUCKET: &str = "packages";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/packages", get(list).post(create))
        .route(
            "/api/packages/{id}",
            get(get_one).put(update).delete(remove),
        )
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ListQuery {
    category: Option<String>,
    price_range: Option<String>,
    duration: Option<String>,
    sort_by: Option<String>,
    page: Option<usize>,
    include_inactive: Option<bool>,
}

impl ListQuery {
    fn filter(&self) -> FilterSpec {
        let defaults = FilterSpec::default();
        FilterSpec {
            category: self.category.clone().unwrap_or(defaults.category),
            price_range: self.price_range.clone().unwrap_or(defaults.price_range),
            duration: self.duration.clone().unwrap_or(defaults.duration),
            sort_by: self.sort_by.clone().unwrap_or(defaults.sort_by),
        }
    }
}

/// Public package listing with facet filtering, sorting and pagination.
/// Admins may pass `includeInactive=true` to see deactivated packages.
async fn list(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    let is_admin = maybe_user.0.map(|u| u.is_admin).unwrap_or(false);
    let include_inactive = is_admin && query.include_inactive.unwrap_or(false);
    let page = query.page.unwrap_or(1).max(1);
    let filter = query.filter();

    let cache_key = format!("{}|page={}", filter.cache_key(), page);
    if !include_inactive {
        if let Some(cached) = state.listings.get(EntityKind::Package, &cache_key) {
            return Ok(Json(cached).into_response());
        }
    }

    let all = packages::list(&state.db, !include_inactive)?;
    let filtered = query::apply(&all, &filter);
    let paged = query::paginate(&filtered, page, DEFAULT_PAGE_SIZE);

    let body = serde_json::to_value(&paged)?;
    if !include_inactive {
        state.listings.put(EntityKind::Package, &cache_key, body.clone());
    }
    Ok(Json(body).into_response())
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Response> {
    let package = packages::get_by_id(&state.db, &id)?;
    Ok(Json(package).into_response())
}

fn store_image(
    state: &AppState,
    package_id: &str,
    file: &UploadedFile,
    is_hero: bool,
    display_order: i64,
) -> AppResult<()> {
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
            url: stored.url,
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
            owner: Some(ImageOwner::Package(package_id.to_string())),
        },
    )?;
    Ok(())
}

fn package_type_field(form: &FormData) -> AppResult<Option<PackageType>> {
    match form.text("packageType") {
        None => Ok(None),
        Some(raw) => PackageType::parse(raw).map(Some).ok_or_else(|| {
            AppError::validation(format!("Unknown package type '{}'", raw))
        }),
    }
}

async fn create(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = read_form(multipart).await?;

    let new = NewPackage {
        name: form.required_text("name")?.to_string(),
        slug: form.required_text("slug")?.to_string(),
        package_type: package_type_field(&form)?
            .ok_or_else(|| AppError::validation("Missing field 'packageType'"))?,
        description: form.text("description").unwrap_or_default().to_string(),
        pricing: form
            .f64_field("pricing")?
            .ok_or_else(|| AppError::validation("Missing field 'pricing'"))?,
        days_of_travel: form
            .i64_field("daysOfTravel")?
            .ok_or_else(|| AppError::validation("Missing field 'daysOfTravel'"))?,
        max_capacity: form
            .i64_field("maxCapacity")?
            .ok_or_else(|| AppError::validation("Missing field 'maxCapacity'"))?,
        current_bookings: form.i64_field("currentBookings")?.unwrap_or(0),
        is_active: form.bool_field("isActive").unwrap_or(true),
        destination_id: form.text("destinationId").map(str::to_string),
        created_by: Some(user.id),
    };

    let package = packages::create(&state.db, new)?;

    for (i, file) in form.files_named("images").enumerate() {
        store_image(&state, &package.id, file, i == 0, i as i64)?;
    }

    let package = packages::get_by_id(&state.db, &package.id)?;
    state.listings.invalidate(EntityKind::Package);
    Ok((StatusCode::CREATED, Json(package)).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleBody {
    is_active: bool,
}

/// PUT branches on content type: a JSON body toggles `isActive` only, a
/// multipart body edits the full record and may append images.
async fn update(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<String>,
    request: Request,
) -> AppResult<Response> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let package = if content_type.starts_with("application/json") {
        let Json(body): Json<ToggleBody> = Json::from_request(request, &state)
            .await
            .map_err(|e| AppError::validation(format!("Malformed JSON body: {}", e)))?;
        packages::set_active(&state.db, &id, body.is_active)?
    } else if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::validation(format!("Malformed multipart body: {}", e)))?;
        let form = read_form(multipart).await?;

        let patch = PackagePatch {
            name: form.text("name").map(str::to_string),
            slug: form.text("slug").map(str::to_string),
            package_type: package_type_field(&form)?,
            description: form.text("description").map(str::to_string),
            pricing: form.f64_field("pricing")?,
            days_of_travel: form.i64_field("daysOfTravel")?,
            max_capacity: form.i64_field("maxCapacity")?,
            current_bookings: form.i64_field("currentBookings")?,
            is_active: form.bool_field("isActive"),
            destination_id: form.text("destinationId").map(|v| {
                if v.is_empty() {
                    None
                } else {
                    Some(v.to_string())
                }
            }),
        };

        let existing = packages::get_by_id(&state.db, &id)?;
        let image_count = existing.images.len() as i64;
        for (i, file) in form.files_named("images").enumerate() {
            store_image(&state, &id, file, false, image_count + i as i64)?;
        }

        packages::update(&state.db, &id, patch)?
    } else {
        return Err(AppError::validation(format!(
            "Unsupported content type '{}'",
            content_type
        )));
    };

    state.listings.invalidate(EntityKind::Package);
    Ok(Json(package).into_response())
}

async fn remove(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    packages::delete(&state.db, &state.media, &id)?;
    state.listings.invalidate(EntityKind::Package);
    Ok(Json(serde_json::json!({ "ok": true })).into_response())
}
