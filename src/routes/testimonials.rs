use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::cache::EntityKind;
use crate::catalog::testimonials::{self, NewTestimonial};
use crate::error::AppResult;
use crate::extractors::{AdminUser, MaybeUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/testimonials", get(list).post(create))
        .route(
            "/api/testimonials/{id}",
            put(set_approved).delete(remove),
        )
}

/// Public: the approved shortlist. Admins get everything, pending first.
async fn list(State(state): State<AppState>, maybe_user: MaybeUser) -> AppResult<Response> {
    let is_admin = maybe_user.0.map(|u| u.is_admin).unwrap_or(false);

    if is_admin {
        let listed = testimonials::list_all(&state.db)?;
        return Ok(Json(listed).into_response());
    }

    if let Some(cached) = state.listings.get(EntityKind::Testimonial, "approved") {
        return Ok(Json(cached).into_response());
    }
    let listed = testimonials::list_approved(&state.db)?;
    let body = serde_json::to_value(&listed)?;
    state
        .listings
        .put(EntityKind::Testimonial, "approved", body.clone());
    Ok(Json(body).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionBody {
    name: String,
    email: String,
    location: String,
    rating: i64,
    text: String,
    trip_type: Option<String>,
}

/// Visitor submission, no authentication required. The record stays hidden
/// until approved.
async fn create(
    State(state): State<AppState>,
    Json(body): Json<SubmissionBody>,
) -> AppResult<Response> {
    let created = testimonials::create(
        &state.db,
        NewTestimonial {
            name: body.name,
            email: body.email,
            location: body.location,
            rating: body.rating,
            text: body.text,
            trip_type: body.trip_type,
        },
    )?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApprovalBody {
    is_approved: bool,
}

async fn set_approved(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<ApprovalBody>,
) -> AppResult<Response> {
    let updated = testimonials::set_approved(&state.db, &id, body.is_approved)?;
    state.listings.invalidate(EntityKind::Testimonial);
    Ok(Json(updated).into_response())
}

async fn remove(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    testimonials::delete(&state.db, &id)?;
    state.listings.invalidate(EntityKind::Testimonial);
    Ok(Json(serde_json::json!({ "ok": true })).into_response())
}
