use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;
use serde_json::json;

use crate::auth::session;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Whitelist-gated signup. The whitelist row is consumed in the same
/// transaction that creates the user; a created user without a consumed
/// entry must never be observable.
pub async fn signup(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> AppResult<Response> {
    let email = creds.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("A valid email is required"));
    }
    if creds.password.len() < 8 {
        return Err(AppError::validation(
            "Password must be at least 8 characters",
        ));
    }

    let password_hash = bcrypt::hash(&creds.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let user_id = uuid::Uuid::now_v7().to_string();
    {
        let mut conn = state.db.get()?;
        let tx = conn.transaction()?;

        let available: Option<bool> = tx
            .query_row(
                "SELECT is_used = 0 FROM whitelisted_emails WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        match available {
            Some(true) => {}
            Some(false) => {
                return Err(AppError::validation("This email has already been used"));
            }
            None => {
                return Err(AppError::validation(
                    "This email is not approved for account creation",
                ));
            }
        }

        tx.execute(
            "INSERT INTO users (id, email, password_hash, is_admin) VALUES (?1, ?2, ?3, 1)",
            params![user_id, email, password_hash],
        )?;
        tx.execute(
            "UPDATE whitelisted_emails SET is_used = 1, used_by = ?1 WHERE email = ?2",
            params![user_id, email],
        )?;
        tx.commit()?;
    }

    tracing::info!("Admin account created for {}", email);

    let token = session::create_session(&state.db, &user_id, state.config.auth.session_hours)?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&state, &token))],
        Json(json!({ "id": user_id, "email": email, "isAdmin": true })),
    )
        .into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> AppResult<Response> {
    let email = creds.email.trim().to_lowercase();

    let conn = state.db.get()?;
    let user: Option<(String, String, bool)> = conn
        .query_row(
            "SELECT id, password_hash, is_admin FROM users WHERE email = ?1",
            params![email],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    drop(conn);

    let (user_id, password_hash, is_admin) = user.ok_or(AppError::Unauthenticated)?;

    let valid = bcrypt::verify(&creds.password, &password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
    if !valid {
        return Err(AppError::Unauthenticated);
    }

    let token = session::create_session(&state.db, &user_id, state.config.auth.session_hours)?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state, &token))],
        Json(json!({ "id": user_id, "email": email, "isAdmin": is_admin })),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    _user: CurrentUser,
    headers: HeaderMap,
) -> AppResult<Response> {
    if let Some(token) = crate::extractors::session_token_from_headers(
        &headers,
        &state.config.auth.cookie_name,
    ) {
        session::delete_session(&state.db, &token)?;
    }

    let cleared = format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        state.config.auth.cookie_name
    );
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cleared)],
        Json(json!({ "ok": true })),
    )
        .into_response())
}

fn session_cookie(state: &AppState, token: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        state.config.auth.cookie_name,
        token,
        state.config.auth.session_hours * 3600
    )
}
