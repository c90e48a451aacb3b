//! Testimonial repository. Visitors create them unauthenticated; nothing is
//! publicly visible until an admin approves it.

use rusqlite::{params, OptionalExtension, Row};

use crate::db::models::Testimonial;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Public listings never show more than this many testimonials.
pub const PUBLIC_LIMIT: usize = 6;

#[derive(Debug, Clone)]
pub struct NewTestimonial {
    pub name: String,
    pub email: String,
    pub location: String,
    pub rating: i64,
    pub text: String,
    pub trip_type: Option<String>,
}

const COLUMNS: &str = "id, name, email, location, rating, text, trip_type, is_approved, created_at";

fn from_row(row: &Row) -> rusqlite::Result<Testimonial> {
    Ok(Testimonial {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        location: row.get(3)?,
        rating: row.get(4)?,
        text: row.get(5)?,
        trip_type: row.get(6)?,
        is_approved: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Visitor submission. Always stored unapproved, whatever the input claims.
pub fn create(pool: &DbPool, new: NewTestimonial) -> AppResult<Testimonial> {
    if new.name.trim().is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    if new.email.trim().is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    if new.location.trim().is_empty() {
        return Err(AppError::validation("Location is required"));
    }
    if new.text.trim().is_empty() {
        return Err(AppError::validation("Testimonial text is required"));
    }
    if !(1..=5).contains(&new.rating) {
        return Err(AppError::validation("Rating must be between 1 and 5"));
    }

    let id = uuid::Uuid::now_v7().to_string();
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO testimonials (id, name, email, location, rating, text, trip_type, is_approved) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
        params![
            id,
            new.name.trim(),
            new.email.trim(),
            new.location.trim(),
            new.rating,
            new.text.trim(),
            new.trip_type,
        ],
    )?;
    drop(conn);

    get_by_id(pool, &id)
}

pub fn get_by_id(pool: &DbPool, id: &str) -> AppResult<Testimonial> {
    let conn = pool.get()?;
    conn.query_row(
        &format!("SELECT {} FROM testimonials WHERE id = ?1", COLUMNS),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// Approved testimonials, newest first, capped at [`PUBLIC_LIMIT`].
pub fn list_approved(pool: &DbPool) -> AppResult<Vec<Testimonial>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM testimonials WHERE is_approved = 1 ORDER BY created_at DESC LIMIT ?1",
        COLUMNS
    ))?;
    let records = stmt
        .query_map(params![PUBLIC_LIMIT as i64], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Admin view: everything, pending first.
pub fn list_all(pool: &DbPool) -> AppResult<Vec<Testimonial>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM testimonials ORDER BY is_approved ASC, created_at DESC",
        COLUMNS
    ))?;
    let records = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

pub fn set_approved(pool: &DbPool, id: &str, is_approved: bool) -> AppResult<Testimonial> {
    let conn = pool.get()?;
    let updated = conn.execute(
        "UPDATE testimonials SET is_approved = ?1 WHERE id = ?2",
        params![is_approved, id],
    )?;
    drop(conn);

    if updated == 0 {
        return Err(AppError::NotFound);
    }
    get_by_id(pool, id)
}

pub fn delete(pool: &DbPool, id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM testimonials WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
