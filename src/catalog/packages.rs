//! Package repository.

use rusqlite::{params, OptionalExtension, Row};

use crate::catalog::slug;
use crate::db::models::{DestinationSummary, Package, PackageType};
use crate::error::{AppError, AppResult};
use crate::media::{self, ImageOwner, MediaStore};
use crate::state::DbPool;

#[derive(Debug, Clone)]
pub struct NewPackage {
    pub name: String,
    pub slug: String,
    pub package_type: PackageType,
    pub description: String,
    pub pricing: f64,
    pub days_of_travel: i64,
    pub max_capacity: i64,
    pub current_bookings: i64,
    pub is_active: bool,
    pub destination_id: Option<String>,
    pub created_by: Option<String>,
}

/// Partial update; only `Some` fields are touched.
#[derive(Debug, Clone, Default)]
pub struct PackagePatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub package_type: Option<PackageType>,
    pub description: Option<String>,
    pub pricing: Option<f64>,
    pub days_of_travel: Option<i64>,
    pub max_capacity: Option<i64>,
    pub current_bookings: Option<i64>,
    pub is_active: Option<bool>,
    pub destination_id: Option<Option<String>>,
}

const COLUMNS: &str = "p.id, p.slug, p.name, p.package_type, p.description, p.pricing, \
     p.days_of_travel, p.max_capacity, p.current_bookings, p.is_active, p.created_by, \
     p.created_at, p.updated_at, d.id, d.slug, d.name";

const FROM: &str = "FROM packages p LEFT JOIN destinations d ON d.id = p.destination_id";

fn from_row(row: &Row) -> rusqlite::Result<Package> {
    let type_str: String = row.get(3)?;
    let destination = match row.get::<_, Option<String>>(13)? {
        Some(id) => Some(DestinationSummary {
            id,
            slug: row.get(14)?,
            name: row.get(15)?,
        }),
        None => None,
    };
    Ok(Package {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        package_type: PackageType::parse(&type_str).unwrap_or(PackageType::Mixed),
        description: row.get(4)?,
        pricing: row.get(5)?,
        days_of_travel: row.get(6)?,
        max_capacity: row.get(7)?,
        current_bookings: row.get(8)?,
        images: Vec::new(),
        is_active: row.get(9)?,
        destination,
        created_by: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn attach_images(pool: &DbPool, package: &mut Package) -> AppResult<()> {
    let records = media::assets::list_for_owner(pool, &ImageOwner::Package(package.id.clone()))?;
    package.images = records.into_iter().map(|r| r.url).collect();
    Ok(())
}

fn validate_numbers(
    pricing: f64,
    days_of_travel: i64,
    max_capacity: i64,
    current_bookings: i64,
) -> AppResult<()> {
    if !pricing.is_finite() || pricing < 0.0 {
        return Err(AppError::validation("Pricing must be non-negative"));
    }
    if days_of_travel < 1 {
        return Err(AppError::validation("Days of travel must be at least 1"));
    }
    if max_capacity < 1 {
        return Err(AppError::validation("Max capacity must be at least 1"));
    }
    if current_bookings < 0 || current_bookings > max_capacity {
        return Err(AppError::validation(
            "Current bookings must be between 0 and max capacity",
        ));
    }
    Ok(())
}

fn check_destination_exists(pool: &DbPool, destination_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM destinations WHERE id = ?1",
        params![destination_id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(AppError::validation("Unknown destination"))
    }
}

pub fn list(pool: &DbPool, active_only: bool) -> AppResult<Vec<Package>> {
    let conn = pool.get()?;
    let sql = if active_only {
        format!(
            "SELECT {} {} WHERE p.is_active = 1 ORDER BY p.created_at DESC",
            COLUMNS, FROM
        )
    } else {
        format!("SELECT {} {} ORDER BY p.created_at DESC", COLUMNS, FROM)
    };
    let mut stmt = conn.prepare(&sql)?;
    let mut packages = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);
    drop(conn);

    for package in &mut packages {
        attach_images(pool, package)?;
    }
    Ok(packages)
}

pub fn get_by_id(pool: &DbPool, id: &str) -> AppResult<Package> {
    let conn = pool.get()?;
    let package = conn
        .query_row(
            &format!("SELECT {} {} WHERE p.id = ?1", COLUMNS, FROM),
            params![id],
            from_row,
        )
        .optional()?;
    drop(conn);

    let mut package = package.ok_or(AppError::NotFound)?;
    attach_images(pool, &mut package)?;
    Ok(package)
}

pub fn get_by_slug(pool: &DbPool, slug: &str, include_inactive: bool) -> AppResult<Package> {
    let conn = pool.get()?;
    let sql = if include_inactive {
        format!("SELECT {} {} WHERE p.slug = ?1", COLUMNS, FROM)
    } else {
        format!(
            "SELECT {} {} WHERE p.slug = ?1 AND p.is_active = 1",
            COLUMNS, FROM
        )
    };
    let package = conn.query_row(&sql, params![slug], from_row).optional()?;
    drop(conn);

    let mut package = package.ok_or(AppError::NotFound)?;
    attach_images(pool, &mut package)?;
    Ok(package)
}

pub fn create(pool: &DbPool, new: NewPackage) -> AppResult<Package> {
    if new.name.trim().is_empty() {
        return Err(AppError::validation("Package name is required"));
    }
    let slug = slug::canonicalize(&new.slug)?;
    validate_numbers(
        new.pricing,
        new.days_of_travel,
        new.max_capacity,
        new.current_bookings,
    )?;
    if let Some(ref destination_id) = new.destination_id {
        check_destination_exists(pool, destination_id)?;
    }

    let conn = pool.get()?;
    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM packages WHERE slug = ?1",
        params![slug],
        |row| row.get(0),
    )?;
    if taken {
        return Err(AppError::validation(format!(
            "Slug '{}' is already in use",
            slug
        )));
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO packages (id, slug, name, package_type, description, pricing, \
         days_of_travel, max_capacity, current_bookings, is_active, destination_id, created_by) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            id,
            slug,
            new.name.trim(),
            new.package_type.as_str(),
            new.description,
            new.pricing,
            new.days_of_travel,
            new.max_capacity,
            new.current_bookings,
            new.is_active,
            new.destination_id,
            new.created_by,
        ],
    )?;
    drop(conn);

    get_by_id(pool, &id)
}

pub fn update(pool: &DbPool, id: &str, patch: PackagePatch) -> AppResult<Package> {
    let current = get_by_id(pool, id)?;

    let slug = match &patch.slug {
        Some(requested) => {
            let slug = slug::canonicalize(requested)?;
            if slug != current.slug {
                let conn = pool.get()?;
                let taken: bool = conn.query_row(
                    "SELECT COUNT(*) > 0 FROM packages WHERE slug = ?1 AND id != ?2",
                    params![slug, id],
                    |row| row.get(0),
                )?;
                if taken {
                    return Err(AppError::validation(format!(
                        "Slug '{}' is already in use",
                        slug
                    )));
                }
            }
            slug
        }
        None => current.slug.clone(),
    };

    let name = patch.name.unwrap_or(current.name);
    if name.trim().is_empty() {
        return Err(AppError::validation("Package name is required"));
    }

    let pricing = patch.pricing.unwrap_or(current.pricing);
    let days_of_travel = patch.days_of_travel.unwrap_or(current.days_of_travel);
    let max_capacity = patch.max_capacity.unwrap_or(current.max_capacity);
    let current_bookings = patch.current_bookings.unwrap_or(current.current_bookings);
    validate_numbers(pricing, days_of_travel, max_capacity, current_bookings)?;

    let destination_id = match patch.destination_id {
        Some(destination_id) => {
            if let Some(ref destination_id) = destination_id {
                check_destination_exists(pool, destination_id)?;
            }
            destination_id
        }
        None => current.destination.map(|d| d.id),
    };

    let conn = pool.get()?;
    conn.execute(
        "UPDATE packages SET slug = ?1, name = ?2, package_type = ?3, description = ?4, \
         pricing = ?5, days_of_travel = ?6, max_capacity = ?7, current_bookings = ?8, \
         is_active = ?9, destination_id = ?10, updated_at = datetime('now') WHERE id = ?11",
        params![
            slug,
            name.trim(),
            patch
                .package_type
                .unwrap_or(current.package_type)
                .as_str(),
            patch.description.unwrap_or(current.description),
            pricing,
            days_of_travel,
            max_capacity,
            current_bookings,
            patch.is_active.unwrap_or(current.is_active),
            destination_id,
            id,
        ],
    )?;
    drop(conn);

    get_by_id(pool, id)
}

/// The JSON branch of `PUT /api/packages/{id}`: flips is_active and nothing
/// else.
pub fn set_active(pool: &DbPool, id: &str, is_active: bool) -> AppResult<Package> {
    let conn = pool.get()?;
    let updated = conn.execute(
        "UPDATE packages SET is_active = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![is_active, id],
    )?;
    drop(conn);

    if updated == 0 {
        return Err(AppError::NotFound);
    }
    get_by_id(pool, id)
}

/// Delete a package; associated bucket objects removed best-effort first.
pub fn delete(pool: &DbPool, media: &MediaStore, id: &str) -> AppResult<()> {
    get_by_id(pool, id)?;
    media::assets::delete_all_for_owner(pool, media, &ImageOwner::Package(id.to_string()))?;

    let conn = pool.get()?;
    conn.execute("DELETE FROM packages WHERE id = ?1", params![id])?;
    Ok(())
}
