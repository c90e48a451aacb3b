//! Destination repository.

use rusqlite::{params, OptionalExtension, Row};

use crate::catalog::slug;
use crate::db::models::Destination;
use crate::error::{AppError, AppResult};
use crate::media::{self, ImageOwner, MediaStore};
use crate::state::DbPool;

#[derive(Debug, Clone, Default)]
pub struct NewDestination {
    pub name: String,
    pub slug: String,
    pub tagline: String,
    pub description: String,
    pub hero_image: Option<String>,
    pub sections: serde_json::Value,
    pub highlights: Vec<String>,
    pub fun_facts: Vec<String>,
    pub is_published: bool,
    pub created_by: Option<String>,
}

/// Partial update; only `Some` fields are touched.
#[derive(Debug, Clone, Default)]
pub struct DestinationPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub hero_image: Option<Option<String>>,
    pub sections: Option<serde_json::Value>,
    pub highlights: Option<Vec<String>>,
    pub fun_facts: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

const COLUMNS: &str = "id, slug, name, tagline, description, hero_image, sections, \
     highlights, fun_facts, is_published, created_by, created_at, updated_at";

fn from_row(row: &Row) -> rusqlite::Result<Destination> {
    let sections: String = row.get(6)?;
    let highlights: String = row.get(7)?;
    let fun_facts: String = row.get(8)?;
    Ok(Destination {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        tagline: row.get(3)?,
        description: row.get(4)?,
        hero_image: row.get(5)?,
        sections: serde_json::from_str(&sections).unwrap_or_default(),
        highlights: serde_json::from_str(&highlights).unwrap_or_default(),
        fun_facts: serde_json::from_str(&fun_facts).unwrap_or_default(),
        images: Vec::new(),
        is_published: row.get(9)?,
        created_by: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn attach_images(pool: &DbPool, destination: &mut Destination) -> AppResult<()> {
    let records =
        media::assets::list_for_owner(pool, &ImageOwner::Destination(destination.id.clone()))?;
    destination.images = records.into_iter().map(|r| r.url).collect();
    Ok(())
}

pub fn list(pool: &DbPool, published_only: bool) -> AppResult<Vec<Destination>> {
    let conn = pool.get()?;
    let sql = if published_only {
        format!(
            "SELECT {} FROM destinations WHERE is_published = 1 ORDER BY created_at DESC",
            COLUMNS
        )
    } else {
        format!("SELECT {} FROM destinations ORDER BY created_at DESC", COLUMNS)
    };
    let mut stmt = conn.prepare(&sql)?;
    let mut destinations = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);
    drop(conn);

    for destination in &mut destinations {
        attach_images(pool, destination)?;
    }
    Ok(destinations)
}

pub fn get_by_id(pool: &DbPool, id: &str) -> AppResult<Destination> {
    let conn = pool.get()?;
    let destination = conn
        .query_row(
            &format!("SELECT {} FROM destinations WHERE id = ?1", COLUMNS),
            params![id],
            from_row,
        )
        .optional()?;
    drop(conn);

    let mut destination = destination.ok_or(AppError::NotFound)?;
    attach_images(pool, &mut destination)?;
    Ok(destination)
}

/// Public lookup: unpublished destinations stay invisible.
pub fn get_by_slug(pool: &DbPool, slug: &str, include_unpublished: bool) -> AppResult<Destination> {
    let conn = pool.get()?;
    let sql = if include_unpublished {
        format!("SELECT {} FROM destinations WHERE slug = ?1", COLUMNS)
    } else {
        format!(
            "SELECT {} FROM destinations WHERE slug = ?1 AND is_published = 1",
            COLUMNS
        )
    };
    let destination = conn.query_row(&sql, params![slug], from_row).optional()?;
    drop(conn);

    let mut destination = destination.ok_or(AppError::NotFound)?;
    attach_images(pool, &mut destination)?;
    Ok(destination)
}

pub fn create(pool: &DbPool, new: NewDestination) -> AppResult<Destination> {
    if new.name.trim().is_empty() {
        return Err(AppError::validation("Destination name is required"));
    }
    let slug = slug::canonicalize(&new.slug)?;

    let conn = pool.get()?;
    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM destinations WHERE slug = ?1",
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
        "INSERT INTO destinations (id, slug, name, tagline, description, hero_image, \
         sections, highlights, fun_facts, is_published, created_by) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            id,
            slug,
            new.name.trim(),
            new.tagline,
            new.description,
            new.hero_image,
            new.sections.to_string(),
            serde_json::to_string(&new.highlights)?,
            serde_json::to_string(&new.fun_facts)?,
            new.is_published,
            new.created_by,
        ],
    )?;
    drop(conn);

    get_by_id(pool, &id)
}

pub fn update(pool: &DbPool, id: &str, patch: DestinationPatch) -> AppResult<Destination> {
    let current = get_by_id(pool, id)?;

    let slug = match &patch.slug {
        Some(requested) => {
            let slug = slug::canonicalize(requested)?;
            if slug != current.slug {
                let conn = pool.get()?;
                let taken: bool = conn.query_row(
                    "SELECT COUNT(*) > 0 FROM destinations WHERE slug = ?1 AND id != ?2",
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
        return Err(AppError::validation("Destination name is required"));
    }

    let conn = pool.get()?;
    conn.execute(
        "UPDATE destinations SET slug = ?1, name = ?2, tagline = ?3, description = ?4, \
         hero_image = ?5, sections = ?6, highlights = ?7, fun_facts = ?8, is_published = ?9, \
         updated_at = datetime('now') WHERE id = ?10",
        params![
            slug,
            name.trim(),
            patch.tagline.unwrap_or(current.tagline),
            patch.description.unwrap_or(current.description),
            patch.hero_image.unwrap_or(current.hero_image),
            patch.sections.unwrap_or(current.sections).to_string(),
            serde_json::to_string(&patch.highlights.unwrap_or(current.highlights))?,
            serde_json::to_string(&patch.fun_facts.unwrap_or(current.fun_facts))?,
            patch.is_published.unwrap_or(current.is_published),
            id,
        ],
    )?;
    drop(conn);

    get_by_id(pool, id)
}

/// Delete a destination. Associated bucket objects are removed best-effort
/// first; a storage failure never aborts the row deletion.
pub fn delete(pool: &DbPool, media: &MediaStore, id: &str) -> AppResult<()> {
    get_by_id(pool, id)?;
    media::assets::delete_all_for_owner(pool, media, &ImageOwner::Destination(id.to_string()))?;

    let conn = pool.get()?;
    conn.execute("DELETE FROM destinations WHERE id = ?1", params![id])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn new_destination(name: &str, slug: &str, published: bool) -> NewDestination {
        NewDestination {
            name: name.into(),
            slug: slug.into(),
            tagline: "Endless plains".into(),
            description: "Home of the great migration".into(),
            is_published: published,
            ..Default::default()
        }
    }

    #[test]
    fn create_normalizes_and_persists() {
        let pool = memory_pool();
        let dest = create(&pool, new_destination("Serengeti", "Serengeti", true)).unwrap();
        assert_eq!(dest.slug, "serengeti");
        assert_eq!(dest.name, "Serengeti");
        assert!(dest.is_published);
        assert!(dest.images.is_empty());
    }

    #[test]
    fn create_rejects_malformed_slug() {
        let pool = memory_pool();
        let err = create(&pool, new_destination("X", "-leading", true)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn case_differing_slug_collides_after_normalization() {
        let pool = memory_pool();
        create(&pool, new_destination("Serengeti", "serengeti", true)).unwrap();
        let err = create(&pool, new_destination("Serengeti 2", "Serengeti", true)).unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("already in use")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn public_reads_filter_unpublished() {
        let pool = memory_pool();
        create(&pool, new_destination("Mara", "maasai-mara", true)).unwrap();
        create(&pool, new_destination("Draft", "draft-spot", false)).unwrap();

        assert_eq!(list(&pool, true).unwrap().len(), 1);
        assert_eq!(list(&pool, false).unwrap().len(), 2);
        assert!(get_by_slug(&pool, "draft-spot", false).is_err());
        assert!(get_by_slug(&pool, "draft-spot", true).is_ok());
    }

    #[test]
    fn update_patches_only_provided_fields() {
        let pool = memory_pool();
        let dest = create(&pool, new_destination("Mara", "maasai-mara", false)).unwrap();

        let updated = update(
            &pool,
            &dest.id,
            DestinationPatch {
                is_published: Some(true),
                tagline: Some("The jewel of Kenya".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(updated.is_published);
        assert_eq!(updated.tagline, "The jewel of Kenya");
        assert_eq!(updated.name, "Mara");
        assert_eq!(updated.slug, "maasai-mara");
    }

    #[test]
    fn update_rejects_slug_collision() {
        let pool = memory_pool();
        create(&pool, new_destination("A", "spot-a", true)).unwrap();
        let b = create(&pool, new_destination("B", "spot-b", true)).unwrap();

        let err = update(
            &pool,
            &b.id,
            DestinationPatch {
                slug: Some("spot-a".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn delete_removes_row_and_unknown_id_is_not_found() {
        let pool = memory_pool();
        let tmp = tempfile::tempdir().unwrap();
        let store = MediaStore::new(tmp.path().to_path_buf(), "http://l/media".into(), 1024);

        let dest = create(&pool, new_destination("Mara", "maasai-mara", true)).unwrap();
        delete(&pool, &store, &dest.id).unwrap();
        assert!(matches!(get_by_id(&pool, &dest.id), Err(AppError::NotFound)));
        assert!(matches!(
            delete(&pool, &store, &dest.id),
            Err(AppError::NotFound)
        ));
    }
}
