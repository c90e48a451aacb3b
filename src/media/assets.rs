//! Image asset metadata: links uploaded objects to their owning entity,
//! tracks the hero flag and display order.

use rusqlite::{params, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::db::models::ImageRecord;
use crate::media::MediaStore;
use crate::state::DbPool;

/// The entity a stored image belongs to. Exactly one owner per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOwner {
    Package(String),
    Destination(String),
}

impl ImageOwner {
    fn column(&self) -> &'static str {
        match self {
            ImageOwner::Package(_) => "package_id",
            ImageOwner::Destination(_) => "destination_id",
        }
    }

    fn id(&self) -> &str {
        match self {
            ImageOwner::Package(id) => id,
            ImageOwner::Destination(id) => id,
        }
    }
}

/// Metadata persisted after a successful `MediaStore::upload`.
#[derive(Debug, Clone)]
pub struct UploadMeta {
    pub url: String,
    pub bucket: String,
    pub filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub alt: Option<String>,
    pub is_hero: bool,
    pub display_order: i64,
    pub owner: Option<ImageOwner>,
}

fn record_from_row(row: &Row) -> rusqlite::Result<ImageRecord> {
    Ok(ImageRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        bucket: row.get(2)?,
        filename: row.get(3)?,
        file_path: row.get(4)?,
        file_size: row.get(5)?,
        mime_type: row.get(6)?,
        width: row.get(7)?,
        height: row.get(8)?,
        alt: row.get(9)?,
        is_hero: row.get(10)?,
        display_order: row.get(11)?,
        package_id: row.get(12)?,
        destination_id: row.get(13)?,
        created_at: row.get(14)?,
    })
}

const RECORD_COLUMNS: &str = "id, url, bucket, filename, file_path, file_size, mime_type, \
     width, height, alt, is_hero, display_order, package_id, destination_id, created_at";

pub fn record_upload(pool: &DbPool, meta: UploadMeta) -> AppResult<ImageRecord> {
    let id = uuid::Uuid::now_v7().to_string();
    let (package_id, destination_id) = match &meta.owner {
        Some(ImageOwner::Package(id)) => (Some(id.clone()), None),
        Some(ImageOwner::Destination(id)) => (None, Some(id.clone())),
        None => (None, None),
    };

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO images (id, url, bucket, filename, file_path, file_size, mime_type, \
         width, height, alt, is_hero, display_order, package_id, destination_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?12, ?13)",
        params![
            id,
            meta.url,
            meta.bucket,
            meta.filename,
            meta.file_path,
            meta.file_size,
            meta.mime_type,
            meta.width,
            meta.height,
            meta.alt,
            meta.display_order,
            package_id,
            destination_id,
        ],
    )?;
    drop(conn);

    // Hero assignment goes through the transactional path so sibling rows
    // are unset atomically
    if meta.is_hero {
        if let Some(owner) = &meta.owner {
            set_hero(pool, &id, owner)?;
        }
    }

    get(pool, &id)
}

pub fn get(pool: &DbPool, image_id: &str) -> AppResult<ImageRecord> {
    let conn = pool.get()?;
    conn.query_row(
        &format!("SELECT {} FROM images WHERE id = ?1", RECORD_COLUMNS),
        params![image_id],
        record_from_row,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

pub fn find_by_url(pool: &DbPool, url: &str) -> AppResult<Option<ImageRecord>> {
    let conn = pool.get()?;
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM images WHERE url = ?1", RECORD_COLUMNS),
            params![url],
            record_from_row,
        )
        .optional()?)
}

/// Make `image_id` the owner's only hero. One transaction: unset every
/// sibling, set the target.
pub fn set_hero(pool: &DbPool, image_id: &str, owner: &ImageOwner) -> AppResult<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    tx.execute(
        &format!("UPDATE images SET is_hero = 0 WHERE {} = ?1", owner.column()),
        params![owner.id()],
    )?;
    let updated = tx.execute(
        &format!(
            "UPDATE images SET is_hero = 1 WHERE id = ?1 AND {} = ?2",
            owner.column()
        ),
        params![image_id, owner.id()],
    )?;
    if updated != 1 {
        return Err(AppError::NotFound);
    }

    tx.commit()?;
    Ok(())
}

/// Images for an owner, hero first, then display order.
pub fn list_for_owner(pool: &DbPool, owner: &ImageOwner) -> AppResult<Vec<ImageRecord>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM images WHERE {} = ?1 \
         ORDER BY is_hero DESC, display_order ASC, created_at ASC",
        RECORD_COLUMNS,
        owner.column()
    ))?;
    let records = stmt
        .query_map(params![owner.id()], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Remove the metadata row only. Callers pair this with `MediaStore::delete`
/// for the underlying object.
pub fn delete(pool: &DbPool, image_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM images WHERE id = ?1", params![image_id])?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Best-effort cascade used by entity deletion: every bucket object is
/// attempted, failures are logged, and all metadata rows are removed
/// regardless.
pub fn delete_all_for_owner(
    pool: &DbPool,
    media: &MediaStore,
    owner: &ImageOwner,
) -> AppResult<usize> {
    let records = list_for_owner(pool, owner)?;
    for record in &records {
        if let Err(e) = media.delete(&record.bucket, &record.file_path) {
            tracing::warn!(
                "Failed to delete bucket object {}/{} for image {}: {}",
                record.bucket,
                record.file_path,
                record.id,
                e
            );
        }
    }

    let conn = pool.get()?;
    let removed = conn.execute(
        &format!("DELETE FROM images WHERE {} = ?1", owner.column()),
        params![owner.id()],
    )?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn seed_package(pool: &DbPool, id: &str) {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO packages (id, slug, name, package_type, pricing, days_of_travel, max_capacity)
             VALUES (?1, ?1, ?1, 'safari', 1000, 5, 10)",
            params![id],
        )
        .unwrap();
    }

    fn meta(owner: Option<ImageOwner>, is_hero: bool, order: i64) -> UploadMeta {
        UploadMeta {
            url: format!("http://localhost/media/b/{}.jpg", uuid::Uuid::now_v7()),
            bucket: "b".into(),
            filename: "a.jpg".into(),
            file_path: format!("{}.jpg", uuid::Uuid::now_v7()),
            file_size: 10,
            mime_type: "image/jpeg".into(),
            width: None,
            height: None,
            alt: None,
            is_hero,
            display_order: order,
            owner,
        }
    }

    #[test]
    fn record_upload_persists_metadata() {
        let pool = memory_pool();
        seed_package(&pool, "p1");

        let record =
            record_upload(&pool, meta(Some(ImageOwner::Package("p1".into())), false, 2)).unwrap();
        assert_eq!(record.bucket, "b");
        assert_eq!(record.display_order, 2);
        assert_eq!(record.package_id.as_deref(), Some("p1"));
        assert!(record.destination_id.is_none());
        assert!(!record.is_hero);
    }

    #[test]
    fn set_hero_leaves_exactly_one_hero() {
        let pool = memory_pool();
        seed_package(&pool, "p1");
        let owner = ImageOwner::Package("p1".into());

        let img1 = record_upload(&pool, meta(Some(owner.clone()), true, 0)).unwrap();
        assert!(get(&pool, &img1.id).unwrap().is_hero);

        let img2 = record_upload(&pool, meta(Some(owner.clone()), false, 1)).unwrap();
        set_hero(&pool, &img2.id, &owner).unwrap();

        let records = list_for_owner(&pool, &owner).unwrap();
        let heroes: Vec<&ImageRecord> = records.iter().filter(|r| r.is_hero).collect();
        assert_eq!(heroes.len(), 1);
        assert_eq!(heroes[0].id, img2.id);
    }

    #[test]
    fn set_hero_rejects_images_of_other_owners() {
        let pool = memory_pool();
        seed_package(&pool, "p1");
        seed_package(&pool, "p2");

        let img = record_upload(&pool, meta(Some(ImageOwner::Package("p1".into())), false, 0))
            .unwrap();
        let err = set_hero(&pool, &img.id, &ImageOwner::Package("p2".into())).unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn list_for_owner_orders_hero_first_then_display_order() {
        let pool = memory_pool();
        seed_package(&pool, "p1");
        let owner = ImageOwner::Package("p1".into());

        let _third = record_upload(&pool, meta(Some(owner.clone()), false, 3)).unwrap();
        let first = record_upload(&pool, meta(Some(owner.clone()), false, 1)).unwrap();
        let hero = record_upload(&pool, meta(Some(owner.clone()), true, 9)).unwrap();

        let records = list_for_owner(&pool, &owner).unwrap();
        assert_eq!(records[0].id, hero.id);
        assert_eq!(records[1].id, first.id);
    }

    #[test]
    fn delete_removes_only_the_metadata_row() {
        let pool = memory_pool();
        seed_package(&pool, "p1");
        let owner = ImageOwner::Package("p1".into());

        let img = record_upload(&pool, meta(Some(owner.clone()), false, 0)).unwrap();
        delete(&pool, &img.id).unwrap();
        assert!(matches!(get(&pool, &img.id), Err(AppError::NotFound)));
        assert!(matches!(delete(&pool, &img.id), Err(AppError::NotFound)));
    }

    #[test]
    fn find_by_url_resolves_records() {
        let pool = memory_pool();
        seed_package(&pool, "p1");
        let record =
            record_upload(&pool, meta(Some(ImageOwner::Package("p1".into())), false, 0)).unwrap();

        let found = find_by_url(&pool, &record.url).unwrap().unwrap();
        assert_eq!(found.id, record.id);
        assert!(find_by_url(&pool, "http://nowhere/x.jpg").unwrap().is_none());
    }

    #[test]
    fn cascade_removes_rows_even_when_bucket_delete_fails() {
        let pool = memory_pool();
        seed_package(&pool, "p1");
        let owner = ImageOwner::Package("p1".into());

        let tmp = tempfile::tempdir().unwrap();
        let store = MediaStore::new(
            tmp.path().to_path_buf(),
            "http://localhost/media".into(),
            1024 * 1024,
        );

        // Three images; make object #2's path a non-empty directory so the
        // bucket delete fails for it
        let mut metas = Vec::new();
        for i in 0..3 {
            let stored = store
                .upload("b", None, "img.jpg", "image/jpeg", b"data")
                .unwrap();
            let mut m = meta(Some(owner.clone()), false, i);
            m.file_path = stored.path;
            m.url = stored.url;
            metas.push(m);
        }
        let broken = tmp.path().join("b").join(&metas[1].file_path);
        std::fs::remove_file(&broken).unwrap();
        std::fs::create_dir(&broken).unwrap();
        std::fs::write(broken.join("occupant"), b"x").unwrap();

        for m in metas {
            record_upload(&pool, m).unwrap();
        }

        let removed = delete_all_for_owner(&pool, &store, &owner).unwrap();
        assert_eq!(removed, 3);
        assert!(list_for_owner(&pool, &owner).unwrap().is_empty());
    }
}
