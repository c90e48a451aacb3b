//! Bucket-addressed object store.
//!
//! Objects live under `{root}/{bucket}/{path}` on disk and are served back
//! by this server under `{public_base_url}/{bucket}/{path}`. Swapping in a
//! hosted bucket provider means replacing this module only; callers deal in
//! bucket names, bucket-relative paths, and public URLs.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Bucket-relative path of the stored object
    pub path: String,
    /// Public URL resolving to the object
    pub url: String,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    pub name: String,
    pub url: String,
    pub size: u64,
    pub created_at: String,
}

pub struct MediaStore {
    root: PathBuf,
    public_base_url: String,
    max_upload_bytes: u64,
}

impl MediaStore {
    pub fn new(root: PathBuf, public_base_url: String, max_upload_bytes: u64) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_upload_bytes,
        }
    }

    /// Validate constraints, generate a collision-resistant key, and write
    /// the object. Non-image MIME types and oversized files are rejected
    /// before anything touches the bucket.
    pub fn upload(
        &self,
        bucket: &str,
        folder: Option<&str>,
        filename: &str,
        mime_type: &str,
        data: &[u8],
    ) -> AppResult<StoredObject> {
        validate_bucket(bucket)?;
        if let Some(folder) = folder {
            validate_segment(folder)?;
        }
        if !mime_type.starts_with("image/") {
            return Err(AppError::validation(format!(
                "Only image uploads are allowed, got '{}'",
                mime_type
            )));
        }
        if data.len() as u64 > self.max_upload_bytes {
            return Err(AppError::validation(format!(
                "File exceeds the {} byte upload limit",
                self.max_upload_bytes
            )));
        }

        let key = generate_key(filename);
        let path = match folder {
            Some(folder) => format!("{}/{}", folder, key),
            None => key,
        };

        let target = self.root.join(bucket).join(&path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("Creating bucket directory: {}", e)))?;
        }
        std::fs::write(&target, data)
            .map_err(|e| AppError::Storage(format!("Writing object {}: {}", path, e)))?;

        let url = self.public_url(bucket, &path);
        Ok(StoredObject { path, url })
    }

    /// Remove an object. Deleting an already-absent object is not an error.
    pub fn delete(&self, bucket: &str, path: &str) -> AppResult<()> {
        validate_bucket(bucket)?;
        validate_object_path(path)?;

        let target = self.root.join(bucket).join(path);
        match std::fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Deleting object {}: {}", path, e))),
        }
    }

    /// List bucket contents for admin diagnostics.
    pub fn list(
        &self,
        bucket: &str,
        folder: Option<&str>,
        limit: Option<usize>,
    ) -> AppResult<Vec<ObjectInfo>> {
        validate_bucket(bucket)?;
        if let Some(folder) = folder {
            validate_segment(folder)?;
        }

        let dir = match folder {
            Some(folder) => self.root.join(bucket).join(folder),
            None => self.root.join(bucket),
        };

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(AppError::Storage(format!("Listing bucket: {}", e))),
        };

        let mut objects = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AppError::Storage(format!("Listing bucket: {}", e)))?;
            let meta = entry
                .metadata()
                .map_err(|e| AppError::Storage(format!("Listing bucket: {}", e)))?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let rel_path = match folder {
                Some(folder) => format!("{}/{}", folder, name),
                None => name.clone(),
            };
            let created_at = meta
                .modified()
                .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
                .unwrap_or_default();
            objects.push(ObjectInfo {
                url: self.public_url(bucket, &rel_path),
                name,
                size: meta.len(),
                created_at,
            });
        }

        objects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            objects.truncate(limit);
        }
        Ok(objects)
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, path)
    }

    /// Resolve a public URL back to (bucket, path). Only URLs minted by this
    /// store are accepted.
    pub fn parse_public_url(&self, public_url: &str) -> AppResult<(String, String)> {
        url::Url::parse(public_url)
            .map_err(|_| AppError::validation(format!("Malformed URL '{}'", public_url)))?;

        let rest = public_url
            .strip_prefix(&self.public_base_url)
            .map(|r| r.trim_start_matches('/'))
            .ok_or_else(|| {
                AppError::validation(format!("URL '{}' is not served by this store", public_url))
            })?;

        let (bucket, path) = rest.split_once('/').ok_or_else(|| {
            AppError::validation(format!("URL '{}' has no object path", public_url))
        })?;
        validate_bucket(bucket)?;
        validate_object_path(path)?;
        Ok((bucket.to_string(), path.to_string()))
    }

    /// Filesystem location of an object, for the serving route.
    pub fn object_disk_path(&self, bucket: &str, path: &str) -> AppResult<PathBuf> {
        validate_bucket(bucket)?;
        validate_object_path(path)?;
        Ok(self.root.join(bucket).join(path))
    }
}

/// Key: millisecond timestamp + random suffix + original extension.
fn generate_key(filename: &str) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin")
        .to_lowercase();

    format!("{}-{}.{}", Utc::now().timestamp_millis(), suffix, ext)
}

fn validate_bucket(bucket: &str) -> AppResult<()> {
    let valid = !bucket.is_empty()
        && bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(format!("Invalid bucket name '{}'", bucket)))
    }
}

fn validate_segment(segment: &str) -> AppResult<()> {
    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid && segment != "." && segment != ".." {
        Ok(())
    } else {
        Err(AppError::validation(format!("Invalid path segment '{}'", segment)))
    }
}

fn validate_object_path(path: &str) -> AppResult<()> {
    if path.is_empty() {
        return Err(AppError::validation("Empty object path"));
    }
    for segment in path.split('/') {
        validate_segment(segment)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, MediaStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = MediaStore::new(
            tmp.path().to_path_buf(),
            "http://localhost:3000/media".to_string(),
            1024,
        );
        (tmp, store)
    }

    #[test]
    fn upload_writes_object_and_returns_public_url() {
        let (tmp, store) = test_store();
        let stored = store
            .upload("destinations", None, "lion.jpg", "image/jpeg", b"fake-jpeg")
            .unwrap();

        assert!(stored.path.ends_with(".jpg"));
        assert_eq!(
            stored.url,
            format!("http://localhost:3000/media/destinations/{}", stored.path)
        );
        let on_disk = tmp.path().join("destinations").join(&stored.path);
        assert_eq!(std::fs::read(on_disk).unwrap(), b"fake-jpeg");
    }

    #[test]
    fn upload_keys_do_not_collide() {
        let (_tmp, store) = test_store();
        let a = store
            .upload("b", None, "a.png", "image/png", b"x")
            .unwrap();
        let b = store
            .upload("b", None, "a.png", "image/png", b"x")
            .unwrap();
        assert_ne!(a.path, b.path);
    }

    #[test]
    fn upload_rejects_non_image_mime() {
        let (_tmp, store) = test_store();
        let err = store
            .upload("b", None, "evil.html", "text/html", b"<script>")
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn upload_rejects_oversized_file() {
        let (_tmp, store) = test_store();
        let big = vec![0u8; 2048];
        let err = store
            .upload("b", None, "big.jpg", "image/jpeg", &big)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn upload_into_folder_prefixes_the_path() {
        let (_tmp, store) = test_store();
        let stored = store
            .upload("b", Some("heroes"), "a.webp", "image/webp", b"x")
            .unwrap();
        assert!(stored.path.starts_with("heroes/"));
    }

    #[test]
    fn delete_is_tolerant_of_missing_objects() {
        let (_tmp, store) = test_store();
        assert!(store.delete("b", "not-there.jpg").is_ok());
    }

    #[test]
    fn delete_removes_the_object() {
        let (tmp, store) = test_store();
        let stored = store.upload("b", None, "a.gif", "image/gif", b"x").unwrap();
        store.delete("b", &stored.path).unwrap();
        assert!(!tmp.path().join("b").join(&stored.path).exists());
    }

    #[test]
    fn delete_rejects_path_traversal() {
        let (_tmp, store) = test_store();
        assert!(store.delete("b", "../../etc/passwd").is_err());
        assert!(store.delete("../b", "a.jpg").is_err());
    }

    #[test]
    fn list_returns_uploaded_objects_with_urls() {
        let (_tmp, store) = test_store();
        store.upload("b", None, "a.jpg", "image/jpeg", b"aa").unwrap();
        store.upload("b", None, "b.jpg", "image/jpeg", b"bbb").unwrap();

        let objects = store.list("b", None, None).unwrap();
        assert_eq!(objects.len(), 2);
        assert!(objects.iter().all(|o| o.url.contains("/media/b/")));
        assert!(objects.iter().any(|o| o.size == 2));
    }

    #[test]
    fn list_respects_limit_and_missing_bucket() {
        let (_tmp, store) = test_store();
        assert!(store.list("empty", None, None).unwrap().is_empty());

        store.upload("b", None, "a.jpg", "image/jpeg", b"x").unwrap();
        store.upload("b", None, "b.jpg", "image/jpeg", b"x").unwrap();
        assert_eq!(store.list("b", None, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn parse_public_url_round_trips() {
        let (_tmp, store) = test_store();
        let stored = store
            .upload("packages", Some("gallery"), "a.jpg", "image/jpeg", b"x")
            .unwrap();
        let (bucket, path) = store.parse_public_url(&stored.url).unwrap();
        assert_eq!(bucket, "packages");
        assert_eq!(path, stored.path);
    }

    #[test]
    fn parse_public_url_rejects_foreign_urls() {
        let (_tmp, store) = test_store();
        assert!(store
            .parse_public_url("http://elsewhere.example/media/b/a.jpg")
            .is_err());
        assert!(store.parse_public_url("not a url").is_err());
    }
}
