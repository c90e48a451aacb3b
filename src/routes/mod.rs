pub mod auth;
pub mod destinations;
pub mod images;
pub mod media;
pub mod packages;
pub mod testimonials;

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::{AppError, AppResult};

/// One file part from a multipart form.
pub(crate) struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A fully-read multipart form: text fields plus file parts.
pub(crate) struct FormData {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    pub fn required_text(&self, name: &str) -> AppResult<&str> {
        self.text(name)
            .ok_or_else(|| AppError::validation(format!("Missing field '{}'", name)))
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.text(name)
            .map(|v| matches!(v, "true" | "1" | "on" | "yes"))
    }

    pub fn f64_field(&self, name: &str) -> AppResult<Option<f64>> {
        match self.text(name) {
            None => Ok(None),
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| AppError::validation(format!("Field '{}' must be a number", name))),
        }
    }

    pub fn i64_field(&self, name: &str) -> AppResult<Option<i64>> {
        match self.text(name) {
            None => Ok(None),
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| AppError::validation(format!("Field '{}' must be an integer", name))),
        }
    }

    pub fn json_field(&self, name: &str) -> AppResult<Option<serde_json::Value>> {
        match self.text(name) {
            None => Ok(None),
            Some(v) => serde_json::from_str(v)
                .map(Some)
                .map_err(|_| AppError::validation(format!("Field '{}' must be valid JSON", name))),
        }
    }

    pub fn string_list_field(&self, name: &str) -> AppResult<Option<Vec<String>>> {
        match self.text(name) {
            None => Ok(None),
            Some(v) => serde_json::from_str(v).map(Some).map_err(|_| {
                AppError::validation(format!("Field '{}' must be a JSON array of strings", name))
            }),
        }
    }

    pub fn files_named<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a UploadedFile> {
        self.files.iter().filter(move |f| f.field == field)
    }
}

/// Drain a multipart stream into memory. Uploads are synchronous from the
/// caller's perspective, so the whole form is read before any handler logic
/// runs.
pub(crate) async fn read_form(mut multipart: Multipart) -> AppResult<FormData> {
    let mut fields = HashMap::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(|s| s.to_string());
        let mime_type = field.content_type().map(|s| s.to_string());

        match filename {
            Some(filename) => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Malformed multipart body: {}", e)))?;
                // Browsers send an empty part for untouched file inputs
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                files.push(UploadedFile {
                    field: name,
                    mime_type: mime_type.unwrap_or_else(|| {
                        mime_guess::from_path(&filename)
                            .first_or_octet_stream()
                            .to_string()
                    }),
                    filename,
                    data: data.to_vec(),
                });
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Malformed multipart body: {}", e)))?;
                fields.insert(name, text);
            }
        }
    }

    Ok(FormData { fields, files })
}
