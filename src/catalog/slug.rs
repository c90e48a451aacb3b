//! Slug normalization and validation.
//!
//! Slugs are URL-safe identifiers: lowercase alphanumeric runs separated by
//! single hyphens, no leading or trailing hyphen.

use crate::error::{AppError, AppResult};

/// Lowercase a slug and replace whitespace/underscores with hyphens.
/// Does not guarantee validity; callers follow up with [`validate`].
pub fn normalize(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '_' { '-' } else { c })
        .collect()
}

/// Check a slug against the pattern `^[a-z0-9]+(-[a-z0-9]+)*$`.
pub fn validate(slug: &str) -> AppResult<()> {
    let valid = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Invalid slug '{}': use lowercase letters, digits and single hyphens",
            slug
        )))
    }
}

/// Normalize then validate, returning the canonical slug.
pub fn canonicalize(input: &str) -> AppResult<String> {
    let slug = normalize(input);
    validate(&slug)?;
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_slugs() {
        assert!(validate("maasai-mara").is_ok());
        assert!(validate("serengeti").is_ok());
        assert!(validate("big-5-safari").is_ok());
    }

    #[test]
    fn rejects_malformed_slugs() {
        assert!(validate("Maasai Mara").is_err());
        assert!(validate("maasai_mara").is_err());
        assert!(validate("-leading").is_err());
        assert!(validate("trailing-").is_err());
        assert!(validate("double--hyphen").is_err());
        assert!(validate("").is_err());
    }

    #[test]
    fn normalize_lowercases_and_hyphenates() {
        assert_eq!(normalize("Maasai Mara"), "maasai-mara");
        assert_eq!(normalize("maasai_mara"), "maasai-mara");
        assert_eq!(normalize("  Serengeti "), "serengeti");
    }

    #[test]
    fn canonicalize_collides_case_differing_slugs() {
        // "Serengeti" must collide with an existing "serengeti"
        assert_eq!(canonicalize("Serengeti").unwrap(), "serengeti");
    }

    #[test]
    fn canonicalize_rejects_unsalvageable_input() {
        assert!(canonicalize("!!!").is_err());
        assert!(canonicalize("-leading").is_err());
    }
}
