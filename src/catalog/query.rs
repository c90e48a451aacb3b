//! In-memory filter -> sort -> paginate pipeline over package listings.
//!
//! Drives the query parameters on `GET /api/packages`. All functions are
//! pure; filtering and sorting never touch the database.

use serde::Deserialize;

use crate::db::models::{Package, PackageType};

pub const DEFAULT_PAGE_SIZE: usize = 9;

/// User-selected facets for a package listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSpec {
    pub category: String,
    pub price_range: String,
    pub duration: String,
    pub sort_by: String,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            category: "all".to_string(),
            price_range: "all".to_string(),
            duration: "all".to_string(),
            sort_by: "popular".to_string(),
        }
    }
}

impl FilterSpec {
    /// Stable string form, used as a listing-cache key component.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.category, self.price_range, self.duration, self.sort_by
        )
    }
}

/// Inclusive numeric range parsed from `"{min}-{max}"` or `"{min}+"`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RangeFilter {
    min: f64,
    max: Option<f64>,
}

impl RangeFilter {
    fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }
}

/// `"all"`, malformed, and empty inputs all mean "no bound".
fn parse_range(spec: &str) -> Option<RangeFilter> {
    if spec.is_empty() || spec == "all" {
        return None;
    }
    if let Some(min) = spec.strip_suffix('+') {
        let min = min.parse().ok()?;
        return Some(RangeFilter { min, max: None });
    }
    let (min, max) = spec.split_once('-')?;
    Some(RangeFilter {
        min: min.parse().ok()?,
        max: Some(max.parse().ok()?),
    })
}

/// UI category -> underlying package types. Unmapped categories fall through
/// to a direct comparison against the package type.
fn category_matches(category: &str, package_type: PackageType) -> bool {
    let mapped: Option<&[PackageType]> = match category {
        "all" => return true,
        "wildlife" => Some(&[PackageType::Safari]),
        "beach" => Some(&[PackageType::Beach]),
        "adventure" => Some(&[PackageType::Adventure]),
        "cultural" => Some(&[PackageType::Cultural]),
        "luxury" => Some(&[PackageType::Luxury, PackageType::Mixed]),
        _ => None,
    };
    match mapped {
        Some(types) => types.contains(&package_type),
        None => package_type.as_str() == category,
    }
}

/// Apply facets and sort order. Ties keep their original relative order.
pub fn apply(packages: &[Package], spec: &FilterSpec) -> Vec<Package> {
    let price = parse_range(&spec.price_range);
    let duration = parse_range(&spec.duration);

    let mut result: Vec<Package> = packages
        .iter()
        .filter(|p| category_matches(&spec.category, p.package_type))
        .filter(|p| price.map_or(true, |r| r.contains(p.pricing)))
        .filter(|p| duration.map_or(true, |r| r.contains(p.days_of_travel as f64)))
        .cloned()
        .collect();

    // Vec::sort_by is stable, which preserves tie order
    match spec.sort_by.as_str() {
        "price-low" => result.sort_by(|a, b| a.pricing.total_cmp(&b.pricing)),
        "price-high" => result.sort_by(|a, b| b.pricing.total_cmp(&a.pricing)),
        // SQLite timestamps sort lexicographically; an empty timestamp sorts
        // as the oldest possible value
        "newest" => result.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        _ => result.sort_by(|a, b| b.current_bookings.cmp(&a.current_bookings)),
    }

    result
}

/// One page of a listing.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: usize,
    pub start_index: usize,
    pub end_index: usize,
}

/// Slice out page `page` (1-based). Any positive page number is tolerated;
/// pages past the end come back empty.
pub fn paginate<T: Clone>(list: &[T], page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let total_pages = list.len().div_ceil(page_size);
    let start_index = ((page - 1) * page_size).min(list.len());
    let end_index = (start_index + page_size).min(list.len());

    Page {
        items: list[start_index..end_index].to_vec(),
        total_pages,
        start_index,
        end_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(id: &str, ty: PackageType, pricing: f64, days: i64, bookings: i64) -> Package {
        Package {
            id: id.to_string(),
            slug: id.to_string(),
            name: id.to_string(),
            package_type: ty,
            description: String::new(),
            pricing,
            days_of_travel: days,
            max_capacity: 20,
            current_bookings: bookings,
            images: vec![],
            is_active: true,
            destination: None,
            created_by: None,
            created_at: format!("2024-01-0{} 00:00:00", (id.len() % 9) + 1),
            updated_at: String::new(),
        }
    }

    fn sample() -> Vec<Package> {
        vec![
            package("a", PackageType::Safari, 1500.0, 3, 12),
            package("bb", PackageType::Beach, 2500.0, 5, 4),
            package("ccc", PackageType::Luxury, 8000.0, 10, 2),
            package("dddd", PackageType::Mixed, 6000.0, 7, 9),
            package("eeeee", PackageType::Safari, 3900.0, 6, 9),
            package("ffffff", PackageType::Cultural, 900.0, 2, 1),
        ]
    }

    fn spec(category: &str, price: &str, duration: &str, sort: &str) -> FilterSpec {
        FilterSpec {
            category: category.into(),
            price_range: price.into(),
            duration: duration.into(),
            sort_by: sort.into(),
        }
    }

    fn ids(packages: &[Package]) -> Vec<&str> {
        packages.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn all_facets_pass_everything() {
        let result = apply(&sample(), &FilterSpec::default());
        assert_eq!(result.len(), 6);
    }

    #[test]
    fn apply_is_idempotent() {
        let spec = spec("all", "1000-7000", "all", "price-low");
        let once = apply(&sample(), &spec);
        let twice = apply(&once, &spec);
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn wildlife_category_maps_to_safari() {
        let result = apply(&sample(), &spec("wildlife", "all", "all", "popular"));
        assert!(result.iter().all(|p| p.package_type == PackageType::Safari));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn luxury_category_includes_mixed() {
        let result = apply(&sample(), &spec("luxury", "all", "all", "popular"));
        let mut types: Vec<&str> = result.iter().map(|p| p.package_type.as_str()).collect();
        types.sort();
        assert_eq!(types, vec!["luxury", "mixed"]);
    }

    #[test]
    fn unmapped_category_compares_directly() {
        let result = apply(&sample(), &spec("beach", "all", "all", "popular"));
        assert_eq!(ids(&result), vec!["bb"]);
        // "mixed" is not a UI category but matches the raw type
        let result = apply(&sample(), &spec("mixed", "all", "all", "popular"));
        assert_eq!(ids(&result), vec!["dddd"]);
        // Nonsense category matches nothing
        let result = apply(&sample(), &spec("submarine", "all", "all", "popular"));
        assert!(result.is_empty());
    }

    #[test]
    fn bounded_price_range_is_inclusive_both_sides() {
        let result = apply(&sample(), &spec("all", "2000-4000", "all", "popular"));
        assert!(result
            .iter()
            .all(|p| p.pricing >= 2000.0 && p.pricing <= 4000.0));
        assert_eq!(result.len(), 2);

        // Exact boundary values pass
        let edge = vec![package("x", PackageType::Safari, 2000.0, 3, 0)];
        assert_eq!(apply(&edge, &spec("all", "2000-4000", "all", "popular")).len(), 1);
    }

    #[test]
    fn open_price_range_is_lower_bound_only() {
        let result = apply(&sample(), &spec("all", "6000+", "all", "popular"));
        assert!(result.iter().all(|p| p.pricing >= 6000.0));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn duration_range_filters_days_of_travel() {
        let result = apply(&sample(), &spec("all", "all", "5-7", "popular"));
        assert!(result
            .iter()
            .all(|p| p.days_of_travel >= 5 && p.days_of_travel <= 7));
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn malformed_range_passes_everything() {
        let result = apply(&sample(), &spec("all", "cheap", "all", "popular"));
        assert_eq!(result.len(), 6);
    }

    #[test]
    fn price_low_reversed_equals_price_high() {
        // Sample has no duplicate prices
        let mut low = apply(&sample(), &spec("all", "all", "all", "price-low"));
        let high = apply(&sample(), &spec("all", "all", "all", "price-high"));
        low.reverse();
        assert_eq!(ids(&low), ids(&high));
    }

    #[test]
    fn popular_sort_is_stable_for_ties() {
        let result = apply(&sample(), &spec("all", "all", "all", "popular"));
        // "dddd" and "eeeee" both have 9 bookings; input order preserved
        let d = result.iter().position(|p| p.id == "dddd").unwrap();
        let e = result.iter().position(|p| p.id == "eeeee").unwrap();
        assert!(d < e);
    }

    #[test]
    fn newest_sorts_descending_by_created_at() {
        let result = apply(&sample(), &spec("all", "all", "all", "newest"));
        let stamps: Vec<&str> = result.iter().map(|p| p.created_at.as_str()).collect();
        let mut sorted = stamps.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn pagination_partitions_the_list_exactly() {
        let items: Vec<i32> = (0..25).collect();
        let page_size = 9;
        let first = paginate(&items, 1, page_size);
        assert_eq!(first.total_pages, 3);

        let mut seen = Vec::new();
        for page in 1..=first.total_pages {
            seen.extend(paginate(&items, page, page_size).items);
        }
        assert_eq!(seen, items);
    }

    #[test]
    fn page_beyond_last_is_empty() {
        let items: Vec<i32> = (0..10).collect();
        let page = paginate(&items, 99, DEFAULT_PAGE_SIZE);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.start_index, 10);
        assert_eq!(page.end_index, 10);
    }

    #[test]
    fn page_indices_cover_partial_last_page() {
        let items: Vec<i32> = (0..10).collect();
        let last = paginate(&items, 2, DEFAULT_PAGE_SIZE);
        assert_eq!(last.items, vec![9]);
        assert_eq!(last.start_index, 9);
        assert_eq!(last.end_index, 10);
    }

    #[test]
    fn empty_list_has_zero_pages() {
        let page = paginate::<i32>(&[], 1, DEFAULT_PAGE_SIZE);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
    }
}
