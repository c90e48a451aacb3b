//! Read-through cache for public listings.
//!
//! Keyed by (entity kind, filter string) with a fixed TTL. Every write
//! endpoint invalidates the kind it touched, so the TTL only matters for
//! out-of-band database edits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Destination,
    Package,
    Testimonial,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// TTL cache for serialized listing responses, shared via `AppState`.
#[derive(Clone)]
pub struct ListingCache {
    entries: Arc<Mutex<HashMap<(EntityKind, String), CacheEntry>>>,
    ttl: Duration,
}

impl ListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn get(&self, kind: EntityKind, key: &str) -> Option<serde_json::Value> {
        let mut entries = self.entries.lock().unwrap();
        Self::clear_stale(&mut entries);
        entries
            .get(&(kind, key.to_string()))
            .map(|e| e.value.clone())
    }

    pub fn put(&self, kind: EntityKind, key: &str, value: serde_json::Value) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            (kind, key.to_string()),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop every cached listing for one entity kind. Called by the
    /// corresponding write endpoints.
    pub fn invalidate(&self, kind: EntityKind) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|(k, _), _| *k != kind);
    }

    fn clear_stale(entries: &mut HashMap<(EntityKind, String), CacheEntry>) {
        let now = Instant::now();
        entries.retain(|_, entry| now < entry.expires_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_returns_what_was_put() {
        let cache = ListingCache::new(Duration::from_secs(60));
        cache.put(EntityKind::Package, "all", json!([1, 2, 3]));
        assert_eq!(cache.get(EntityKind::Package, "all"), Some(json!([1, 2, 3])));
    }

    #[test]
    fn miss_on_unknown_key() {
        let cache = ListingCache::new(Duration::from_secs(60));
        assert!(cache.get(EntityKind::Package, "all").is_none());
    }

    #[test]
    fn keys_are_scoped_by_entity_kind() {
        let cache = ListingCache::new(Duration::from_secs(60));
        cache.put(EntityKind::Package, "all", json!("packages"));
        cache.put(EntityKind::Destination, "all", json!("destinations"));
        assert_eq!(
            cache.get(EntityKind::Destination, "all"),
            Some(json!("destinations"))
        );
    }

    #[test]
    fn invalidate_clears_only_one_kind() {
        let cache = ListingCache::new(Duration::from_secs(60));
        cache.put(EntityKind::Package, "all", json!(1));
        cache.put(EntityKind::Package, "wildlife", json!(2));
        cache.put(EntityKind::Testimonial, "approved", json!(3));

        cache.invalidate(EntityKind::Package);

        assert!(cache.get(EntityKind::Package, "all").is_none());
        assert!(cache.get(EntityKind::Package, "wildlife").is_none());
        assert_eq!(cache.get(EntityKind::Testimonial, "approved"), Some(json!(3)));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = ListingCache::new(Duration::from_millis(0));
        cache.put(EntityKind::Package, "all", json!(1));
        assert!(cache.get(EntityKind::Package, "all").is_none());
    }
}
