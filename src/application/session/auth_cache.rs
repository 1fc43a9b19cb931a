//! Per-session authorization cache.
//!
//! LRU with a hard capacity and per-entry TTL; consulted before the store
//! for Authorize/StartTransaction and kept across disconnects so a charger
//! reconnecting mid-charge can still authorize recently seen tags.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::domain::id_tag::TagStatus;

struct Entry {
    status: TagStatus,
    expires_at: DateTime<Utc>,
    last_used: u64,
}

pub struct AuthCache {
    entries: HashMap<String, Entry>,
    capacity: usize,
    ttl: Duration,
    clock: u64,
}

impl AuthCache {
    pub fn new(capacity: usize, ttl_seconds: u32) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            ttl: Duration::seconds(ttl_seconds as i64),
            clock: 0,
        }
    }

    pub fn insert(&mut self, tag: &str, status: TagStatus) {
        self.clock += 1;
        if self.entries.len() >= self.capacity && !self.entries.contains_key(tag) {
            self.evict_lru();
        }
        self.entries.insert(
            tag.to_string(),
            Entry {
                status,
                expires_at: Utc::now() + self.ttl,
                last_used: self.clock,
            },
        );
    }

    pub fn get(&mut self, tag: &str) -> Option<TagStatus> {
        self.clock += 1;
        let clock = self.clock;
        match self.entries.get_mut(tag) {
            Some(entry) if entry.expires_at > Utc::now() => {
                entry.last_used = clock;
                Some(entry.status)
            }
            Some(_) => {
                self.entries.remove(tag);
                None
            }
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_lru(&mut self) {
        if let Some(victim) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| k.clone())
        {
            self.entries.remove(&victim);
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_and_miss() {
        let mut cache = AuthCache::new(10, 300);
        cache.insert("T1", TagStatus::Accepted);
        assert_eq!(cache.get("T1"), Some(TagStatus::Accepted));
        assert_eq!(cache.get("T2"), None);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let mut cache = AuthCache::new(2, 300);
        cache.insert("a", TagStatus::Accepted);
        cache.insert("b", TagStatus::Blocked);
        cache.get("a"); // b is now LRU
        cache.insert("c", TagStatus::Accepted);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(TagStatus::Accepted));
        assert_eq!(cache.get("c"), Some(TagStatus::Accepted));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn expired_entries_are_misses() {
        let mut cache = AuthCache::new(10, 300);
        cache.insert("T1", TagStatus::Accepted);
        cache.entries.get_mut("T1").unwrap().expires_at = Utc::now() - Duration::seconds(1);
        assert_eq!(cache.get("T1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn reinsert_refreshes_status() {
        let mut cache = AuthCache::new(10, 300);
        cache.insert("T1", TagStatus::Accepted);
        cache.insert("T1", TagStatus::Blocked);
        assert_eq!(cache.get("T1"), Some(TagStatus::Blocked));
        assert_eq!(cache.len(), 1);
    }
}
