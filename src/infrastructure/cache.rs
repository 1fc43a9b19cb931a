//! Liveness cache
//!
//! Low-latency, advisory store for ephemeral per-charger signals: last-seen
//! timestamps, current status, cached authorization verdicts and pending-call
//! markers. Entries with a TTL are lazily evicted on read and by a periodic
//! sweep. After a cold start the cache is rebuilt from the latest DeviceEvent
//! per charge point; it is never the source of truth.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::domain::id_tag::TagStatus;
use crate::domain::repositories::{RepositoryProvider, SharedRepositoryProvider};
use crate::support::errors::DomainResult;

#[derive(Debug, Clone)]
struct TaggedVerdict {
    status: TagStatus,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PendingCall {
    deadline: DateTime<Utc>,
}

/// Shared liveness cache. Last-writer-wins on every key.
pub struct LivenessCache {
    last_seen: DashMap<String, DateTime<Utc>>,
    status: DashMap<String, String>,
    id_tags: DashMap<String, TaggedVerdict>,
    pending_calls: DashMap<(String, String), PendingCall>,
    id_tag_ttl: Duration,
}

impl LivenessCache {
    pub fn new(id_tag_ttl_seconds: u32) -> Self {
        Self {
            last_seen: DashMap::new(),
            status: DashMap::new(),
            id_tags: DashMap::new(),
            pending_calls: DashMap::new(),
            id_tag_ttl: Duration::seconds(id_tag_ttl_seconds as i64),
        }
    }

    // ── Liveness ───────────────────────────────────────────

    pub fn touch(&self, charge_point_id: &str) {
        self.last_seen
            .insert(charge_point_id.to_string(), Utc::now());
    }

    pub fn set_last_seen(&self, charge_point_id: &str, at: DateTime<Utc>) {
        self.last_seen.insert(charge_point_id.to_string(), at);
    }

    pub fn last_seen(&self, charge_point_id: &str) -> Option<DateTime<Utc>> {
        self.last_seen.get(charge_point_id).map(|e| *e.value())
    }

    pub fn set_status(&self, charge_point_id: &str, status: &str) {
        self.status
            .insert(charge_point_id.to_string(), status.to_string());
    }

    pub fn status(&self, charge_point_id: &str) -> Option<String> {
        self.status.get(charge_point_id).map(|e| e.value().clone())
    }

    /// Seconds since the last inbound message, if any was ever seen.
    pub fn silence_seconds(&self, charge_point_id: &str) -> Option<i64> {
        self.last_seen(charge_point_id)
            .map(|at| (Utc::now() - at).num_seconds())
    }

    // ── Authorization verdicts ─────────────────────────────

    pub fn cache_id_tag(&self, tag: &str, status: TagStatus) {
        self.id_tags.insert(
            tag.to_string(),
            TaggedVerdict {
                status,
                expires_at: Utc::now() + self.id_tag_ttl,
            },
        );
    }

    pub fn cached_id_tag(&self, tag: &str) -> Option<TagStatus> {
        let entry = self.id_tags.get(tag)?;
        if entry.expires_at <= Utc::now() {
            drop(entry);
            self.id_tags.remove(tag);
            return None;
        }
        Some(entry.status)
    }

    // ── Pending-call markers ───────────────────────────────

    pub fn mark_pending_call(
        &self,
        charge_point_id: &str,
        message_id: &str,
        deadline: DateTime<Utc>,
    ) {
        self.pending_calls.insert(
            (charge_point_id.to_string(), message_id.to_string()),
            PendingCall { deadline },
        );
    }

    pub fn clear_pending_call(&self, charge_point_id: &str, message_id: &str) {
        self.pending_calls
            .remove(&(charge_point_id.to_string(), message_id.to_string()));
    }

    pub fn pending_call_count(&self, charge_point_id: &str) -> usize {
        self.pending_calls
            .iter()
            .filter(|e| e.key().0 == charge_point_id)
            .count()
    }

    // ── Maintenance ────────────────────────────────────────

    /// Drop expired id-tag verdicts and overdue pending-call markers.
    pub fn sweep(&self) {
        let now = Utc::now();
        self.id_tags.retain(|_, v| v.expires_at > now);
        self.pending_calls.retain(|_, v| v.deadline > now);
    }

    /// Hydrate last-seen and status from the latest audit event per charge
    /// point. Called once on startup, before transports accept traffic.
    pub async fn rebuild(&self, repos: &SharedRepositoryProvider) -> DomainResult<usize> {
        let latest = repos.device_events().latest_per_charge_point().await?;
        let count = latest.len();
        for event in latest {
            self.set_last_seen(&event.charge_point_id, event.timestamp);
            if let Some(status) = event.status {
                self.set_status(&event.charge_point_id, &status);
            }
        }
        Ok(count)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_and_silence() {
        let cache = LivenessCache::new(300);
        assert!(cache.silence_seconds("CP-001").is_none());
        cache.touch("CP-001");
        let silence = cache.silence_seconds("CP-001").unwrap();
        assert!(silence <= 1);
    }

    #[test]
    fn id_tag_cache_expires() {
        let cache = LivenessCache::new(300);
        cache.cache_id_tag("T1", TagStatus::Accepted);
        assert_eq!(cache.cached_id_tag("T1"), Some(TagStatus::Accepted));

        // Force-expire by inserting an already-dead entry
        cache.id_tags.insert(
            "T2".into(),
            TaggedVerdict {
                status: TagStatus::Accepted,
                expires_at: Utc::now() - Duration::seconds(1),
            },
        );
        assert_eq!(cache.cached_id_tag("T2"), None);
    }

    #[test]
    fn pending_calls_tracked_per_charger() {
        let cache = LivenessCache::new(300);
        let deadline = Utc::now() + Duration::seconds(30);
        cache.mark_pending_call("CP-001", "m-1", deadline);
        cache.mark_pending_call("CP-001", "m-2", deadline);
        cache.mark_pending_call("CP-002", "m-3", deadline);
        assert_eq!(cache.pending_call_count("CP-001"), 2);

        cache.clear_pending_call("CP-001", "m-1");
        assert_eq!(cache.pending_call_count("CP-001"), 1);
    }

    #[test]
    fn sweep_drops_expired_entries() {
        let cache = LivenessCache::new(300);
        cache.id_tags.insert(
            "dead".into(),
            TaggedVerdict {
                status: TagStatus::Accepted,
                expires_at: Utc::now() - Duration::seconds(5),
            },
        );
        cache.mark_pending_call("CP-001", "m-1", Utc::now() - Duration::seconds(5));
        cache.sweep();
        assert!(cache.id_tags.is_empty());
        assert_eq!(cache.pending_call_count("CP-001"), 0);
    }

    #[tokio::test]
    async fn rebuild_hydrates_from_events() {
        use crate::domain::device_event::{DeviceEvent, EventKind};
        use crate::infrastructure::memory::InMemoryRepositoryProvider;

        let repos = InMemoryRepositoryProvider::shared();
        repos
            .device_events()
            .append(
                DeviceEvent::new("CP-001", EventKind::StatusChange)
                    .with_status_change("Charging", None),
            )
            .await
            .unwrap();

        let cache = LivenessCache::new(300);
        let shared: SharedRepositoryProvider = repos;
        let count = cache.rebuild(&shared).await.unwrap();
        assert_eq!(count, 1);
        assert!(cache.last_seen("CP-001").is_some());
        assert_eq!(cache.status("CP-001").as_deref(), Some("Charging"));
    }
}
