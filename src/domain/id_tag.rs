//! Authorization tag entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OCPP 1.6 authorization status of an id tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagStatus {
    Accepted,
    Blocked,
    Expired,
    Invalid,
    ConcurrentTx,
}

impl TagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Blocked => "Blocked",
            Self::Expired => "Expired",
            Self::Invalid => "Invalid",
            Self::ConcurrentTx => "ConcurrentTx",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Accepted" => Some(Self::Accepted),
            "Blocked" => Some(Self::Blocked),
            "Expired" => Some(Self::Expired),
            "Invalid" => Some(Self::Invalid),
            "ConcurrentTx" => Some(Self::ConcurrentTx),
            _ => None,
        }
    }
}

impl std::fmt::Display for TagStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One authorization record (RFID card, app token, …).
#[derive(Debug, Clone)]
pub struct IdTag {
    pub tag: String,
    pub status: TagStatus,
    pub parent_tag: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl IdTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            status: TagStatus::Accepted,
            parent_tag: None,
            expiry: None,
            created_at: Utc::now(),
        }
    }

    /// Effective status at `now`: a stored Accepted tag past its expiry
    /// answers Expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> TagStatus {
        match (self.status, self.expiry) {
            (TagStatus::Accepted, Some(expiry)) if expiry <= now => TagStatus::Expired,
            (status, _) => status,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_roundtrip() {
        for s in [
            TagStatus::Accepted,
            TagStatus::Blocked,
            TagStatus::Expired,
            TagStatus::Invalid,
            TagStatus::ConcurrentTx,
        ] {
            assert_eq!(TagStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(TagStatus::parse("Unknown"), None);
    }

    #[test]
    fn expired_tag_answers_expired() {
        let mut tag = IdTag::new("T1");
        tag.expiry = Some(Utc::now() - Duration::hours(1));
        assert_eq!(tag.effective_status(Utc::now()), TagStatus::Expired);
    }

    #[test]
    fn unexpired_accepted_tag_stays_accepted() {
        let mut tag = IdTag::new("T1");
        tag.expiry = Some(Utc::now() + Duration::hours(1));
        assert_eq!(tag.effective_status(Utc::now()), TagStatus::Accepted);
    }

    #[test]
    fn blocked_tag_ignores_expiry() {
        let mut tag = IdTag::new("T1");
        tag.status = TagStatus::Blocked;
        tag.expiry = Some(Utc::now() - Duration::hours(1));
        assert_eq!(tag.effective_status(Utc::now()), TagStatus::Blocked);
    }
}
