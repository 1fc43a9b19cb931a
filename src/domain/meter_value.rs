//! Sampled meter reading entity

use chrono::{DateTime, Utc};
use serde_json::Value;

/// One sampled meter reading, always owned by a charging session.
///
/// Timestamps within one session are monotonic non-decreasing; the ingest
/// path clamps late samples rather than rejecting them.
#[derive(Debug, Clone)]
pub struct MeterSample {
    pub id: i32,
    /// Internal session id (FK, required — no orphan samples).
    pub session_id: i32,
    pub connector_id: Option<u32>,
    pub timestamp: DateTime<Utc>,
    /// Primary energy register value in Wh.
    pub value_wh: i32,
    /// Full structured sampledValue array as received.
    pub sampled_value: Option<Value>,
}

impl MeterSample {
    pub fn new(session_id: i32, timestamp: DateTime<Utc>, value_wh: i32) -> Self {
        Self {
            id: 0,
            session_id,
            connector_id: None,
            timestamp,
            value_wh,
            sampled_value: None,
        }
    }
}
