//! Charging session (OCPP transaction) entity

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Lifecycle of a charging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Transaction is running; charger has not reported StopTransaction.
    Active,
    /// Closed normally by StopTransaction.
    Completed,
    /// Cancelled before any energy was delivered.
    Cancelled,
    /// Force-closed by the server (stale timeout, connector went Available).
    Interrupted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One charging transaction.
///
/// Invariants (enforced by the store):
/// - `(charge_point_id, evse_id, transaction_id)` unique
/// - at most one `Active` session per `(charge_point_id, evse_id)`
/// - `end_time >= start_time` when set; `meter_stop >= meter_start` when set
#[derive(Debug, Clone)]
pub struct ChargingSession {
    /// Internal id (store-assigned).
    pub id: i32,
    pub charge_point_id: String,
    /// OCPP connector id (1..N) this session runs on.
    pub evse_id: u32,
    /// Server-assigned OCPP transaction id, monotonically increasing.
    pub transaction_id: i32,
    pub id_tag: String,
    pub user_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Meter reading at start (Wh).
    pub meter_start: i32,
    /// Meter reading at stop (Wh).
    pub meter_stop: Option<i32>,
    pub status: SessionStatus,
    pub stop_reason: Option<String>,
}

impl ChargingSession {
    pub fn new(
        charge_point_id: impl Into<String>,
        evse_id: u32,
        transaction_id: i32,
        id_tag: impl Into<String>,
        meter_start: i32,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            charge_point_id: charge_point_id.into(),
            evse_id,
            transaction_id,
            id_tag: id_tag.into(),
            user_id: None,
            start_time,
            end_time: None,
            meter_start,
            meter_stop: None,
            status: SessionStatus::Active,
            stop_reason: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Close the session. `end_time` is clamped to `start_time` and
    /// `meter_stop` to `meter_start` so the stored row always satisfies the
    /// ordering invariants even when a charger reports garbage.
    pub fn complete(
        &mut self,
        end_time: DateTime<Utc>,
        meter_stop: i32,
        reason: Option<String>,
    ) {
        self.end_time = Some(end_time.max(self.start_time));
        self.meter_stop = Some(meter_stop.max(self.meter_start));
        self.stop_reason = reason;
        self.status = SessionStatus::Completed;
    }

    /// Energy delivered in Wh, available once the session is closed.
    pub fn energy_wh(&self) -> Option<i32> {
        self.meter_stop.map(|stop| stop - self.meter_start)
    }

    /// Energy delivered in kWh at 3 decimal places.
    pub fn energy_kwh(&self) -> Option<Decimal> {
        self.energy_wh()
            .map(|wh| (Decimal::from(wh) / Decimal::from(1000)).round_dp(3))
    }

    /// Session duration in seconds, once closed.
    pub fn duration_seconds(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds())
    }

    /// Linear cost: `energy_kwh × price_per_kwh`, COP rounded to 2 dp
    /// (midpoint away from zero).
    pub fn cost(&self, price_per_kwh: Decimal) -> Option<Decimal> {
        self.energy_kwh().map(|kwh| {
            (kwh * price_per_kwh).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> ChargingSession {
        ChargingSession::new("CP-001", 1, 7, "T1", 1000, Utc::now())
    }

    #[test]
    fn new_session_is_active() {
        let s = sample();
        assert!(s.is_active());
        assert_eq!(s.meter_start, 1000);
        assert!(s.meter_stop.is_none());
        assert!(s.end_time.is_none());
    }

    #[test]
    fn complete_sets_fields() {
        let mut s = sample();
        let end = s.start_time + Duration::minutes(5);
        s.complete(end, 1500, Some("Local".into()));
        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(s.meter_stop, Some(1500));
        assert_eq!(s.end_time, Some(end));
        assert_eq!(s.energy_wh(), Some(500));
        assert_eq!(s.duration_seconds(), Some(300));
    }

    #[test]
    fn complete_clamps_backwards_values() {
        let mut s = sample();
        let before_start = s.start_time - Duration::seconds(10);
        s.complete(before_start, 900, None);
        // end_time >= start_time, meter_stop >= meter_start
        assert_eq!(s.end_time, Some(s.start_time));
        assert_eq!(s.meter_stop, Some(1000));
        assert_eq!(s.energy_wh(), Some(0));
    }

    #[test]
    fn energy_kwh_three_decimals() {
        let mut s = sample();
        s.complete(s.start_time + Duration::minutes(30), 1500, None);
        assert_eq!(s.energy_kwh(), Some(Decimal::new(500, 3))); // 0.500 kWh
    }

    #[test]
    fn cost_is_linear_price_times_energy() {
        let mut s = sample();
        s.complete(s.start_time + Duration::minutes(30), 1500, None);
        // 0.5 kWh × 2700.00 COP = 1350.00 COP
        let cost = s.cost(Decimal::new(270000, 2)).unwrap();
        assert_eq!(cost, Decimal::new(135000, 2));
    }

    #[test]
    fn cost_rounds_half_away_from_zero() {
        let mut s = sample();
        s.complete(s.start_time + Duration::minutes(1), 1001, None);
        // 0.001 kWh × 2702.50 = 2.7025 → 2.70
        assert_eq!(
            s.cost(Decimal::new(270250, 2)).unwrap(),
            Decimal::new(270, 2)
        );
    }

    #[test]
    fn status_roundtrip() {
        for s in [
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
            SessionStatus::Interrupted,
        ] {
            assert_eq!(SessionStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(SessionStatus::parse("ongoing"), None);
    }
}
