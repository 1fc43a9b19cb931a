//! Commercial order wrapping a completed charging session

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Business status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Commercial wrapper around a charging session, finalized at
/// StopTransaction with the linear energy cost snapshot.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: String,
    pub session_id: i32,
    pub charge_point_id: String,
    pub id_tag: String,
    pub user_id: Option<String>,
    pub energy_kwh: Decimal,
    pub duration_minutes: Decimal,
    /// Price per kWh in force when the order was settled.
    pub price_per_kwh: Decimal,
    /// Total amount, COP with two decimals.
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}
