//! Billing: linear price-per-kWh settlement into an Order.

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::charging_session::ChargingSession;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::repositories::{RepositoryProvider, SharedRepositoryProvider};
use crate::support::errors::DomainResult;

/// Settles completed charging sessions.
pub struct BillingService {
    repos: SharedRepositoryProvider,
}

impl BillingService {
    pub fn new(repos: SharedRepositoryProvider) -> Self {
        Self { repos }
    }

    /// Finalize the commercial order for a completed session.
    ///
    /// `cost = energy_kwh × price_per_kwh`, COP rounded to two decimals,
    /// midpoint away from zero. A charge point without pricing produces no
    /// order (the session stays billable once pricing is configured).
    pub async fn settle(&self, session: &ChargingSession) -> DomainResult<Option<Order>> {
        let Some(energy_kwh) = session.energy_kwh() else {
            warn!(
                charge_point_id = session.charge_point_id.as_str(),
                transaction_id = session.transaction_id,
                "Settle called on a session without meter_stop"
            );
            return Ok(None);
        };

        let charge_point = self
            .repos
            .charge_points()
            .find_by_id(&session.charge_point_id)
            .await?;
        let Some(price) = charge_point.and_then(|cp| cp.price_per_kwh) else {
            warn!(
                charge_point_id = session.charge_point_id.as_str(),
                transaction_id = session.transaction_id,
                "No pricing configured; skipping order creation"
            );
            return Ok(None);
        };

        let total = (energy_kwh * price)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let duration_minutes = Decimal::from(session.duration_seconds().unwrap_or(0))
            / Decimal::from(60);

        let order = Order {
            id: format!("ord_{}", Uuid::new_v4().simple()),
            session_id: session.id,
            charge_point_id: session.charge_point_id.clone(),
            id_tag: session.id_tag.clone(),
            user_id: session.user_id.clone(),
            energy_kwh,
            duration_minutes: duration_minutes.round_dp(2),
            price_per_kwh: price,
            total_amount: total,
            status: OrderStatus::Completed,
            created_at: Utc::now(),
        };

        self.repos.orders().save(order.clone()).await?;

        info!(
            charge_point_id = session.charge_point_id.as_str(),
            transaction_id = session.transaction_id,
            order_id = order.id.as_str(),
            energy_kwh = %order.energy_kwh,
            total_amount = %order.total_amount,
            "Order settled"
        );

        Ok(Some(order))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::charge_point::ChargePoint;
    use crate::domain::repositories::RepositoryProvider;
    use crate::infrastructure::memory::InMemoryRepositoryProvider;
    use chrono::Duration;
    use std::sync::Arc;

    async fn setup(price: Option<Decimal>) -> (Arc<InMemoryRepositoryProvider>, BillingService) {
        let repos = InMemoryRepositoryProvider::shared();
        let mut cp = ChargePoint::new("CP-001");
        cp.price_per_kwh = price;
        repos.charge_points().save(cp).await.unwrap();
        let billing = BillingService::new(repos.clone());
        (repos, billing)
    }

    fn completed_session() -> ChargingSession {
        let mut s = ChargingSession::new("CP-001", 1, 1, "T1", 1000, Utc::now());
        s.id = 1;
        let end = s.start_time + Duration::minutes(5);
        s.complete(end, 1500, None);
        s
    }

    #[tokio::test]
    async fn settle_creates_order_with_linear_cost() {
        let (repos, billing) = setup(Some(Decimal::new(270000, 2))).await; // 2700.00
        let order = billing.settle(&completed_session()).await.unwrap().unwrap();
        // 0.5 kWh × 2700.00 = 1350.00 COP
        assert_eq!(order.total_amount, Decimal::new(135000, 2));
        assert_eq!(order.energy_kwh, Decimal::new(500, 3));
        assert_eq!(order.duration_minutes, Decimal::new(500, 2)); // 5.00 min
        assert!(repos.orders().find_by_session(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn settle_without_pricing_creates_no_order() {
        let (repos, billing) = setup(None).await;
        let order = billing.settle(&completed_session()).await.unwrap();
        assert!(order.is_none());
        assert!(repos.orders().find_by_session(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn settle_active_session_is_noop() {
        let (_repos, billing) = setup(Some(Decimal::new(270000, 2))).await;
        let s = ChargingSession::new("CP-001", 1, 1, "T1", 1000, Utc::now());
        assert!(billing.settle(&s).await.unwrap().is_none());
    }
}
