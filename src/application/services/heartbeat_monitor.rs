//! Heartbeat watchdog and background sweeps.
//!
//! Detects chargers that went silent (no inbound for `2 × heartbeat_interval
//! + grace`) and synthesizes a `Disconnected` transport event for them — the
//! only way an MQTT charger ever disconnects. Also runs the stale-session
//! sweep and the liveness-cache TTL sweep.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::charging::ChargingService;
use crate::application::session::SharedSessionRegistry;
use crate::application::transport::{TransportEvent, TransportEventSender};
use crate::config::OcppConfig;
use crate::infrastructure::cache::LivenessCache;
use crate::support::shutdown::ShutdownSignal;

const WATCHDOG_TICK_SECS: u64 = 5;
const STALE_SWEEP_TICK_SECS: u64 = 600;

pub struct HeartbeatMonitor {
    registry: SharedSessionRegistry,
    charging: Arc<ChargingService>,
    cache: Arc<LivenessCache>,
    intake: TransportEventSender,
    watchdog_seconds: i64,
    stale_after_hours: u32,
}

impl HeartbeatMonitor {
    pub fn new(
        registry: SharedSessionRegistry,
        charging: Arc<ChargingService>,
        cache: Arc<LivenessCache>,
        intake: TransportEventSender,
        watchdog_seconds: i64,
        config: &OcppConfig,
    ) -> Self {
        Self {
            registry,
            charging,
            cache,
            intake,
            watchdog_seconds,
            stale_after_hours: config.session_stale_timeout_hours,
        }
    }

    /// Spawn the watchdog and sweep loops.
    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal) {
        let watchdog = self.clone();
        let watchdog_shutdown = shutdown.clone();
        tokio::spawn(async move {
            info!(
                watchdog_seconds = watchdog.watchdog_seconds,
                "Heartbeat watchdog started"
            );
            let mut tick = tokio::time::interval(Duration::from_secs(WATCHDOG_TICK_SECS));
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        watchdog.check_silent().await;
                        watchdog.cache.sweep();
                    }
                    _ = watchdog_shutdown.notified().wait() => {
                        info!("Heartbeat watchdog shutting down");
                        break;
                    }
                }
            }
        });

        let sweeper = self;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(STALE_SWEEP_TICK_SECS));
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        match sweeper.charging.interrupt_stale_sessions(sweeper.stale_after_hours).await {
                            Ok(0) => {}
                            Ok(count) => info!(count, "Interrupted stale sessions"),
                            Err(e) => warn!(error = %e, "Stale session sweep failed"),
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("Stale session sweeper shutting down");
                        break;
                    }
                }
            }
        });
    }

    async fn check_silent(&self) {
        for charge_point_id in self.registry.silent_since(self.watchdog_seconds) {
            warn!(
                charge_point_id = charge_point_id.as_str(),
                silence_seconds = self.watchdog_seconds,
                "Heartbeat watchdog expired; synthesizing disconnect"
            );
            let event = TransportEvent::Disconnected {
                charge_point_id,
                reason: "heartbeat watchdog expired".to_string(),
                sink: None,
            };
            if self.intake.send(event).await.is_err() {
                // Router gone; nothing left to notify.
                return;
            }
        }
    }
}
