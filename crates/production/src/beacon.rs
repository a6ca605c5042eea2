//! Ready and heartbeat signals on `supershow/control/*`.

use std::sync::Arc;
use std::time::Duration;

use supershow_shared::{BusPort, ControlField, ControlSignal, Payload, QoS, Topic};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ControlBeacon {
    client_id: String,
}

impl ControlBeacon {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn send<B: BusPort + ?Sized>(&self, bus: &B, field: ControlField) -> bool {
        let topic = Topic::Control(field);
        let signal = ControlSignal {
            client_id: self.client_id.clone(),
            timestamp: chrono::Utc::now().timestamp(),
        };
        let payload = match Payload::record(&signal) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Failed to encode control signal");
                return false;
            }
        };
        bus.publish(
            &topic.to_string(),
            payload.to_bytes(),
            QoS::AtLeastOnce,
            topic.is_retained(),
        )
    }

    pub fn announce_ready<B: BusPort + ?Sized>(&self, bus: &B) -> bool {
        let sent = self.send(bus, ControlField::Ready);
        if sent {
            tracing::info!(client_id = %self.client_id, "Announced ready");
        }
        sent
    }

    /// Skipped silently while disconnected.
    pub fn heartbeat<B: BusPort + ?Sized>(&self, bus: &B) -> bool {
        if !bus.state().is_connected() {
            return false;
        }
        self.send(bus, ControlField::Heartbeat)
    }

    /// Send a heartbeat every `interval` until `cancel` fires.
    pub async fn run_heartbeat(
        self,
        bus: Arc<dyn BusPort>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.heartbeat(bus.as_ref());
                }
            }
        }
        tracing::debug!(client_id = %self.client_id, "Heartbeat stopped");
    }
}
