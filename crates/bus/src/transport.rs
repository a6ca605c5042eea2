//! Seam between the connection driver and the wire.
//!
//! A transport is split the way rumqttc splits it: a cheap, clonable request
//! side ([`PacketSink`]) used from any thread, and a session ([`Session`]) that
//! only the driver task polls. Polling a session after an error starts a new
//! connection attempt.

use async_trait::async_trait;
use supershow_shared::{BusMessage, QoS};

use crate::TransportError;

/// What one poll of the session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Broker accepted the connection.
    Connected,
    Message(BusMessage),
    /// Broker closed the session.
    Disconnected,
    /// Protocol traffic with no meaning to bus users (acks, pings).
    Other,
}

#[async_trait]
pub trait Session: Send {
    async fn poll(&mut self) -> Result<SessionEvent, TransportError>;

    /// Flush a pending disconnect. Called once, after a clean disconnect request.
    async fn close(&mut self) {}
}

/// Non-blocking request side of a transport.
pub trait PacketSink: Send + Sync {
    fn try_publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;

    fn try_subscribe(&self, filter: &str, qos: QoS) -> Result<(), TransportError>;

    fn try_disconnect(&self) -> Result<(), TransportError>;
}
