//! Supershow Bus - broker connections
//!
//! [`BusConnection`] owns one MQTT connection and a background driver task
//! that reconnects with exponential backoff. [`MemoryBroker`] is an in-process
//! stand-in with the same retained semantics, for tests and local demos.
//!
//! Both implement [`supershow_shared::BusPort`].

pub mod backoff;
pub mod connection;
pub mod error;
pub mod memory;
pub mod mqtt;
pub mod state;
pub mod transport;

pub use backoff::BackoffState;
pub use connection::BusConnection;
pub use error::{BusError, TransportError};
pub use memory::{JournalEntry, MemoryBroker, MemoryBusClient};
pub use state::{ConnectionStateObserver, StateCell};
pub use transport::{PacketSink, Session, SessionEvent};
