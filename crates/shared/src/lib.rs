//! Supershow Shared - contracts between controller, bus and production
//!
//! - Topic schema and payload codec (`protocol`)
//! - The bus port both sides publish and subscribe through (`bus`)
//! - The card catalog port used for display enrichment (`catalog`)
//! - Process settings (`settings`)
//!
//! No networking lives here; see `supershow-bus` for the connection.

pub mod bus;
pub mod catalog;
pub mod protocol;
pub mod settings;

pub use bus::{
    BusConfig, BusMessage, BusPort, ConnectionState, MessageCallback, QoS, StateCallback,
};
pub use catalog::{CardCatalog, CatalogError, JsonCardCatalog};
pub use protocol::{
    ControlField, ControlSignal, DecodeError, EventField, Field, InboundPayload, MatchEventRecord,
    MatchField, MatchInitPayload, Payload, PlayerField, Topic, TopicDomain, TopicError,
    TOPIC_ROOT, WILDCARD_ALL, WILDCARD_CONTROL,
};
pub use settings::{MqttSettings, Settings, SettingsError};

#[cfg(any(test, feature = "testing"))]
pub use bus::MockBusPort;
#[cfg(any(test, feature = "testing"))]
pub use catalog::MockCardCatalog;
