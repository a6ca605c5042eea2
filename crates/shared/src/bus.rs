//! Bus port: the publish/subscribe surface every process talks through
//!
//! The controller and production crates depend on [`BusPort`] only; the MQTT
//! connection and the in-memory test broker in `supershow-bus` implement it.

use std::fmt;
use std::time::Duration;

/// MQTT delivery guarantee. State topics use `AtLeastOnce`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QoS {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

/// Connection lifecycle as seen by bus users.
///
/// ```text
/// Disconnected -> Connecting -> Connected
///      ^              |             |
///      |           failure       failure
///      |              v             v
///   Backoff <----- Disconnected <---+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting out a reconnect delay.
    Backoff,
}

impl ConnectionState {
    /// Convert to u8 for atomic storage
    pub fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Backoff => 3,
        }
    }

    /// Convert from u8 (for atomic storage)
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Backoff,
            _ => ConnectionState::Disconnected,
        }
    }

    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Backoff => "backoff",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message delivered from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    /// Set when the broker replayed a stored value on subscribe.
    pub retained: bool,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>, retained: bool) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retained,
        }
    }
}

pub type MessageCallback = Box<dyn Fn(BusMessage) + Send + Sync>;
pub type StateCallback = Box<dyn Fn(ConnectionState) + Send + Sync>;

/// Publish/subscribe primitives over one broker connection.
///
/// Nothing here blocks or queues: `publish` and `subscribe` report `false`
/// immediately when the connection is not up. Callbacks run on the bus's own
/// task, never on the caller's.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait BusPort: Send + Sync {
    /// Hand a publish to the client. `false` means it was dropped.
    fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS, retain: bool) -> bool;

    /// Subscribe to a filter. Only meaningful while connected; callers
    /// re-subscribe after every reconnect.
    fn subscribe(&self, filter: &str, qos: QoS) -> bool;

    fn state(&self) -> ConnectionState;

    /// Replace the inbound message callback.
    fn set_on_message(&self, callback: MessageCallback);

    /// Replace the connection state callback.
    fn set_on_state_change(&self, callback: StateCallback);
}

/// Construction parameters for a bus connection. Fixed for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keepalive: Duration,
    pub reconnect_min: Duration,
    pub reconnect_max: Duration,
}

impl BusConfig {
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            username: None,
            password: None,
            keepalive: Duration::from_secs(60),
            reconnect_min: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(60),
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Reconnect delay bounds. `max` below `min` is raised to `min`.
    pub fn with_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.reconnect_min = min;
        self.reconnect_max = max.max(min);
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
