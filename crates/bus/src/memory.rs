//! In-process broker with MQTT retained-message semantics.
//!
//! Used by tests and local demos in place of a real broker:
//!
//! - retained publishes are stored per topic; an empty retained payload deletes
//! - subscribing replays every matching retained value (`+` and `#` filters)
//! - live publishes fan out to every matching subscriber
//! - every publish is appended to a journal for assertions
//!
//! Retained replay can be shuffled with a fixed seed to show that subscribers
//! don't depend on cross-topic order.
//!
//! Delivery is synchronous on the publishing thread. Callbacks are invoked
//! after the broker lock is released, so they may publish in turn.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use supershow_shared::protocol::filter_matches;
use supershow_shared::{BusMessage, BusPort, ConnectionState, MessageCallback, QoS, StateCallback};

use crate::state::StateCell;

/// One publish as the broker saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub client_id: String,
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl JournalEntry {
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

struct Subscriber {
    id: u64,
    filters: Vec<String>,
    client: Weak<ClientCore>,
}

#[derive(Default)]
struct BrokerInner {
    retained: BTreeMap<String, Vec<u8>>,
    subscribers: Vec<Subscriber>,
    journal: Vec<JournalEntry>,
    shuffle: Option<StdRng>,
}

impl BrokerInner {
    fn subscriber_mut(&mut self, id: u64) -> Option<&mut Subscriber> {
        self.subscribers.iter_mut().find(|s| s.id == id)
    }
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Mutex<BrokerInner>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker whose retained replay order is a seeded shuffle.
    pub fn with_shuffled_replay(seed: u64) -> Self {
        let broker = Self::new();
        broker.lock().shuffle = Some(StdRng::seed_from_u64(seed));
        broker
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BrokerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// New client; starts disconnected like a real connection.
    pub fn client(&self, client_id: impl Into<String>) -> MemoryBusClient {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let core = Arc::new(ClientCore {
            client_id: client_id.into(),
            state: StateCell::new(),
            on_message: Mutex::new(None),
        });
        self.lock().subscribers.push(Subscriber {
            id,
            filters: Vec::new(),
            client: Arc::downgrade(&core),
        });
        MemoryBusClient {
            id,
            broker: self.clone(),
            core,
        }
    }

    pub fn retained(&self, topic: &str) -> Option<Vec<u8>> {
        self.lock().retained.get(topic).cloned()
    }

    pub fn retained_topics(&self) -> Vec<String> {
        self.lock().retained.keys().cloned().collect()
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    fn publish(&self, from: &str, topic: &str, payload: Vec<u8>, retain: bool) {
        let deliveries = {
            let mut inner = self.lock();
            inner.journal.push(JournalEntry {
                client_id: from.to_string(),
                topic: topic.to_string(),
                payload: payload.clone(),
                retain,
            });
            if retain {
                if payload.is_empty() {
                    inner.retained.remove(topic);
                } else {
                    inner.retained.insert(topic.to_string(), payload.clone());
                }
            }
            inner.subscribers.retain(|s| s.client.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter(|s| s.filters.iter().any(|f| filter_matches(f, topic)))
                .filter_map(|s| s.client.upgrade())
                .collect::<Vec<_>>()
        };

        for client in deliveries {
            client.deliver(BusMessage::new(topic, payload.clone(), false));
        }
    }

    fn subscribe(&self, id: u64, filter: &str) -> Option<Arc<ClientCore>> {
        let (client, replay) = {
            let mut inner = self.lock();
            let mut replay: Vec<(String, Vec<u8>)> = inner
                .retained
                .iter()
                .filter(|(topic, _)| filter_matches(filter, topic))
                .map(|(topic, payload)| (topic.clone(), payload.clone()))
                .collect();
            if let Some(rng) = inner.shuffle.as_mut() {
                replay.shuffle(rng);
            }
            let subscriber = inner.subscriber_mut(id)?;
            if !subscriber.filters.iter().any(|f| f == filter) {
                subscriber.filters.push(filter.to_string());
            }
            (subscriber.client.upgrade()?, replay)
        };

        for (topic, payload) in replay {
            client.deliver(BusMessage::new(topic, payload, true));
        }
        Some(client)
    }

    fn drop_subscriptions(&self, id: u64) {
        if let Some(subscriber) = self.lock().subscriber_mut(id) {
            subscriber.filters.clear();
        }
    }
}

struct ClientCore {
    client_id: String,
    state: StateCell,
    on_message: Mutex<Option<MessageCallback>>,
}

impl ClientCore {
    fn deliver(&self, message: BusMessage) {
        if !self.state.get().is_connected() {
            return;
        }
        let callback = self.on_message.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref cb) = *callback {
            cb(message);
        }
    }
}

/// A [`BusPort`] attached to a [`MemoryBroker`].
pub struct MemoryBusClient {
    id: u64,
    broker: MemoryBroker,
    core: Arc<ClientCore>,
}

impl MemoryBusClient {
    pub fn client_id(&self) -> &str {
        &self.core.client_id
    }

    pub fn connect(&self) {
        self.core.state.transition(ConnectionState::Connecting);
        self.core.state.transition(ConnectionState::Connected);
    }

    /// Connection loss: subscriptions are gone, as with a clean session.
    pub fn drop_connection(&self) {
        self.broker.drop_subscriptions(self.id);
        self.core.state.transition(ConnectionState::Disconnected);
    }

    /// Drop, back off and reconnect, in the same order the real driver reports.
    pub fn simulate_reconnect(&self) {
        self.drop_connection();
        self.core.state.transition(ConnectionState::Backoff);
        self.connect();
    }

    pub fn disconnect(&self) {
        self.broker.drop_subscriptions(self.id);
        self.core.state.close();
    }
}

impl BusPort for MemoryBusClient {
    fn publish(&self, topic: &str, payload: Vec<u8>, _qos: QoS, retain: bool) -> bool {
        if !self.core.state.get().is_connected() {
            tracing::warn!(topic = %topic, client_id = %self.core.client_id, "Publish dropped, not connected");
            return false;
        }
        self.broker.publish(&self.core.client_id, topic, payload, retain);
        true
    }

    fn subscribe(&self, filter: &str, _qos: QoS) -> bool {
        if !self.core.state.get().is_connected() {
            return false;
        }
        self.broker.subscribe(self.id, filter).is_some()
    }

    fn state(&self) -> ConnectionState {
        self.core.state.get()
    }

    fn set_on_message(&self, callback: MessageCallback) {
        *self.core.on_message.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn set_on_state_change(&self, callback: StateCallback) {
        self.core.state.set_listener(callback);
    }
}
