//! Bus connection with a background driver task.
//!
//! The driver owns the session: it polls it, dispatches inbound messages to
//! the registered callback, and on any failure walks
//! `Disconnected -> Backoff -> Connecting` before polling again. A successful
//! ConnAck resets the backoff. Only [`BusConnection::disconnect`] stops it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use supershow_shared::{
    BusConfig, BusMessage, BusPort, ConnectionState, MessageCallback, QoS, StateCallback,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffState;
use crate::mqtt;
use crate::state::{ConnectionStateObserver, StateCell};
use crate::transport::{PacketSink, Session, SessionEvent};
use crate::{BusError, TransportError};

/// Longest a clean disconnect waits for the session to flush.
const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// State shared between the handle and its driver task.
struct Shared {
    state: Arc<StateCell>,
    on_message: Mutex<Option<MessageCallback>>,
}

impl Shared {
    fn dispatch(&self, message: BusMessage) {
        let callback = self.on_message.lock().unwrap_or_else(PoisonError::into_inner);
        match *callback {
            Some(ref cb) => cb(message),
            None => tracing::debug!(topic = %message.topic, "Dropping message, no handler set"),
        }
    }
}

/// One broker connection. Create, register callbacks, then [`connect`](Self::connect).
pub struct BusConnection {
    config: BusConfig,
    shared: Arc<Shared>,
    sink: Arc<dyn PacketSink>,
    session: Mutex<Option<Box<dyn Session>>>,
    cancel: CancellationToken,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl BusConnection {
    /// MQTT connection for `config`. Nothing touches the network until `connect`.
    pub fn mqtt(config: BusConfig) -> Self {
        let (sink, session) = mqtt::transport(&config);
        Self::with_transport(config, Arc::new(sink), Box::new(session))
    }

    pub fn with_transport(
        config: BusConfig,
        sink: Arc<dyn PacketSink>,
        session: Box<dyn Session>,
    ) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                state: Arc::new(StateCell::new()),
                on_message: Mutex::new(None),
            }),
            sink,
            session: Mutex::new(Some(session)),
            cancel: CancellationToken::new(),
            driver: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn observer(&self) -> ConnectionStateObserver {
        ConnectionStateObserver::new(Arc::clone(&self.shared.state))
    }

    /// Spawn the driver and return immediately. Progress is reported through
    /// the state callback.
    pub fn connect(&self) -> Result<(), BusError> {
        if self.shared.state.is_closed() {
            return Err(BusError::Closed);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BusError::NoRuntime)?;
        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(BusError::AlreadyStarted)?;

        tracing::info!(broker = %self.config.address(), client_id = %self.config.client_id, "Connecting to broker");
        self.shared.state.transition(ConnectionState::Connecting);

        let driver = Driver {
            shared: Arc::clone(&self.shared),
            session,
            backoff: BackoffState::new(self.config.reconnect_min, self.config.reconnect_max),
            cancel: self.cancel.clone(),
        };
        let handle = runtime.spawn(driver.run());
        *self.driver.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Clean, final disconnect. No reconnect follows and the connection can't
    /// be reused.
    pub fn disconnect(&self) {
        if !self.shared.state.close() {
            return;
        }
        if let Err(e) = self.sink.try_disconnect() {
            tracing::debug!(error = %e, "Disconnect request not queued");
        }
        self.cancel.cancel();
        tracing::info!(client_id = %self.config.client_id, "Disconnected from broker");
    }

    /// Wait for the driver task to finish after `disconnect`.
    pub async fn join(&self) {
        let handle = self.driver.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Bus driver task ended abnormally");
            }
        }
    }
}

impl BusPort for BusConnection {
    fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS, retain: bool) -> bool {
        let state = self.shared.state.get();
        if !state.is_connected() {
            tracing::warn!(topic = %topic, state = %state, "Publish dropped, not connected");
            return false;
        }
        match self.sink.try_publish(topic, qos, retain, payload) {
            Ok(()) => {
                tracing::debug!(topic = %topic, retain, "Published");
                true
            }
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Publish dropped");
                false
            }
        }
    }

    fn subscribe(&self, filter: &str, qos: QoS) -> bool {
        let state = self.shared.state.get();
        if !state.is_connected() {
            tracing::warn!(filter = %filter, state = %state, "Subscribe skipped, not connected");
            return false;
        }
        match self.sink.try_subscribe(filter, qos) {
            Ok(()) => {
                tracing::info!(filter = %filter, "Subscribed");
                true
            }
            Err(e) => {
                tracing::warn!(filter = %filter, error = %e, "Subscribe failed");
                false
            }
        }
    }

    fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    fn set_on_message(&self, callback: MessageCallback) {
        *self.shared.on_message.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn set_on_state_change(&self, callback: StateCallback) {
        self.shared.state.set_listener(callback);
    }
}

impl Drop for BusConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Driver {
    shared: Arc<Shared>,
    session: Box<dyn Session>,
    backoff: BackoffState,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let polled = tokio::select! {
                _ = self.cancel.cancelled() => break,
                polled = self.session.poll() => polled,
            };

            let failure = match polled {
                Ok(SessionEvent::Connected) => {
                    self.backoff.reset();
                    self.shared.state.transition(ConnectionState::Connected);
                    None
                }
                Ok(SessionEvent::Message(message)) => {
                    self.shared.dispatch(message);
                    None
                }
                Ok(SessionEvent::Disconnected) => {
                    Some(TransportError::connection("broker closed the session"))
                }
                Ok(SessionEvent::Other) => None,
                Err(e) => Some(e),
            };

            if let Some(error) = failure {
                if self.cancel.is_cancelled() {
                    break;
                }
                if !self.wait_out_backoff(&error).await {
                    break;
                }
            }
        }

        if self.shared.state.is_closed() {
            let _ = tokio::time::timeout(CLOSE_TIMEOUT, self.session.close()).await;
        }
        tracing::debug!("Bus driver stopped");
    }

    /// Failure path. Returns `false` if cancelled while waiting.
    async fn wait_out_backoff(&mut self, error: &TransportError) -> bool {
        self.shared.state.transition(ConnectionState::Disconnected);
        let delay = self.backoff.next_delay_and_advance();
        tracing::warn!(
            error = %error,
            attempt = self.backoff.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Bus connection lost, backing off"
        );
        self.shared.state.transition(ConnectionState::Backoff);

        tokio::select! {
            _ = self.cancel.cancelled() => return false,
            _ = tokio::time::sleep(delay) => {}
        }

        self.shared.state.transition(ConnectionState::Connecting)
    }
}
