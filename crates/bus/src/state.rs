//! Connection state storage and change notification.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use supershow_shared::{ConnectionState, StateCallback};

/// Current state plus the listener to tell about changes.
///
/// Once closed, only the final transition to `Disconnected` is reported;
/// a driver still unwinding can't flip the state back.
///
/// Transitions are serialized by `gate`, held across the closed check, the
/// store and the notification. Listeners must not drive the cell themselves.
pub struct StateCell {
    state: AtomicU8,
    closed: AtomicBool,
    gate: Mutex<()>,
    on_change: Mutex<Option<StateCallback>>,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected.to_u8()),
            closed: AtomicBool::new(false),
            gate: Mutex::new(()),
            on_change: Mutex::new(None),
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn set_listener(&self, callback: StateCallback) {
        *self.on_change.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Move to `next` and notify. Returns `false` when ignored because closed.
    pub fn transition(&self, next: ConnectionState) -> bool {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_closed() {
            return false;
        }
        self.store_and_notify(next);
        true
    }

    /// Close for good, ending in `Disconnected`. Returns `false` if already closed.
    pub fn close(&self) -> bool {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.store_and_notify(ConnectionState::Disconnected);
        true
    }

    fn store_and_notify(&self, next: ConnectionState) {
        let previous = ConnectionState::from_u8(self.state.swap(next.to_u8(), Ordering::SeqCst));
        if previous == next {
            return;
        }
        tracing::info!(from = %previous, to = %next, "Bus connection state changed");
        let callback = self.on_change.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref cb) = *callback {
            cb(next);
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a connection's state for status displays.
#[derive(Clone)]
pub struct ConnectionStateObserver {
    cell: Arc<StateCell>,
}

impl ConnectionStateObserver {
    pub fn new(cell: Arc<StateCell>) -> Self {
        Self { cell }
    }

    pub fn state(&self) -> ConnectionState {
        self.cell.get()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_cell() -> (StateCell, Arc<Mutex<Vec<ConnectionState>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let cell = StateCell::new();
        let sink = Arc::clone(&seen);
        cell.set_listener(Box::new(move |s| sink.lock().unwrap().push(s)));
        (cell, seen)
    }

    #[test]
    fn test_transitions_notify_once_per_change() {
        let (cell, seen) = recording_cell();
        cell.transition(ConnectionState::Connecting);
        cell.transition(ConnectionState::Connecting);
        cell.transition(ConnectionState::Connected);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ConnectionState::Connecting, ConnectionState::Connected]
        );
        assert_eq!(cell.get(), ConnectionState::Connected);
    }

    #[test]
    fn test_closed_cell_ignores_transitions() {
        let (cell, seen) = recording_cell();
        cell.transition(ConnectionState::Connected);
        assert!(cell.close());
        assert!(!cell.transition(ConnectionState::Backoff));
        assert!(!cell.close());
        assert_eq!(cell.get(), ConnectionState::Disconnected);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ConnectionState::Connected, ConnectionState::Disconnected]
        );
    }

    #[test]
    fn test_close_racing_driver_ends_disconnected() {
        for _ in 0..200 {
            let (cell, seen) = recording_cell();
            let cell = Arc::new(cell);
            cell.transition(ConnectionState::Connected);
            let driver = {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || {
                    while cell.transition(ConnectionState::Connecting)
                        && cell.transition(ConnectionState::Connected)
                    {}
                })
            };
            std::thread::yield_now();
            assert!(cell.close());
            driver.join().unwrap();

            assert_eq!(cell.get(), ConnectionState::Disconnected);
            assert_eq!(
                seen.lock().unwrap().last(),
                Some(&ConnectionState::Disconnected)
            );
        }
    }

    #[test]
    fn test_observer_tracks_cell() {
        let cell = Arc::new(StateCell::new());
        let observer = ConnectionStateObserver::new(Arc::clone(&cell));
        assert!(!observer.is_connected());
        cell.transition(ConnectionState::Connected);
        assert!(observer.is_connected());
    }
}
