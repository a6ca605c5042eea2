//! Bus router: one wildcard subscription, one handler per field.
//!
//! Inbound topics are parsed back into `(domain, field, instance)`. Unknown
//! topics are dropped at debug level; a failing handler is logged and the
//! router carries on with the next message.

use std::collections::HashMap;
use std::sync::Arc;

use supershow_domain::PlayerId;
use supershow_shared::{
    BusMessage, BusPort, ConnectionState, Field, InboundPayload, QoS, Topic, WILDCARD_ALL,
};

use crate::beacon::ControlBeacon;
use crate::replica::HandlerError;

pub type Handler =
    Box<dyn Fn(Option<PlayerId>, &InboundPayload) -> Result<(), HandlerError> + Send + Sync>;

/// What happened to one routed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    /// Topic didn't parse.
    Unroutable,
    /// Parsed, but nothing is registered for the field.
    Unhandled,
    /// Payload didn't decode or the handler failed.
    Rejected,
}

#[derive(Default)]
pub struct BusRouter {
    handlers: HashMap<Field, Handler>,
}

impl BusRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, field: Field, handler: Handler) {
        if self.handlers.insert(field, handler).is_some() {
            tracing::warn!(field = %field, "Replaced existing handler");
        }
    }

    pub fn handles(&self, field: Field) -> bool {
        self.handlers.contains_key(&field)
    }

    pub fn route(&self, message: &BusMessage) -> Dispatch {
        let topic = match message.topic.parse::<Topic>() {
            Ok(topic) => topic,
            Err(e) => {
                tracing::debug!(topic = %message.topic, error = %e, "Dropping unroutable message");
                return Dispatch::Unroutable;
            }
        };
        let Some(handler) = self.handlers.get(&topic.field()) else {
            tracing::debug!(topic = %topic, "No handler for topic");
            return Dispatch::Unhandled;
        };

        let result = InboundPayload::decode(&message.payload)
            .map_err(HandlerError::from)
            .and_then(|payload| handler(topic.instance(), &payload));
        match result {
            Ok(()) => {
                tracing::trace!(topic = %topic, retained = message.retained, "Applied");
                Dispatch::Applied
            }
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Dropping message");
                Dispatch::Rejected
            }
        }
    }

    /// Route every message from `bus` and (re)subscribe to the whole
    /// namespace each time it connects. With a beacon, each successful
    /// subscription is followed by a ready signal.
    pub fn attach<B>(self: &Arc<Self>, bus: &Arc<B>, beacon: Option<ControlBeacon>)
    where
        B: BusPort + ?Sized + 'static,
    {
        let router = Arc::clone(self);
        bus.set_on_message(Box::new(move |message| {
            router.route(&message);
        }));

        let weak_bus = Arc::downgrade(bus);
        bus.set_on_state_change(Box::new(move |state| {
            if state != ConnectionState::Connected {
                return;
            }
            let Some(bus) = weak_bus.upgrade() else {
                return;
            };
            if !bus.subscribe(WILDCARD_ALL, QoS::AtLeastOnce) {
                tracing::warn!(filter = WILDCARD_ALL, "Subscription not queued");
                return;
            }
            tracing::info!(filter = WILDCARD_ALL, "Subscribed");
            if let Some(ref beacon) = beacon {
                beacon.announce_ready(bus.as_ref());
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use supershow_shared::{MatchField, MockBusPort, PlayerField};

    type Seen = Arc<Mutex<Vec<(Option<PlayerId>, String)>>>;

    fn recording(seen: &Seen) -> Handler {
        let seen = Arc::clone(seen);
        Box::new(move |player, payload| {
            seen.lock().unwrap().push((player, payload.raw().to_string()));
            Ok(())
        })
    }

    fn message(topic: &str, payload: &str) -> BusMessage {
        BusMessage::new(topic, payload.as_bytes().to_vec(), false)
    }

    #[test]
    fn test_dispatch_by_field_with_instance() {
        let seen: Seen = Arc::default();
        let mut router = BusRouter::new();
        router.register(Field::Player(PlayerField::HandCount), recording(&seen));

        assert_eq!(
            router.route(&message("supershow/player/2/hand_count", "4")),
            Dispatch::Applied
        );
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Some(PlayerId::Two), "4".to_string())]
        );
    }

    #[test]
    fn test_unknown_topics_dropped() {
        let seen: Seen = Arc::default();
        let mut router = BusRouter::new();
        router.register(Field::Match(MatchField::Title), recording(&seen));

        assert_eq!(
            router.route(&message("supershow/match/referee", "x")),
            Dispatch::Unroutable
        );
        assert_eq!(
            router.route(&message("supershow/player/3/hand_count", "1")),
            Dispatch::Unroutable
        );
        assert_eq!(router.route(&message("other/match/title", "x")), Dispatch::Unroutable);
        assert_eq!(
            router.route(&message("supershow/match/crowd_meter", "1")),
            Dispatch::Unhandled
        );
        assert_eq!(
            router.route(&message("supershow/match/title", "still works")),
            Dispatch::Applied
        );
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_handler_error_does_not_stop_router() {
        let seen: Seen = Arc::default();
        let mut router = BusRouter::new();
        router.register(
            Field::Match(MatchField::CrowdMeter),
            Box::new(|_, payload| {
                payload.as_int()?;
                Ok(())
            }),
        );
        router.register(Field::Match(MatchField::Title), recording(&seen));

        assert_eq!(
            router.route(&message("supershow/match/crowd_meter", "loud")),
            Dispatch::Rejected
        );
        assert_eq!(
            router.route(&BusMessage::new("supershow/match/title", vec![0xff, 0xfe], false)),
            Dispatch::Rejected
        );
        assert_eq!(
            router.route(&message("supershow/match/title", "ok")),
            Dispatch::Applied
        );
    }

    #[test]
    fn test_attach_subscribes_on_connect() {
        let captured: Arc<Mutex<Option<supershow_shared::StateCallback>>> = Arc::default();
        let slot = Arc::clone(&captured);

        let mut bus = MockBusPort::new();
        bus.expect_set_on_message().times(1).return_const(());
        bus.expect_set_on_state_change()
            .times(1)
            .returning(move |cb| *slot.lock().unwrap() = Some(cb));
        bus.expect_subscribe()
            .withf(|filter, _| filter == WILDCARD_ALL)
            .times(2)
            .returning(|_, _| true);
        let bus = Arc::new(bus);

        Arc::new(BusRouter::new()).attach(&bus, None);

        let guard = captured.lock().unwrap();
        let on_state = guard.as_ref().unwrap();
        on_state(ConnectionState::Connecting);
        on_state(ConnectionState::Connected);
        on_state(ConnectionState::Backoff);
        on_state(ConnectionState::Connected);
    }
}
