//! Maps match state onto bus topics.
//!
//! Every state topic is published retained at QoS 1, so a late subscriber
//! rebuilds the match from the broker alone. Event, control and reset topics
//! are transient. Retention is a property of the topic, not the call site.

use std::sync::Arc;

use supershow_domain::{
    CrowdMeter, HandCount, MatchState, PlayerId, PlayerState, RollValue, TurnRoll,
};
use supershow_shared::{
    BusPort, EventField, MatchEventRecord, MatchField, MatchInitPayload, Payload, PlayerField,
    QoS, Topic,
};

pub struct StatePublisher {
    bus: Arc<dyn BusPort>,
}

impl StatePublisher {
    pub fn new(bus: Arc<dyn BusPort>) -> Self {
        Self { bus }
    }

    pub fn is_connected(&self) -> bool {
        self.bus.state().is_connected()
    }

    /// Publish one payload. Returns `false` if the bus dropped it.
    pub fn publish(&self, topic: Topic, payload: Payload) -> bool {
        let retain = topic.is_retained();
        let accepted = self
            .bus
            .publish(&topic.to_string(), payload.to_bytes(), QoS::AtLeastOnce, retain);
        if !accepted {
            tracing::debug!(topic = %topic, "State publish not accepted");
        }
        accepted
    }

    fn publish_record<T: serde::Serialize>(&self, topic: Topic, record: &T) -> bool {
        match Payload::record(record) {
            Ok(payload) => self.publish(topic, payload),
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Failed to encode record");
                false
            }
        }
    }

    pub fn publish_match_init(&self, state: &MatchState) -> bool {
        let init = MatchInitPayload {
            match_id: state.match_id.clone(),
            title: state.title.clone(),
            stipulations: state.stipulations.clone(),
            player1_competitor: state.player1.competitor_id.clone(),
            player2_competitor: state.player2.competitor_id.clone(),
            started_at: state.started_at,
        };
        let ok = self.publish_record(Topic::Match(MatchField::Init), &init);
        if ok {
            tracing::info!(match_id = %state.match_id, "Published match init");
        } else {
            tracing::warn!(match_id = %state.match_id, "Match init not published");
        }
        ok
    }

    pub fn publish_title(&self, title: &str) -> bool {
        self.publish(Topic::Match(MatchField::Title), Payload::text(title))
    }

    pub fn publish_stipulations(&self, stipulations: &str) -> bool {
        self.publish(
            Topic::Match(MatchField::Stipulations),
            Payload::text(stipulations),
        )
    }

    pub fn publish_crowd_meter(&self, crowd: CrowdMeter) -> bool {
        self.publish(
            Topic::Match(MatchField::CrowdMeter),
            Payload::int(crowd.value()),
        )
    }

    pub fn publish_competitor(&self, player: PlayerId, competitor_id: Option<&str>) -> bool {
        self.publish(
            Topic::Player(player, PlayerField::Competitor),
            Payload::optional_text(competitor_id),
        )
    }

    /// Hand count, then the deck count derived from it.
    pub fn publish_hand_count(&self, player: PlayerId, hand: HandCount) -> bool {
        let hand_ok = self.publish(
            Topic::Player(player, PlayerField::HandCount),
            Payload::int(hand.value()),
        );
        let deck_ok = self.publish(
            Topic::Player(player, PlayerField::DeckCount),
            Payload::int(hand.deck_count().value()),
        );
        hand_ok && deck_ok
    }

    pub fn publish_turn_roll(&self, player: PlayerId, roll: Option<&TurnRoll>) -> bool {
        self.publish(
            Topic::Player(player, PlayerField::TurnRoll),
            Payload::turn_roll(roll),
        )
    }

    pub fn publish_turns_passed(&self, player: PlayerId, turns: u32) -> bool {
        self.publish(
            Topic::Player(player, PlayerField::TurnsPassed),
            Payload::int(turns),
        )
    }

    pub fn publish_finish_roll(&self, player: PlayerId, roll: Option<RollValue>) -> bool {
        self.publish(
            Topic::Player(player, PlayerField::FinishRoll),
            Payload::optional_int(roll.map(|r| i64::from(r.value()))),
        )
    }

    pub fn publish_breakout_rolls(&self, player: PlayerId, rolls: &[RollValue]) -> bool {
        self.publish(
            Topic::Player(player, PlayerField::BreakoutRolls),
            Payload::int_list(rolls.iter().map(|r| r.value())),
        )
    }

    fn publish_player(&self, player: &PlayerState) -> bool {
        let id = player.player_id;
        [
            self.publish_competitor(id, player.competitor_id.as_deref()),
            self.publish(
                Topic::Player(id, PlayerField::HandCount),
                Payload::int(player.hand_count.value()),
            ),
            self.publish(
                Topic::Player(id, PlayerField::DeckCount),
                Payload::int(player.deck_count.value()),
            ),
            self.publish_turn_roll(id, player.last_turn_roll.as_ref()),
            self.publish_turns_passed(id, player.turns_passed),
            self.publish_finish_roll(id, player.finish_roll),
            self.publish_breakout_rolls(id, &player.breakout_rolls),
        ]
        .iter()
        .all(|ok| *ok)
    }

    /// Full snapshot: init, match fields, then each player's seven fields.
    pub fn publish_snapshot(&self, state: &MatchState) -> bool {
        let results = [
            self.publish_match_init(state),
            self.publish_title(&state.title),
            self.publish_stipulations(&state.stipulations),
            self.publish_crowd_meter(state.crowd_meter),
            self.publish_player(&state.player1),
            self.publish_player(&state.player2),
        ];
        let ok = results.iter().all(|ok| *ok);
        if ok {
            tracing::info!(match_id = %state.match_id, "Published full snapshot");
        } else {
            tracing::warn!(match_id = %state.match_id, "Snapshot published partially");
        }
        ok
    }

    /// Transient reset signal, then an empty retained payload on every state
    /// topic so no stale value survives for late joiners.
    pub fn publish_reset(&self) -> bool {
        let signal_ok = self.publish(Topic::Match(MatchField::Reset), Payload::Empty);
        let topics = Topic::retained_state_topics();
        let mut cleared = 0;
        for topic in &topics {
            if self.publish(*topic, Payload::Empty) {
                cleared += 1;
            }
        }
        tracing::info!(cleared, "Published match reset");
        signal_ok && cleared == topics.len()
    }

    pub fn publish_event(&self, field: EventField, record: &MatchEventRecord) -> bool {
        self.publish_record(Topic::Event(field), record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use supershow_domain::RollType;
    use supershow_shared::MockBusPort;

    type Published = Arc<Mutex<Vec<(String, Vec<u8>, bool)>>>;

    fn recording_bus() -> (Arc<dyn BusPort>, Published) {
        let published: Published = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        let mut bus = MockBusPort::new();
        bus.expect_publish()
            .returning(move |topic, payload, qos, retain| {
                assert_eq!(qos, QoS::AtLeastOnce);
                sink.lock()
                    .unwrap()
                    .push((topic.to_string(), payload, retain));
                true
            });
        (Arc::new(bus), published)
    }

    fn topics(published: &Published) -> Vec<String> {
        published.lock().unwrap().iter().map(|(t, _, _)| t.clone()).collect()
    }

    fn text(bytes: &[u8]) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_hand_count_publishes_hand_then_deck() {
        let (bus, published) = recording_bus();
        let publisher = StatePublisher::new(bus);

        publisher.publish_hand_count(PlayerId::One, HandCount::clamp(31).into_value());

        let published = published.lock().unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].0, "supershow/player/1/hand_count");
        assert_eq!(text(&published[0].1), "30");
        assert_eq!(published[1].0, "supershow/player/1/deck_count");
        assert_eq!(text(&published[1].1), "0");
        assert!(published.iter().all(|(_, _, retain)| *retain));
    }

    #[test]
    fn test_snapshot_order_init_first() {
        let (bus, published) = recording_bus();
        let publisher = StatePublisher::new(bus);
        let mut state = MatchState::new();
        state.match_id = "match-1".to_string();

        assert!(publisher.publish_snapshot(&state));

        let mut expected = vec![
            "supershow/match/init".to_string(),
            "supershow/match/title".to_string(),
            "supershow/match/stipulations".to_string(),
            "supershow/match/crowd_meter".to_string(),
        ];
        for id in ["1", "2"] {
            for field in PlayerField::SNAPSHOT {
                expected.push(format!("supershow/player/{}/{}", id, field));
            }
        }
        assert_eq!(topics(&published), expected);
    }

    #[test]
    fn test_dropped_match_init_reports_failure() {
        let mut bus = MockBusPort::new();
        bus.expect_publish()
            .withf(|topic, _, _, retain| topic == "supershow/match/init" && *retain)
            .times(1)
            .returning(|_, _, _, _| false);
        let publisher = StatePublisher::new(Arc::new(bus));
        let mut state = MatchState::new();
        state.match_id = "match-1".to_string();

        assert!(!publisher.publish_match_init(&state));
    }

    #[test]
    fn test_unset_values_publish_empty_payloads() {
        let (bus, published) = recording_bus();
        let publisher = StatePublisher::new(bus);

        publisher.publish_competitor(PlayerId::Two, None);
        publisher.publish_finish_roll(PlayerId::Two, None);
        publisher.publish_turn_roll(PlayerId::Two, None);

        assert!(published.lock().unwrap().iter().all(|(_, p, _)| p.is_empty()));
    }

    #[test]
    fn test_wire_shapes() {
        let (bus, published) = recording_bus();
        let publisher = StatePublisher::new(bus);
        let rolls = [11, 12, 1].map(|v| RollValue::new(v).unwrap());

        publisher.publish_title("Main Event");
        publisher.publish_breakout_rolls(PlayerId::One, &rolls);
        publisher.publish_turn_roll(
            PlayerId::One,
            Some(&TurnRoll::new(RollType::Power, RollValue::new(7).unwrap())),
        );

        let published = published.lock().unwrap();
        assert_eq!(text(&published[0].1), "Main Event");
        assert_eq!(text(&published[1].1), "[11,12,1]");
        let roll: serde_json::Value = serde_json::from_slice(&published[2].1).unwrap();
        assert_eq!(roll, serde_json::json!({"roll_type": "Power", "value": 7}));
    }

    #[test]
    fn test_reset_signal_then_clears_every_state_topic() {
        let (bus, published) = recording_bus();
        let publisher = StatePublisher::new(bus);

        assert!(publisher.publish_reset());

        let published = published.lock().unwrap();
        let (signal_topic, signal_payload, signal_retain) = &published[0];
        assert_eq!(signal_topic, "supershow/match/reset");
        assert!(signal_payload.is_empty());
        assert!(!signal_retain);

        let cleared: Vec<&String> = published[1..].iter().map(|(t, _, _)| t).collect();
        assert_eq!(cleared.len(), Topic::retained_state_topics().len());
        assert!(cleared.contains(&&"supershow/match/title".to_string()));
        assert!(cleared.contains(&&"supershow/player/2/breakout_rolls".to_string()));
        assert!(published[1..].iter().all(|(_, p, retain)| p.is_empty() && *retain));
    }

    #[test]
    fn test_events_are_not_retained() {
        let (bus, published) = recording_bus();
        let publisher = StatePublisher::new(bus);
        let record = MatchEventRecord {
            event_id: "match-1-1".to_string(),
            match_id: "match-1".to_string(),
            timestamp: 1,
            event_type: "turn_passed".to_string(),
            player_id: Some(PlayerId::Two),
            data: serde_json::json!({"turns_passed": 1}),
        };

        publisher.publish_event(EventField::TurnPassed, &record);

        let published = published.lock().unwrap();
        assert_eq!(published[0].0, "supershow/events/turn_passed");
        assert!(!published[0].2);
    }

    #[test]
    fn test_dropped_publish_reports_false() {
        let mut bus = MockBusPort::new();
        bus.expect_publish().returning(|_, _, _, _| false);
        let publisher = StatePublisher::new(Arc::new(bus));
        assert!(!publisher.publish_title("x"));
        assert!(!publisher.publish_snapshot(&MatchState::new()));
    }
}
