//! Authoritative match state.
//!
//! The controller is the only writer. Every mutation lands in local state
//! first; while a match is active it is also published right away. Before
//! `start_match`, edits only stage the next match.

use std::sync::Arc;

use serde_json::json;
use supershow_domain::{
    Card, Clamped, CrowdMeter, HandCount, MatchState, PlayerId, RollType, RollValue, TurnRoll,
};
use supershow_shared::{BusPort, CardCatalog, EventField, MatchEventRecord};

use crate::infrastructure::clock::ClockPort;
use crate::publisher::StatePublisher;
use crate::ControllerError;

/// Everything needed to open a match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSetup {
    pub title: String,
    pub stipulations: String,
    pub crowd_meter: i64,
    pub player1_competitor: Option<String>,
    pub player2_competitor: Option<String>,
}

impl MatchSetup {
    /// The values currently staged in `state`.
    pub fn from_state(state: &MatchState) -> Self {
        Self {
            title: state.title.clone(),
            stipulations: state.stipulations.clone(),
            crowd_meter: i64::from(state.crowd_meter.value()),
            player1_competitor: state.player1.competitor_id.clone(),
            player2_competitor: state.player2.competitor_id.clone(),
        }
    }
}

pub struct MatchController {
    state: MatchState,
    active: bool,
    publisher: StatePublisher,
    clock: Arc<dyn ClockPort>,
    catalog: Arc<dyn CardCatalog>,
    event_seq: u64,
}

/// Take the clamped value, warning when the input was out of range.
fn accept<T>(field: &'static str, player: Option<PlayerId>, clamped: Clamped<T>) -> T {
    if clamped.was_clamped {
        tracing::warn!(
            field,
            player = ?player.map(PlayerId::number),
            requested = clamped.requested,
            "Value out of range, clamped"
        );
    }
    clamped.value
}

impl MatchController {
    pub fn new(
        bus: Arc<dyn BusPort>,
        clock: Arc<dyn ClockPort>,
        catalog: Arc<dyn CardCatalog>,
    ) -> Self {
        Self {
            state: MatchState::new(),
            active: false,
            publisher: StatePublisher::new(bus),
            clock,
            catalog,
            event_seq: 0,
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_connected(&self) -> bool {
        self.publisher.is_connected()
    }

    /// Open a new match and publish a full snapshot. Player tallies start fresh.
    ///
    /// Returns whether every snapshot publish was accepted.
    pub fn start_match(&mut self, setup: MatchSetup) -> bool {
        let now = self.clock.unix_seconds();
        let crowd = accept("crowd_meter", None, CrowdMeter::clamp(setup.crowd_meter));

        let mut state = MatchState::new();
        state.match_id = format!("match-{}", now);
        state.title = setup.title;
        state.stipulations = setup.stipulations;
        state.crowd_meter = crowd;
        state.started_at = Some(now);
        state.player1.competitor_id = setup.player1_competitor;
        state.player2.competitor_id = setup.player2_competitor;
        self.state = state;
        self.active = true;
        self.event_seq = 0;

        let published = self.publisher.publish_snapshot(&self.state);
        self.emit_event(
            EventField::MatchStart,
            None,
            json!({
                "title": self.state.title,
                "stipulations": self.state.stipulations,
                "player1_competitor": self.state.player1.competitor_id,
                "player2_competitor": self.state.player2.competitor_id,
            }),
        );
        tracing::info!(match_id = %self.state.match_id, title = %self.state.title, "Match started");
        published
    }

    /// Start with whatever has been staged so far.
    pub fn start_staged(&mut self) -> bool {
        let setup = MatchSetup::from_state(&self.state);
        self.start_match(setup)
    }

    /// Publish the reset and clear every retained topic, then return to empty state.
    pub fn reset_match(&mut self) {
        self.publisher.publish_reset();
        self.state.reset();
        self.active = false;
        self.event_seq = 0;
        tracing::info!("Match reset");
    }

    /// Republish the full snapshot, e.g. after the broker lost retained state.
    pub fn resend_snapshot(&self) -> bool {
        if !self.active {
            tracing::warn!("No active match to resend");
            return false;
        }
        self.publisher.publish_snapshot(&self.state)
    }

    pub fn update_title(&mut self, title: impl Into<String>) {
        self.state.title = title.into();
        if self.active {
            self.publisher.publish_title(&self.state.title);
        }
    }

    pub fn update_stipulations(&mut self, stipulations: impl Into<String>) {
        self.state.stipulations = stipulations.into();
        if self.active {
            self.publisher.publish_stipulations(&self.state.stipulations);
        }
    }

    pub fn update_crowd_meter(&mut self, raw: i64) {
        let previous = self.state.crowd_meter;
        let crowd = accept("crowd_meter", None, CrowdMeter::clamp(raw));
        self.state.crowd_meter = crowd;
        if self.active {
            self.publisher.publish_crowd_meter(crowd);
            if crowd > previous {
                self.emit_event(
                    EventField::CrowdIncrement,
                    None,
                    json!({"from": previous.value(), "to": crowd.value()}),
                );
            }
        }
    }

    pub fn set_competitor(&mut self, player: PlayerId, competitor_id: Option<String>) {
        self.state.player_mut(player).competitor_id = competitor_id;
        if self.active {
            let id = self.state.player(player).competitor_id.as_deref();
            self.publisher.publish_competitor(player, id);
        }
    }

    /// Resolve `name` through the catalog and assign that competitor.
    pub fn set_competitor_by_name(
        &mut self,
        player: PlayerId,
        name: &str,
    ) -> Result<Card, ControllerError> {
        let card = self
            .competitor_by_name(name)?
            .ok_or_else(|| ControllerError::UnknownCompetitor(name.to_string()))?;
        self.set_competitor(player, Some(card.db_uuid.clone()));
        Ok(card)
    }

    pub fn update_turn_roll(&mut self, player: PlayerId, roll_type: RollType, raw: i64) {
        let value = accept("turn_roll", Some(player), RollValue::clamp(raw));
        let roll = TurnRoll::new(roll_type, value);
        self.state.player_mut(player).last_turn_roll = Some(roll);
        tracing::debug!(player = player.number(), roll = %roll, "Turn roll");
        if self.active {
            self.publisher.publish_turn_roll(player, Some(&roll));
            self.emit_event(
                EventField::TurnRoll,
                Some(player),
                json!({"roll_type": roll_type.as_str(), "value": value.value()}),
            );
        }
    }

    pub fn increment_hand_count(&mut self, player: PlayerId) {
        let hand = self.state.player(player).hand_count.incremented();
        self.apply_hand_count(player, hand);
    }

    pub fn decrement_hand_count(&mut self, player: PlayerId) {
        let hand = self.state.player(player).hand_count.decremented();
        self.apply_hand_count(player, hand);
    }

    pub fn set_hand_count(&mut self, player: PlayerId, raw: i64) {
        let hand = accept("hand_count", Some(player), HandCount::clamp(raw));
        self.apply_hand_count(player, hand);
    }

    fn apply_hand_count(&mut self, player: PlayerId, hand: HandCount) {
        self.state.player_mut(player).set_hand_count(hand);
        if self.active {
            self.publisher.publish_hand_count(player, hand);
        }
    }

    /// `None` clears the finish roll.
    pub fn update_finish_roll(&mut self, player: PlayerId, raw: Option<i64>) {
        let value = raw.map(|v| accept("finish_roll", Some(player), RollValue::clamp(v)));
        self.state.player_mut(player).finish_roll = value;
        if self.active {
            self.publisher.publish_finish_roll(player, value);
        }
    }

    pub fn add_breakout_roll(&mut self, player: PlayerId, raw: i64) {
        let value = accept("breakout_roll", Some(player), RollValue::clamp(raw));
        self.state.player_mut(player).breakout_rolls.push(value);
        if self.active {
            self.publisher
                .publish_breakout_rolls(player, &self.state.player(player).breakout_rolls);
        }
    }

    pub fn clear_breakout_rolls(&mut self, player: PlayerId) {
        self.state.player_mut(player).breakout_rolls.clear();
        if self.active {
            self.publisher.publish_breakout_rolls(player, &[]);
        }
    }

    pub fn increment_turns_passed(&mut self, player: PlayerId) {
        let turns = {
            let p = self.state.player_mut(player);
            p.turns_passed = p.turns_passed.saturating_add(1);
            p.turns_passed
        };
        if self.active {
            self.publisher.publish_turns_passed(player, turns);
            self.emit_event(
                EventField::TurnPassed,
                Some(player),
                json!({"turns_passed": turns}),
            );
        }
    }

    pub fn competitors(&self) -> Result<Vec<Card>, ControllerError> {
        Ok(self.catalog.competitors()?)
    }

    pub fn competitor_by_name(&self, name: &str) -> Result<Option<Card>, ControllerError> {
        Ok(self.catalog.find_competitor(name)?)
    }

    fn emit_event(&mut self, field: EventField, player: Option<PlayerId>, data: serde_json::Value) {
        self.event_seq += 1;
        let record = MatchEventRecord {
            event_id: format!("{}-{}", self.state.match_id, self.event_seq),
            match_id: self.state.match_id.clone(),
            timestamp: self.clock.unix_seconds(),
            event_type: field.as_str().to_string(),
            player_id: player,
            data,
        };
        self.publisher.publish_event(field, &record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use supershow_domain::CardType;
    use supershow_shared::{CatalogError, MockBusPort, MockCardCatalog, QoS};

    use crate::infrastructure::clock::FixedClock;

    const NOW: i64 = 1_700_000_000;

    type Published = Arc<Mutex<Vec<(String, String, bool)>>>;

    fn controller_with_catalog(catalog: MockCardCatalog) -> (MatchController, Published) {
        let published: Published = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        let mut bus = MockBusPort::new();
        bus.expect_publish()
            .returning(move |topic, payload, _qos: QoS, retain| {
                sink.lock().unwrap().push((
                    topic.to_string(),
                    String::from_utf8(payload).unwrap(),
                    retain,
                ));
                true
            });
        bus.expect_state()
            .returning(|| supershow_shared::ConnectionState::Connected);
        let controller = MatchController::new(
            Arc::new(bus),
            Arc::new(FixedClock::at_unix(NOW)),
            Arc::new(catalog),
        );
        (controller, published)
    }

    fn controller() -> (MatchController, Published) {
        controller_with_catalog(MockCardCatalog::new())
    }

    fn last_on(published: &Published, topic: &str) -> Option<String> {
        published
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _, _)| t == topic)
            .map(|(_, p, _)| p.clone())
    }

    fn started() -> (MatchController, Published) {
        let (mut controller, published) = controller();
        controller.start_match(MatchSetup {
            title: "Main Event".to_string(),
            stipulations: "No DQ".to_string(),
            crowd_meter: 2,
            player1_competitor: Some("c-1".to_string()),
            player2_competitor: Some("c-2".to_string()),
        });
        published.lock().unwrap().clear();
        (controller, published)
    }

    #[test]
    fn test_edits_before_start_are_local_only() {
        let (mut controller, published) = controller();
        controller.update_title("Staged");
        controller.set_hand_count(PlayerId::One, 5);
        controller.add_breakout_roll(PlayerId::Two, 4);

        assert!(published.lock().unwrap().is_empty());
        assert_eq!(controller.state().title, "Staged");
        assert_eq!(controller.state().player1.deck_count.value(), 25);
        assert!(!controller.is_active());
    }

    #[test]
    fn test_start_match_publishes_snapshot_and_event() {
        let (mut controller, published) = controller();
        controller.set_hand_count(PlayerId::One, 9);
        assert!(controller.start_match(MatchSetup {
            title: "Main Event".to_string(),
            crowd_meter: 14,
            ..MatchSetup::default()
        }));

        let state = controller.state();
        assert_eq!(state.match_id, format!("match-{}", NOW));
        assert_eq!(state.started_at, Some(NOW));
        assert_eq!(state.crowd_meter.value(), 10);
        assert_eq!(state.player1.hand_count.value(), 0);

        let published = published.lock().unwrap();
        assert_eq!(published[0].0, "supershow/match/init");
        let init: serde_json::Value = serde_json::from_str(&published[0].1).unwrap();
        assert_eq!(init["match_id"], format!("match-{}", NOW));
        assert_eq!(init["started_at"], NOW);
        let event = published.last().unwrap();
        assert_eq!(event.0, "supershow/events/match_start");
        assert!(!event.2);
    }

    #[test]
    fn test_start_staged_uses_staged_values() {
        let (mut controller, published) = controller();
        controller.update_title("Staged Title");
        controller.set_competitor(PlayerId::Two, Some("c-9".to_string()));
        controller.start_staged();

        assert_eq!(
            last_on(&published, "supershow/match/title").as_deref(),
            Some("Staged Title")
        );
        assert_eq!(
            last_on(&published, "supershow/player/2/competitor").as_deref(),
            Some("c-9")
        );
    }

    #[test]
    fn test_hand_count_clamped_and_deck_derived() {
        let (mut controller, published) = started();
        controller.set_hand_count(PlayerId::One, 31);

        assert_eq!(
            last_on(&published, "supershow/player/1/hand_count").as_deref(),
            Some("30")
        );
        assert_eq!(
            last_on(&published, "supershow/player/1/deck_count").as_deref(),
            Some("0")
        );

        controller.decrement_hand_count(PlayerId::One);
        assert_eq!(controller.state().player1.hand_count.value(), 29);
        assert_eq!(controller.state().player1.deck_count.value(), 1);
    }

    #[test]
    fn test_hand_increment_saturates_at_deck_size() {
        let (mut controller, _) = started();
        for _ in 0..35 {
            controller.increment_hand_count(PlayerId::Two);
        }
        assert_eq!(controller.state().player2.hand_count.value(), 30);
        controller.set_hand_count(PlayerId::Two, 0);
        controller.decrement_hand_count(PlayerId::Two);
        assert_eq!(controller.state().player2.hand_count.value(), 0);
    }

    #[test]
    fn test_breakout_rolls_clamped() {
        let (mut controller, published) = started();
        for raw in [11, 13, 0] {
            controller.add_breakout_roll(PlayerId::One, raw);
        }
        assert_eq!(
            last_on(&published, "supershow/player/1/breakout_rolls").as_deref(),
            Some("[11,12,1]")
        );

        controller.clear_breakout_rolls(PlayerId::One);
        assert_eq!(
            last_on(&published, "supershow/player/1/breakout_rolls").as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_turn_roll_publishes_state_and_event() {
        let (mut controller, published) = started();
        controller.update_turn_roll(PlayerId::Two, RollType::Agility, 15);

        let roll: serde_json::Value = serde_json::from_str(
            &last_on(&published, "supershow/player/2/turn_roll").unwrap(),
        )
        .unwrap();
        assert_eq!(roll, serde_json::json!({"roll_type": "Agility", "value": 12}));

        let event: serde_json::Value =
            serde_json::from_str(&last_on(&published, "supershow/events/turn_roll").unwrap())
                .unwrap();
        assert_eq!(event["player_id"], 2);
        assert_eq!(event["event_id"], format!("match-{}-2", NOW));
    }

    #[test]
    fn test_finish_roll_set_and_clear() {
        let (mut controller, published) = started();
        controller.update_finish_roll(PlayerId::One, Some(0));
        assert_eq!(
            last_on(&published, "supershow/player/1/finish_roll").as_deref(),
            Some("1")
        );
        controller.update_finish_roll(PlayerId::One, None);
        assert_eq!(
            last_on(&published, "supershow/player/1/finish_roll").as_deref(),
            Some("")
        );
        assert_eq!(controller.state().player1.finish_roll, None);
    }

    #[test]
    fn test_crowd_increment_event_only_when_rising() {
        let (mut controller, published) = started();
        controller.update_crowd_meter(5);
        controller.update_crowd_meter(3);

        let events: Vec<String> = published
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _, _)| t == "supershow/events/crowd_increment")
            .map(|(_, p, _)| p.clone())
            .collect();
        assert_eq!(events.len(), 1);
        let event: serde_json::Value = serde_json::from_str(&events[0]).unwrap();
        assert_eq!(event["data"], serde_json::json!({"from": 2, "to": 5}));
    }

    #[test]
    fn test_turns_passed_counts_up() {
        let (mut controller, published) = started();
        controller.increment_turns_passed(PlayerId::Two);
        controller.increment_turns_passed(PlayerId::Two);
        assert_eq!(
            last_on(&published, "supershow/player/2/turns_passed").as_deref(),
            Some("2")
        );
        assert!(last_on(&published, "supershow/events/turn_passed").is_some());
    }

    #[test]
    fn test_reset_clears_state_and_topics() {
        let (mut controller, published) = started();
        controller.reset_match();

        assert!(!controller.is_active());
        assert_eq!(controller.state(), &MatchState::new());
        let published = published.lock().unwrap();
        assert_eq!(published[0].0, "supershow/match/reset");
        assert!(published[1..].iter().all(|(_, p, retain)| p.is_empty() && *retain));

        drop(published);
        assert!(!controller.resend_snapshot());
    }

    #[test]
    fn test_resend_snapshot_when_active() {
        let (controller, published) = started();
        assert!(controller.resend_snapshot());
        assert_eq!(published.lock().unwrap()[0].0, "supershow/match/init");
    }

    fn competitor(id: &str, name: &str) -> Card {
        serde_json::from_value(serde_json::json!({
            "db_uuid": id,
            "name": name,
            "card_type": CardType::SingleCompetitorCard,
        }))
        .unwrap()
    }

    #[test]
    fn test_set_competitor_by_name() {
        let mut catalog = MockCardCatalog::new();
        catalog
            .expect_find_competitor()
            .withf(|name| name == "Ace")
            .returning(|_| Ok(Some(competitor("c-1", "Ace Harper"))));
        catalog
            .expect_find_competitor()
            .withf(|name| name != "Ace")
            .returning(|_| Ok(None));
        let (mut controller, _) = controller_with_catalog(catalog);

        let card = controller.set_competitor_by_name(PlayerId::One, "Ace").unwrap();
        assert_eq!(card.name, "Ace Harper");
        assert_eq!(controller.state().player1.competitor_id.as_deref(), Some("c-1"));

        assert!(matches!(
            controller.set_competitor_by_name(PlayerId::Two, "Nobody"),
            Err(ControllerError::UnknownCompetitor(_))
        ));
    }

    #[test]
    fn test_catalog_errors_propagate() {
        let mut catalog = MockCardCatalog::new();
        catalog
            .expect_competitors()
            .returning(|| Err(CatalogError::Unavailable("offline".to_string())));
        let (controller, _) = controller_with_catalog(catalog);
        assert!(matches!(
            controller.competitors(),
            Err(ControllerError::Catalog(_))
        ));
    }
}
