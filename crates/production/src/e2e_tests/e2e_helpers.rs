//! Shared wiring for the end-to-end tests.

use std::sync::{Arc, Mutex};

use supershow_bus::{MemoryBroker, MemoryBusClient};
use supershow_controller::{FixedClock, MatchController, MatchSetup};
use supershow_domain::{Card, CardType, MatchState};
use supershow_shared::{BusPort, JsonCardCatalog};

use crate::{build_replica, BusRouter, ChangeKind, ControlBeacon, ReplicaChange, ReplicaStateManager};

pub const STARTED_AT: i64 = 1_700_000_000;

pub fn competitor(id: &str, name: &str) -> Card {
    serde_json::from_value(serde_json::json!({
        "db_uuid": id,
        "name": name,
        "card_type": CardType::SingleCompetitorCard,
        "division": "Heavyweight",
    }))
    .expect("valid card")
}

pub fn catalog() -> Arc<JsonCardCatalog> {
    Arc::new(JsonCardCatalog::from_cards(vec![
        competitor("c-ace", "Ace Harper"),
        competitor("c-brick", "Brick Mason"),
    ]))
}

/// The controller side: its own bus client and the match controller.
pub struct ControllerSide {
    pub bus: Arc<MemoryBusClient>,
    pub controller: MatchController,
}

pub fn controller_side(broker: &MemoryBroker) -> ControllerSide {
    let bus = Arc::new(broker.client("bpp_controller"));
    bus.connect();
    let controller = MatchController::new(
        Arc::clone(&bus) as Arc<dyn BusPort>,
        Arc::new(FixedClock::at_unix(STARTED_AT)),
        catalog(),
    );
    ControllerSide { bus, controller }
}

/// The production side: bus client, router, replica and a change log.
pub struct ProductionSide {
    pub bus: Arc<MemoryBusClient>,
    pub router: Arc<BusRouter>,
    pub replica: Arc<ReplicaStateManager>,
    pub changes: Arc<Mutex<Vec<ReplicaChange>>>,
}

impl ProductionSide {
    pub fn kinds(&self) -> Vec<ChangeKind> {
        self.changes
            .lock()
            .expect("changes lock")
            .iter()
            .map(ReplicaChange::kind)
            .collect()
    }

    pub fn clear_changes(&self) {
        self.changes.lock().expect("changes lock").clear();
    }
}

/// Wire a production client and connect it; the router subscribes on connect.
pub fn production_side(broker: &MemoryBroker) -> ProductionSide {
    let bus = Arc::new(broker.client("bpp_production"));
    let (router, replica) = build_replica(catalog());
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    replica.set_on_change(Box::new(move |change| {
        sink.lock().expect("changes lock").push(change.clone())
    }));
    router.attach(&bus, Some(ControlBeacon::new("bpp_production")));
    bus.connect();
    ProductionSide {
        bus,
        router,
        replica,
        changes,
    }
}

pub fn main_event() -> MatchSetup {
    MatchSetup {
        title: "Main Event".to_string(),
        stipulations: "No Disqualification".to_string(),
        crowd_meter: 3,
        player1_competitor: Some("c-ace".to_string()),
        player2_competitor: Some("c-brick".to_string()),
    }
}

/// A match with activity on every published field after the snapshot.
pub fn play_some_turns(controller: &mut MatchController) {
    use supershow_domain::{PlayerId, RollType};

    controller.start_match(main_event());
    controller.update_title("Main Event - Title Match");
    controller.update_crowd_meter(5);
    controller.set_competitor(PlayerId::Two, Some("c-ace".to_string()));
    controller.set_hand_count(PlayerId::One, 6);
    controller.increment_hand_count(PlayerId::Two);
    controller.update_turn_roll(PlayerId::One, RollType::Power, 8);
    controller.update_turn_roll(PlayerId::Two, RollType::Technique, 11);
    controller.increment_turns_passed(PlayerId::Two);
    controller.update_finish_roll(PlayerId::One, Some(9));
    controller.add_breakout_roll(PlayerId::Two, 4);
    controller.add_breakout_roll(PlayerId::Two, 10);
}

pub fn assert_converged(replica: &ReplicaStateManager, expected: &MatchState) {
    assert_eq!(&replica.snapshot(), expected);
}
