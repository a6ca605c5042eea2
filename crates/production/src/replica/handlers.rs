//! Field handlers that feed routed payloads into the replica.

use std::sync::Arc;

use supershow_domain::{DeckCount, PlayerId};
use supershow_shared::{Field, InboundPayload, MatchField, MatchInitPayload, PlayerField};

use super::changes::HandlerError;
use super::manager::ReplicaStateManager;
use crate::router::{BusRouter, Handler};

type MatchApply = fn(&ReplicaStateManager, &InboundPayload) -> Result<(), HandlerError>;
type PlayerApply = fn(&ReplicaStateManager, PlayerId, &InboundPayload) -> Result<(), HandlerError>;

fn match_handler(replica: &Arc<ReplicaStateManager>, apply: MatchApply) -> Handler {
    let replica = Arc::clone(replica);
    Box::new(move |_, payload| apply(&replica, payload))
}

fn player_handler(
    replica: &Arc<ReplicaStateManager>,
    field: PlayerField,
    apply: PlayerApply,
) -> Handler {
    let replica = Arc::clone(replica);
    Box::new(move |player, payload| {
        let player = player.ok_or_else(|| HandlerError::missing_player(field.as_str()))?;
        apply(&replica, player, payload)
    })
}

fn on_init(replica: &ReplicaStateManager, payload: &InboundPayload) -> Result<(), HandlerError> {
    if payload.is_empty() {
        replica.clear_match_init();
    } else {
        replica.apply_match_init(payload.as_record::<MatchInitPayload>()?);
    }
    Ok(())
}

fn on_reset(replica: &ReplicaStateManager, _: &InboundPayload) -> Result<(), HandlerError> {
    replica.apply_reset();
    Ok(())
}

fn on_title(replica: &ReplicaStateManager, payload: &InboundPayload) -> Result<(), HandlerError> {
    replica.apply_title(payload.as_text());
    Ok(())
}

fn on_stipulations(
    replica: &ReplicaStateManager,
    payload: &InboundPayload,
) -> Result<(), HandlerError> {
    replica.apply_stipulations(payload.as_text());
    Ok(())
}

fn on_crowd_meter(
    replica: &ReplicaStateManager,
    payload: &InboundPayload,
) -> Result<(), HandlerError> {
    replica.apply_crowd_meter(payload.as_optional_int()?.unwrap_or(0));
    Ok(())
}

fn on_competitor(
    replica: &ReplicaStateManager,
    player: PlayerId,
    payload: &InboundPayload,
) -> Result<(), HandlerError> {
    replica.apply_competitor(player, payload.as_optional_text().map(str::to_string));
    Ok(())
}

fn on_hand_count(
    replica: &ReplicaStateManager,
    player: PlayerId,
    payload: &InboundPayload,
) -> Result<(), HandlerError> {
    replica.apply_hand_count(player, payload.as_optional_int()?.unwrap_or(0));
    Ok(())
}

fn on_deck_count(
    replica: &ReplicaStateManager,
    player: PlayerId,
    payload: &InboundPayload,
) -> Result<(), HandlerError> {
    let full = i64::from(DeckCount::full().value());
    replica.apply_deck_count(player, payload.as_optional_int()?.unwrap_or(full));
    Ok(())
}

fn on_turn_roll(
    replica: &ReplicaStateManager,
    player: PlayerId,
    payload: &InboundPayload,
) -> Result<(), HandlerError> {
    replica.apply_turn_roll(player, payload.as_turn_roll()?);
    Ok(())
}

fn on_turns_passed(
    replica: &ReplicaStateManager,
    player: PlayerId,
    payload: &InboundPayload,
) -> Result<(), HandlerError> {
    replica.apply_turns_passed(player, payload.as_optional_int()?.unwrap_or(0));
    Ok(())
}

fn on_finish_roll(
    replica: &ReplicaStateManager,
    player: PlayerId,
    payload: &InboundPayload,
) -> Result<(), HandlerError> {
    replica.apply_finish_roll(player, payload.as_optional_int()?);
    Ok(())
}

fn on_breakout_rolls(
    replica: &ReplicaStateManager,
    player: PlayerId,
    payload: &InboundPayload,
) -> Result<(), HandlerError> {
    replica.apply_breakout_rolls(player, &payload.as_int_list()?);
    Ok(())
}

fn on_discard(
    replica: &ReplicaStateManager,
    player: PlayerId,
    payload: &InboundPayload,
) -> Result<(), HandlerError> {
    replica.apply_discard(player, payload.as_text_list()?);
    Ok(())
}

fn on_in_play(
    replica: &ReplicaStateManager,
    player: PlayerId,
    payload: &InboundPayload,
) -> Result<(), HandlerError> {
    replica.apply_in_play(player, payload.as_text_list()?);
    Ok(())
}

/// Register a handler for every match and player field.
pub fn register(router: &mut BusRouter, replica: &Arc<ReplicaStateManager>) {
    let match_fields: [(MatchField, MatchApply); 5] = [
        (MatchField::Init, on_init),
        (MatchField::Reset, on_reset),
        (MatchField::Title, on_title),
        (MatchField::Stipulations, on_stipulations),
        (MatchField::CrowdMeter, on_crowd_meter),
    ];
    for (field, apply) in match_fields {
        router.register(Field::Match(field), match_handler(replica, apply));
    }

    let player_fields: [(PlayerField, PlayerApply); 9] = [
        (PlayerField::Competitor, on_competitor),
        (PlayerField::HandCount, on_hand_count),
        (PlayerField::DeckCount, on_deck_count),
        (PlayerField::TurnRoll, on_turn_roll),
        (PlayerField::TurnsPassed, on_turns_passed),
        (PlayerField::FinishRoll, on_finish_roll),
        (PlayerField::BreakoutRolls, on_breakout_rolls),
        (PlayerField::Discard, on_discard),
        (PlayerField::InPlay, on_in_play),
    ];
    for (field, apply) in player_fields {
        router.register(Field::Player(field), player_handler(replica, field, apply));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supershow_domain::RollType;
    use supershow_shared::{BusMessage, JsonCardCatalog};

    use crate::router::Dispatch;

    fn wired() -> (BusRouter, Arc<ReplicaStateManager>) {
        let replica = Arc::new(ReplicaStateManager::new(Arc::new(JsonCardCatalog::empty())));
        let mut router = BusRouter::new();
        register(&mut router, &replica);
        (router, replica)
    }

    fn send(router: &BusRouter, topic: &str, payload: &str) -> Dispatch {
        router.route(&BusMessage::new(topic, payload.as_bytes().to_vec(), true))
    }

    #[test]
    fn test_every_state_field_registered() {
        let (router, _) = wired();
        for field in MatchField::ALL {
            assert!(router.handles(Field::Match(*field)), "{}", field);
        }
        for field in PlayerField::ALL {
            assert!(router.handles(Field::Player(*field)), "{}", field);
        }
    }

    #[test]
    fn test_numeric_title_stays_text() {
        let (router, replica) = wired();
        assert_eq!(send(&router, "supershow/match/title", "42"), Dispatch::Applied);
        assert_eq!(replica.snapshot().title, "42");
    }

    #[test]
    fn test_empty_payloads_restore_defaults() {
        let (router, replica) = wired();
        send(&router, "supershow/player/1/deck_count", "12");
        send(&router, "supershow/player/1/turn_roll", r#"{"roll_type":"Power","value":6}"#);
        send(&router, "supershow/match/crowd_meter", "4");

        send(&router, "supershow/player/1/deck_count", "");
        send(&router, "supershow/player/1/turn_roll", "");
        send(&router, "supershow/match/crowd_meter", "");

        let state = replica.snapshot();
        assert_eq!(state.player1.deck_count.value(), 30);
        assert_eq!(state.player1.last_turn_roll, None);
        assert_eq!(state.crowd_meter.value(), 0);
    }

    #[test]
    fn test_turn_roll_decoded() {
        let (router, replica) = wired();
        send(&router, "supershow/player/2/turn_roll", r#"{"roll_type":"Agility","value":9}"#);
        let roll = replica.snapshot().player2.last_turn_roll.unwrap();
        assert_eq!(roll.roll_type, RollType::Agility);
        assert_eq!(roll.value.value(), 9);
    }

    #[test]
    fn test_bad_payload_rejected_state_untouched() {
        let (router, replica) = wired();
        send(&router, "supershow/player/1/hand_count", "7");
        assert_eq!(
            send(&router, "supershow/player/1/hand_count", "seven"),
            Dispatch::Rejected
        );
        assert_eq!(
            send(&router, "supershow/player/1/turn_roll", r#"{"roll_type":"Luck","value":3}"#),
            Dispatch::Rejected
        );
        assert_eq!(replica.snapshot().player1.hand_count.value(), 7);
    }

    #[test]
    fn test_init_record_and_clear() {
        let (router, replica) = wired();
        send(
            &router,
            "supershow/match/init",
            r#"{"match_id":"match-9","title":"Main","stipulations":"","started_at":9}"#,
        );
        assert_eq!(replica.snapshot().match_id, "match-9");
        send(&router, "supershow/match/init", "");
        assert!(replica.snapshot().match_id.is_empty());
    }
}
