//! Observer-side mirror of the live match.
//!
//! Every `apply_*` call mutates one field, enriches it for display where a
//! card reference is involved, then emits exactly one [`ReplicaChange`].
//! Fields arrive independently and in no particular order, so the replica
//! is never atomically consistent as a whole; it converges once the retained
//! values have all arrived.
//!
//! Out-of-range numbers are clamped with a warning. The deck count is taken
//! as published and never recomputed from the hand count.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use supershow_domain::{
    Card, Clamped, CrowdMeter, DeckCount, HandCount, MatchState, PlayerId, RollType, RollValue,
    TurnRoll,
};
use supershow_shared::{CardCatalog, MatchInitPayload};

use super::changes::ReplicaChange;

pub type ChangeCallback = Box<dyn Fn(&ReplicaChange) + Send + Sync>;

pub struct ReplicaStateManager {
    state: RwLock<MatchState>,
    catalog: Arc<dyn CardCatalog>,
    on_change: Mutex<Option<ChangeCallback>>,
}

fn accept<T>(field: &'static str, player: Option<PlayerId>, clamped: Clamped<T>) -> T {
    if clamped.was_clamped {
        tracing::warn!(
            field,
            player = ?player.map(PlayerId::number),
            received = clamped.requested,
            "Received value out of range, clamped"
        );
    }
    clamped.value
}

impl ReplicaStateManager {
    pub fn new(catalog: Arc<dyn CardCatalog>) -> Self {
        Self {
            state: RwLock::new(MatchState::new()),
            catalog,
            on_change: Mutex::new(None),
        }
    }

    pub fn set_on_change(&self, callback: ChangeCallback) {
        *self.on_change.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Copy of the current replica.
    pub fn snapshot(&self) -> MatchState {
        self.read(MatchState::clone)
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&MatchState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// The competitor card currently assigned to `player`, if resolvable.
    pub fn competitor(&self, player: PlayerId) -> Option<Card> {
        let id = self.read(|s| s.player(player).competitor_id.clone())?;
        self.lookup(&id)
    }

    fn write<R>(&self, f: impl FnOnce(&mut MatchState) -> R) -> R {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    fn emit(&self, change: ReplicaChange) {
        tracing::debug!(kind = %change.kind(), "Replica changed");
        let callback = self.on_change.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref cb) = *callback {
            cb(&change);
        }
    }

    /// Catalog lookup for display. Misses and errors degrade to `None`.
    fn lookup(&self, card_id: &str) -> Option<Card> {
        match self.catalog.get_card_by_id(card_id) {
            Ok(Some(card)) => Some(card),
            Ok(None) => {
                tracing::warn!(card_id, "Card not found in catalog");
                None
            }
            Err(e) => {
                tracing::error!(card_id, error = %e, "Card lookup failed");
                None
            }
        }
    }

    fn lookup_all(&self, card_ids: &[String]) -> Vec<Card> {
        card_ids.iter().filter_map(|id| self.lookup(id)).collect()
    }

    fn init_change(&self) -> ReplicaChange {
        let (match_id, title, stipulations, crowd_meter, started_at, p1, p2) = self.read(|s| {
            (
                s.match_id.clone(),
                s.title.clone(),
                s.stipulations.clone(),
                s.crowd_meter,
                s.started_at,
                s.player1.competitor_id.clone(),
                s.player2.competitor_id.clone(),
            )
        });
        ReplicaChange::MatchInit {
            match_id,
            title,
            stipulations,
            crowd_meter,
            started_at,
            player1_competitor: p1.and_then(|id| self.lookup(&id)),
            player2_competitor: p2.and_then(|id| self.lookup(&id)),
        }
    }

    /// Take the match header from an init record.
    ///
    /// Only `match_id` and `started_at` are stored. Title, stipulations and
    /// competitors live on their own retained topics, and a retained init
    /// outlives a field that was cleared after it. The record's copies are
    /// only reported in the change for display.
    pub fn apply_match_init(&self, init: MatchInitPayload) {
        tracing::info!(match_id = %init.match_id, title = %init.title, "Match init received");
        let crowd_meter = self.write(|s| {
            s.match_id = init.match_id.clone();
            s.started_at = init.started_at;
            s.crowd_meter
        });
        let change = ReplicaChange::MatchInit {
            match_id: init.match_id,
            title: init.title,
            stipulations: init.stipulations,
            crowd_meter,
            started_at: init.started_at,
            player1_competitor: init.player1_competitor.and_then(|id| self.lookup(&id)),
            player2_competitor: init.player2_competitor.and_then(|id| self.lookup(&id)),
        };
        self.emit(change);
    }

    /// The init record was deleted; the match header is gone.
    pub fn clear_match_init(&self) {
        self.write(|s| {
            s.match_id.clear();
            s.started_at = None;
        });
        let change = self.init_change();
        self.emit(change);
    }

    pub fn apply_reset(&self) {
        tracing::info!("Match reset received");
        self.write(MatchState::reset);
        self.emit(ReplicaChange::MatchReset);
    }

    pub fn apply_title(&self, title: &str) {
        self.write(|s| s.title = title.to_string());
        self.emit(ReplicaChange::Title {
            title: title.to_string(),
        });
    }

    pub fn apply_stipulations(&self, stipulations: &str) {
        self.write(|s| s.stipulations = stipulations.to_string());
        self.emit(ReplicaChange::Stipulations {
            stipulations: stipulations.to_string(),
        });
    }

    pub fn apply_crowd_meter(&self, raw: i64) {
        let value = accept("crowd_meter", None, CrowdMeter::clamp(raw));
        self.write(|s| s.crowd_meter = value);
        self.emit(ReplicaChange::CrowdMeter { value });
    }

    pub fn apply_competitor(&self, player: PlayerId, competitor_id: Option<String>) {
        self.write(|s| s.player_mut(player).competitor_id = competitor_id.clone());
        let card = competitor_id.as_deref().and_then(|id| self.lookup(id));
        if let Some(ref card) = card {
            tracing::info!(player = player.number(), competitor = %card.name, "Competitor loaded");
        }
        self.emit(ReplicaChange::Competitor {
            player,
            competitor_id,
            card,
        });
    }

    pub fn apply_hand_count(&self, player: PlayerId, raw: i64) {
        let count = accept("hand_count", Some(player), HandCount::clamp(raw));
        self.write(|s| s.player_mut(player).hand_count = count);
        self.emit(ReplicaChange::HandCount { player, count });
    }

    pub fn apply_deck_count(&self, player: PlayerId, raw: i64) {
        let count = accept("deck_count", Some(player), DeckCount::clamp(raw));
        self.write(|s| s.player_mut(player).deck_count = count);
        self.emit(ReplicaChange::DeckCount { player, count });
    }

    pub fn apply_turn_roll(&self, player: PlayerId, roll: Option<(RollType, i64)>) {
        let roll = roll.map(|(roll_type, raw)| {
            TurnRoll::new(roll_type, accept("turn_roll", Some(player), RollValue::clamp(raw)))
        });
        self.write(|s| s.player_mut(player).last_turn_roll = roll);
        self.emit(ReplicaChange::TurnRoll { player, roll });
    }

    pub fn apply_turns_passed(&self, player: PlayerId, raw: i64) {
        let count = match u32::try_from(raw) {
            Ok(count) => count,
            Err(_) => {
                let count = if raw < 0 { 0 } else { u32::MAX };
                tracing::warn!(player = player.number(), received = raw, "Turns passed out of range, clamped");
                count
            }
        };
        self.write(|s| s.player_mut(player).turns_passed = count);
        self.emit(ReplicaChange::TurnsPassed { player, count });
    }

    pub fn apply_finish_roll(&self, player: PlayerId, raw: Option<i64>) {
        let value = raw.map(|v| accept("finish_roll", Some(player), RollValue::clamp(v)));
        self.write(|s| s.player_mut(player).finish_roll = value);
        self.emit(ReplicaChange::FinishRoll { player, value });
    }

    pub fn apply_breakout_rolls(&self, player: PlayerId, raw: &[i64]) {
        let rolls: Vec<RollValue> = raw
            .iter()
            .map(|v| accept("breakout_roll", Some(player), RollValue::clamp(*v)))
            .collect();
        self.write(|s| s.player_mut(player).breakout_rolls = rolls.clone());
        self.emit(ReplicaChange::BreakoutRolls { player, rolls });
    }

    pub fn apply_discard(&self, player: PlayerId, card_ids: Vec<String>) {
        let cards = self.lookup_all(&card_ids);
        self.write(|s| s.player_mut(player).discard_pile = card_ids);
        self.emit(ReplicaChange::Discard { player, cards });
    }

    pub fn apply_in_play(&self, player: PlayerId, card_ids: Vec<String>) {
        let cards = self.lookup_all(&card_ids);
        self.write(|s| s.player_mut(player).in_play = card_ids);
        self.emit(ReplicaChange::InPlay { player, cards });
    }
}
