//! Match and player state records
//!
//! The same records serve both sides of the bus: the controller owns one as
//! the single writer, and each production replica mirrors one from retained
//! topics. Fields are public because the replica fills them in one at a time
//! with no cross-field consistency to protect, except hand/deck which the
//! controller keeps in step through [`PlayerState::set_hand_count`].

use serde::{Deserialize, Serialize};

use crate::{CrowdMeter, DeckCount, HandCount, PlayerId, RollValue, TurnRoll};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: PlayerId,
    pub competitor_id: Option<String>,
    pub hand_count: HandCount,
    pub deck_count: DeckCount,
    /// Card ids; reserved, never published yet.
    pub discard_pile: Vec<String>,
    /// Card ids; reserved, never published yet.
    pub in_play: Vec<String>,
    pub last_turn_roll: Option<TurnRoll>,
    pub turns_passed: u32,
    pub finish_roll: Option<RollValue>,
    pub breakout_rolls: Vec<RollValue>,
}

impl PlayerState {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            competitor_id: None,
            hand_count: HandCount::default(),
            deck_count: DeckCount::full(),
            discard_pile: Vec::new(),
            in_play: Vec::new(),
            last_turn_roll: None,
            turns_passed: 0,
            finish_roll: None,
            breakout_rolls: Vec::new(),
        }
    }

    /// Set the hand size and derive the deck size from it.
    pub fn set_hand_count(&mut self, hand: HandCount) {
        self.hand_count = hand;
        self.deck_count = hand.deck_count();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    pub match_id: String,
    pub title: String,
    pub stipulations: String,
    pub crowd_meter: CrowdMeter,
    /// Unix seconds.
    pub started_at: Option<i64>,
    pub player1: PlayerState,
    pub player2: PlayerState,
}

impl MatchState {
    pub fn new() -> Self {
        Self {
            match_id: String::new(),
            title: String::new(),
            stipulations: String::new(),
            crowd_meter: CrowdMeter::default(),
            started_at: None,
            player1: PlayerState::new(PlayerId::One),
            player2: PlayerState::new(PlayerId::Two),
        }
    }

    /// Back to empty defaults, in place.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn player(&self, id: PlayerId) -> &PlayerState {
        match id {
            PlayerId::One => &self.player1,
            PlayerId::Two => &self.player2,
        }
    }

    pub fn player_mut(&mut self, id: PlayerId) -> &mut PlayerState {
        match id {
            PlayerId::One => &mut self.player1,
            PlayerId::Two => &mut self.player2,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}
