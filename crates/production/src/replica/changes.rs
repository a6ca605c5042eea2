//! Change notifications handed to the view layer.
//!
//! Each variant carries only the fields for its kind, never the whole
//! replica, so a view can update incrementally.

use std::fmt;

use supershow_domain::{
    Card, CrowdMeter, DeckCount, HandCount, PlayerId, RollValue, TurnRoll,
};
use supershow_shared::DecodeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplicaChange {
    MatchInit {
        match_id: String,
        title: String,
        stipulations: String,
        crowd_meter: CrowdMeter,
        started_at: Option<i64>,
        player1_competitor: Option<Card>,
        player2_competitor: Option<Card>,
    },
    MatchReset,
    Title {
        title: String,
    },
    Stipulations {
        stipulations: String,
    },
    CrowdMeter {
        value: CrowdMeter,
    },
    /// `card` is `None` when unset or when the catalog couldn't resolve it.
    Competitor {
        player: PlayerId,
        competitor_id: Option<String>,
        card: Option<Card>,
    },
    HandCount {
        player: PlayerId,
        count: HandCount,
    },
    DeckCount {
        player: PlayerId,
        count: DeckCount,
    },
    TurnRoll {
        player: PlayerId,
        roll: Option<TurnRoll>,
    },
    TurnsPassed {
        player: PlayerId,
        count: u32,
    },
    FinishRoll {
        player: PlayerId,
        value: Option<RollValue>,
    },
    BreakoutRolls {
        player: PlayerId,
        rolls: Vec<RollValue>,
    },
    /// Resolved cards only; ids the catalog doesn't know are skipped.
    Discard {
        player: PlayerId,
        cards: Vec<Card>,
    },
    InPlay {
        player: PlayerId,
        cards: Vec<Card>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    MatchInit,
    MatchReset,
    Title,
    Stipulations,
    CrowdMeter,
    Competitor,
    HandCount,
    DeckCount,
    TurnRoll,
    TurnsPassed,
    FinishRoll,
    BreakoutRolls,
    Discard,
    InPlay,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::MatchInit => "match_init",
            ChangeKind::MatchReset => "match_reset",
            ChangeKind::Title => "match_title",
            ChangeKind::Stipulations => "match_stipulations",
            ChangeKind::CrowdMeter => "crowd_meter",
            ChangeKind::Competitor => "player_competitor",
            ChangeKind::HandCount => "player_hand_count",
            ChangeKind::DeckCount => "player_deck_count",
            ChangeKind::TurnRoll => "player_turn_roll",
            ChangeKind::TurnsPassed => "player_turns_passed",
            ChangeKind::FinishRoll => "player_finish_roll",
            ChangeKind::BreakoutRolls => "player_breakout_rolls",
            ChangeKind::Discard => "player_discard",
            ChangeKind::InPlay => "player_in_play",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReplicaChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ReplicaChange::MatchInit { .. } => ChangeKind::MatchInit,
            ReplicaChange::MatchReset => ChangeKind::MatchReset,
            ReplicaChange::Title { .. } => ChangeKind::Title,
            ReplicaChange::Stipulations { .. } => ChangeKind::Stipulations,
            ReplicaChange::CrowdMeter { .. } => ChangeKind::CrowdMeter,
            ReplicaChange::Competitor { .. } => ChangeKind::Competitor,
            ReplicaChange::HandCount { .. } => ChangeKind::HandCount,
            ReplicaChange::DeckCount { .. } => ChangeKind::DeckCount,
            ReplicaChange::TurnRoll { .. } => ChangeKind::TurnRoll,
            ReplicaChange::TurnsPassed { .. } => ChangeKind::TurnsPassed,
            ReplicaChange::FinishRoll { .. } => ChangeKind::FinishRoll,
            ReplicaChange::BreakoutRolls { .. } => ChangeKind::BreakoutRolls,
            ReplicaChange::Discard { .. } => ChangeKind::Discard,
            ReplicaChange::InPlay { .. } => ChangeKind::InPlay,
        }
    }

    /// The player this change concerns, for per-player kinds.
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            ReplicaChange::Competitor { player, .. }
            | ReplicaChange::HandCount { player, .. }
            | ReplicaChange::DeckCount { player, .. }
            | ReplicaChange::TurnRoll { player, .. }
            | ReplicaChange::TurnsPassed { player, .. }
            | ReplicaChange::FinishRoll { player, .. }
            | ReplicaChange::BreakoutRolls { player, .. }
            | ReplicaChange::Discard { player, .. }
            | ReplicaChange::InPlay { player, .. } => Some(*player),
            _ => None,
        }
    }
}

/// Why a routed message could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Topic for '{field}' is missing its player")]
    MissingPlayer { field: &'static str },
}

impl HandlerError {
    pub fn missing_player(field: &'static str) -> Self {
        Self::MissingPlayer { field }
    }
}
