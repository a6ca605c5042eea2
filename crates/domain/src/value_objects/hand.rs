//! Hand and deck sizes

use std::fmt;

use serde::{Deserialize, Serialize};

use super::clamped::{clamp_i64, Clamped};
use crate::DomainError;

/// Cards in a full Supershow deck. Hand and deck always sum to this.
pub const DECK_SIZE: u8 = 30;

/// Number of cards in a player's hand, always within `0..=30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HandCount(u8);

impl HandCount {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = DECK_SIZE;

    /// Strict constructor; rejects anything above the deck size.
    pub fn new(value: u8) -> Result<Self, DomainError> {
        if value > Self::MAX {
            return Err(DomainError::out_of_range(
                "hand_count",
                i64::from(value),
                i64::from(Self::MIN),
                i64::from(Self::MAX),
            ));
        }
        Ok(Self(value))
    }

    /// Lenient constructor used for operator and bus input.
    pub fn clamp(raw: i64) -> Clamped<Self> {
        let (bounded, moved) = clamp_i64(raw, i64::from(Self::MIN), i64::from(Self::MAX));
        Clamped::new(Self(bounded as u8), raw, moved)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Cards left in the deck for this hand size.
    pub fn deck_count(self) -> DeckCount {
        DeckCount(DECK_SIZE - self.0)
    }

    pub fn incremented(self) -> Self {
        Self(self.0.saturating_add(1).min(Self::MAX))
    }

    pub fn decremented(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl TryFrom<u8> for HandCount {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HandCount> for u8 {
    fn from(value: HandCount) -> Self {
        value.0
    }
}

impl fmt::Display for HandCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cards remaining in a player's deck.
///
/// On the controller side this is only ever derived from a [`HandCount`]. The
/// replica stores whatever the bus carried (clamped to `0..=30`) without
/// recomputing it from the hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DeckCount(u8);

impl DeckCount {
    pub fn full() -> Self {
        Self(DECK_SIZE)
    }

    pub fn clamp(raw: i64) -> Clamped<Self> {
        let (bounded, moved) = clamp_i64(raw, 0, i64::from(DECK_SIZE));
        Clamped::new(Self(bounded as u8), raw, moved)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for DeckCount {
    fn default() -> Self {
        Self::full()
    }
}

impl TryFrom<u8> for DeckCount {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > DECK_SIZE {
            return Err(DomainError::out_of_range(
                "deck_count",
                i64::from(value),
                0,
                i64::from(DECK_SIZE),
            ));
        }
        Ok(Self(value))
    }
}

impl From<DeckCount> for u8 {
    fn from(value: DeckCount) -> Self {
        value.0
    }
}

impl fmt::Display for DeckCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
