//! Supershow domain layer.
//!
//! Pure data for a two-player Supershow match: the match/player state records,
//! range-checked value objects (hand size, roll values, crowd meter) and the
//! card record used for display enrichment. No I/O, no async.

pub mod card;
pub mod error;
pub mod ids;
pub mod match_state;
pub mod value_objects;

pub use card::{AttackType, Card, CardType, PlayOrder};
pub use error::DomainError;
pub use ids::PlayerId;
pub use match_state::{MatchState, PlayerState};
pub use value_objects::{
    Clamped, CrowdMeter, DeckCount, HandCount, RollType, RollValue, TurnRoll, DECK_SIZE,
};
