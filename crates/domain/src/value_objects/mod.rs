//! Range-checked value objects for match state
//!
//! Every numeric input, whether typed by an operator or decoded from the bus,
//! goes through one of these types. The `clamp` constructors never fail; they
//! report the requested value alongside the stored one so callers can log.

mod clamped;
mod crowd;
mod hand;
mod roll;

pub use clamped::Clamped;
pub use crowd::CrowdMeter;
pub use hand::{DeckCount, HandCount, DECK_SIZE};
pub use roll::{RollType, RollValue, TurnRoll};
