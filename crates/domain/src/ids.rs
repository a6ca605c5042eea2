use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// One of the two seats in a match.
///
/// Serialized as the bare number `1` or `2`, which is also how it appears in
/// per-player topic paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub const ALL: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    pub fn number(self) -> u8 {
        match self {
            PlayerId::One => 1,
            PlayerId::Two => 2,
        }
    }

    pub fn from_number(n: i64) -> Result<Self, DomainError> {
        match n {
            1 => Ok(PlayerId::One),
            2 => Ok(PlayerId::Two),
            other => Err(DomainError::InvalidPlayerId(other)),
        }
    }

    pub fn other(self) -> Self {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }
}

impl TryFrom<u8> for PlayerId {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_number(i64::from(value))
    }
}

impl From<PlayerId> for u8 {
    fn from(value: PlayerId) -> Self {
        value.number()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl FromStr for PlayerId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: i64 = s
            .trim()
            .parse()
            .map_err(|_| DomainError::parse(format!("Invalid player id: '{}'", s)))?;
        Self::from_number(n)
    }
}
