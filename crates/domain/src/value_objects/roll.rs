//! Dice rolls: the three turn-roll types and the 1-12 roll value

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::clamped::{clamp_i64, Clamped};
use crate::DomainError;

/// A single roll result, `1..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RollValue(u8);

impl RollValue {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 12;

    pub fn new(value: u8) -> Result<Self, DomainError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::out_of_range(
                "roll",
                i64::from(value),
                i64::from(Self::MIN),
                i64::from(Self::MAX),
            ));
        }
        Ok(Self(value))
    }

    pub fn clamp(raw: i64) -> Clamped<Self> {
        let (bounded, moved) = clamp_i64(raw, i64::from(Self::MIN), i64::from(Self::MAX));
        Clamped::new(Self(bounded as u8), raw, moved)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for RollValue {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u8> for RollValue {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RollValue> for u8 {
    fn from(value: RollValue) -> Self {
        value.0
    }
}

impl fmt::Display for RollValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which attribute a turn roll was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RollType {
    Power,
    Technique,
    Agility,
}

impl RollType {
    pub const ALL: [RollType; 3] = [RollType::Power, RollType::Technique, RollType::Agility];

    pub fn as_str(self) -> &'static str {
        match self {
            RollType::Power => "Power",
            RollType::Technique => "Technique",
            RollType::Agility => "Agility",
        }
    }
}

impl fmt::Display for RollType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RollType {
    type Err = DomainError;

    /// Case-insensitive; anything else is an error, never a fallback type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "power" => Ok(RollType::Power),
            "technique" => Ok(RollType::Technique),
            "agility" => Ok(RollType::Agility),
            _ => Err(DomainError::parse(format!("Unknown roll type: '{}'", s))),
        }
    }
}

/// The last turn roll a player made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRoll {
    pub roll_type: RollType,
    pub value: RollValue,
}

impl TurnRoll {
    pub fn new(roll_type: RollType, value: RollValue) -> Self {
        Self { roll_type, value }
    }
}

impl fmt::Display for TurnRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.roll_type, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_clamp() {
        assert_eq!(RollValue::clamp(13).value.value(), 12);
        assert_eq!(RollValue::clamp(0).value.value(), 1);
        assert_eq!(RollValue::clamp(-50).value.value(), 1);
        let in_range = RollValue::clamp(11);
        assert_eq!(in_range.value.value(), 11);
        assert!(!in_range.was_clamped);
    }

    #[test]
    fn test_roll_new_rejects_zero() {
        assert!(RollValue::new(0).is_err());
        assert!(RollValue::new(13).is_err());
        assert!(RollValue::new(12).is_ok());
    }

    #[test]
    fn test_roll_type_parse() {
        assert_eq!("Power".parse::<RollType>(), Ok(RollType::Power));
        assert_eq!("technique".parse::<RollType>(), Ok(RollType::Technique));
        assert_eq!(" AGILITY ".parse::<RollType>(), Ok(RollType::Agility));
    }

    #[test]
    fn test_unknown_roll_type_is_an_error() {
        assert!("Speed".parse::<RollType>().is_err());
        assert!("".parse::<RollType>().is_err());
    }

    #[test]
    fn test_turn_roll_wire_shape() {
        let roll = TurnRoll::new(RollType::Agility, RollValue::new(9).unwrap());
        let json = serde_json::to_value(roll).unwrap();
        assert_eq!(json, serde_json::json!({"roll_type": "Agility", "value": 9}));
    }
}
