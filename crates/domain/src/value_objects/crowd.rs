use std::fmt;

use serde::{Deserialize, Serialize};

use super::clamped::{clamp_i64, Clamped};
use crate::DomainError;

/// Crowd meter level, `0..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CrowdMeter(u8);

impl CrowdMeter {
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Result<Self, DomainError> {
        if value > Self::MAX {
            return Err(DomainError::out_of_range(
                "crowd_meter",
                i64::from(value),
                0,
                i64::from(Self::MAX),
            ));
        }
        Ok(Self(value))
    }

    pub fn clamp(raw: i64) -> Clamped<Self> {
        let (bounded, moved) = clamp_i64(raw, 0, i64::from(Self::MAX));
        Clamped::new(Self(bounded as u8), raw, moved)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_full(self) -> bool {
        self.0 == Self::MAX
    }
}

impl TryFrom<u8> for CrowdMeter {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CrowdMeter> for u8 {
    fn from(value: CrowdMeter) -> Self {
        value.0
    }
}

impl fmt::Display for CrowdMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(CrowdMeter::clamp(12).value.value(), 10);
        assert!(CrowdMeter::clamp(12).was_clamped);
        assert_eq!(CrowdMeter::clamp(-1).value.value(), 0);
        assert!(!CrowdMeter::clamp(3).was_clamped);
    }

    #[test]
    fn test_new_rejects_above_max() {
        assert!(CrowdMeter::new(11).is_err());
        assert!(CrowdMeter::new(10).unwrap().is_full());
    }
}
