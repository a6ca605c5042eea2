//! Unified error types for the domain layer

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Value is outside the range a strict constructor accepts
    #[error("{field} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Player identifier is not 1 or 2
    #[error("Invalid player id: {0}")]
    InvalidPlayerId(i64),

    /// Parse error (for value objects)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    pub fn out_of_range(field: &'static str, value: i64, min: i64, max: i64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// Creates a parse error for string-to-type conversion failures.
    ///
    /// Use this in `FromStr` implementations when the input string
    /// doesn't match any known variant:
    ///
    /// ```ignore
    /// impl FromStr for RollType {
    ///     type Err = DomainError;
    ///     fn from_str(s: &str) -> Result<Self, Self::Err> {
    ///         match s {
    ///             "Power" => Ok(Self::Power),
    ///             _ => Err(DomainError::parse(format!("Unknown roll type: {}", s))),
    ///         }
    ///     }
    /// }
    /// ```
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_error() {
        let err = DomainError::out_of_range("roll", 13, 1, 12);
        assert!(matches!(err, DomainError::OutOfRange { .. }));
        assert_eq!(err.to_string(), "roll out of range: 13 (expected 1..=12)");
    }

    #[test]
    fn test_parse_error() {
        let err = DomainError::parse("Unknown roll type: Speed");
        assert_eq!(err.to_string(), "Parse error: Unknown roll type: Speed");
    }

    #[test]
    fn test_invalid_player_error() {
        assert_eq!(
            DomainError::InvalidPlayerId(3).to_string(),
            "Invalid player id: 3"
        );
    }
}
