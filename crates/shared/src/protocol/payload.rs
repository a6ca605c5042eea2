//! Payload codec for bus messages
//!
//! Text fields (title, stipulations, competitor id) travel as raw UTF-8.
//! Everything else is JSON: integers, integer lists, the `{roll_type, value}`
//! turn roll object, the match init record, event and control records. An
//! empty payload means "unset" and, on a retained topic, deletes the value.
//!
//! Inbound decoding tries JSON first and keeps the raw string as fallback, so
//! a title of `42` and a hand count of `42` decode from identical bytes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use supershow_domain::{DomainError, PlayerId, RollType, TurnRoll};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Payload is not valid UTF-8")]
    NotUtf8,

    #[error("Expected {expected}, got '{raw}'")]
    Shape { expected: &'static str, raw: String },

    #[error("Invalid JSON record: {0}")]
    Record(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl DecodeError {
    pub fn shape(expected: &'static str, raw: impl Into<String>) -> Self {
        Self::Shape {
            expected,
            raw: raw.into(),
        }
    }
}

/// Outbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Zero bytes: unset, or delete when retained.
    Empty,
    Text(String),
    Json(Value),
}

impl Payload {
    pub fn text(value: impl Into<String>) -> Self {
        Payload::Text(value.into())
    }

    /// Text that clears the topic when absent.
    pub fn optional_text(value: Option<&str>) -> Self {
        match value {
            Some(text) => Payload::text(text),
            None => Payload::Empty,
        }
    }

    /// JSON object from a serializable record.
    pub fn record<T: Serialize>(record: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(record).map(Payload::Json)
    }

    pub fn int(value: impl Into<i64>) -> Self {
        Payload::Json(Value::from(value.into()))
    }

    pub fn optional_int(value: Option<i64>) -> Self {
        value.map_or(Payload::Empty, Payload::int)
    }

    pub fn int_list<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<i64>,
    {
        Payload::Json(Value::Array(
            values.into_iter().map(|v| Value::from(v.into())).collect(),
        ))
    }

    pub fn turn_roll(roll: Option<&TurnRoll>) -> Self {
        match roll {
            Some(roll) => Payload::Json(json!({
                "roll_type": roll.roll_type.as_str(),
                "value": roll.value.value(),
            })),
            None => Payload::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Payload::Empty => Vec::new(),
            Payload::Text(text) => text.as_bytes().to_vec(),
            Payload::Json(value) => value.to_string().into_bytes(),
        }
    }
}

/// Inbound payload with its JSON reading (if any) alongside the raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundPayload {
    raw: String,
    json: Option<Value>,
}

impl InboundPayload {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let raw = std::str::from_utf8(bytes)
            .map_err(|_| DecodeError::NotUtf8)?
            .to_string();
        let json = serde_json::from_str(&raw).ok();
        Ok(Self { raw, json })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Text reading: a JSON string is unquoted, anything else is taken raw.
    pub fn as_text(&self) -> &str {
        match &self.json {
            Some(Value::String(text)) => text,
            _ => &self.raw,
        }
    }

    pub fn as_optional_text(&self) -> Option<&str> {
        if self.is_empty() {
            None
        } else {
            Some(self.as_text())
        }
    }

    pub fn as_int(&self) -> Result<i64, DecodeError> {
        match &self.json {
            Some(value) => int_from_value(value).ok_or_else(|| self.shape_error("integer")),
            None => Err(self.shape_error("integer")),
        }
    }

    pub fn as_optional_int(&self) -> Result<Option<i64>, DecodeError> {
        if self.is_empty() {
            return Ok(None);
        }
        self.as_int().map(Some)
    }

    /// An empty payload reads as an empty list.
    pub fn as_int_list(&self) -> Result<Vec<i64>, DecodeError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        match &self.json {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| int_from_value(item).ok_or_else(|| self.shape_error("integer list")))
                .collect(),
            _ => Err(self.shape_error("integer list")),
        }
    }

    /// Card id lists. An empty payload reads as an empty list.
    pub fn as_text_list(&self) -> Result<Vec<String>, DecodeError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        match &self.json {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.shape_error("string list"))
                })
                .collect(),
            _ => Err(self.shape_error("string list")),
        }
    }

    /// Roll type plus the unclamped value; `None` when the payload is empty.
    pub fn as_turn_roll(&self) -> Result<Option<(RollType, i64)>, DecodeError> {
        if self.is_empty() {
            return Ok(None);
        }
        let Some(Value::Object(fields)) = &self.json else {
            return Err(self.shape_error("turn roll object"));
        };
        let roll_type = fields
            .get("roll_type")
            .and_then(Value::as_str)
            .ok_or_else(|| self.shape_error("turn roll object"))?
            .parse::<RollType>()?;
        let value = fields
            .get("value")
            .and_then(int_from_value)
            .ok_or_else(|| self.shape_error("turn roll object"))?;
        Ok(Some((roll_type, value)))
    }

    /// Deserialize a JSON record such as [`MatchInitPayload`].
    pub fn as_record<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        match &self.json {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| DecodeError::Record(e.to_string())),
            None => Err(self.shape_error("JSON record")),
        }
    }

    fn shape_error(&self, expected: &'static str) -> DecodeError {
        DecodeError::shape(expected, self.raw.clone())
    }
}

/// Integer reading of a JSON value. Strings of digits are accepted; fractions are not.
fn int_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `supershow/match/init`: the match header published first in every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInitPayload {
    pub match_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub stipulations: String,
    #[serde(default)]
    pub player1_competitor: Option<String>,
    #[serde(default)]
    pub player2_competitor: Option<String>,
    #[serde(default)]
    pub started_at: Option<i64>,
}

/// Record carried on `supershow/events/*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEventRecord {
    pub event_id: String,
    pub match_id: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub event_type: String,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub data: Value,
}

/// Record carried on `supershow/control/*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSignal {
    pub client_id: String,
    /// Unix seconds.
    pub timestamp: i64,
}
