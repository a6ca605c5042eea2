//! Topic addressing for the retained-state bus
//!
//! Every fact in a match lives on its own topic:
//!
//! ```text
//! supershow/match/<field>
//! supershow/player/<1|2>/<field>
//! supershow/events/<field>
//! supershow/control/<field>
//! ```
//!
//! Field sets are closed per domain. [`Topic`] is the typed form; its
//! `Display` and `FromStr` impls are exact inverses for every valid topic.

use std::fmt;
use std::str::FromStr;

use supershow_domain::PlayerId;
use thiserror::Error;

pub const TOPIC_ROOT: &str = "supershow";

/// Subscription filter covering the whole namespace.
pub const WILDCARD_ALL: &str = "supershow/#";

/// Subscription filter covering control signals only.
pub const WILDCARD_CONTROL: &str = "supershow/control/#";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("Topic '{0}' is not under the 'supershow' root")]
    ForeignRoot(String),

    #[error("Unknown topic domain '{0}'")]
    UnknownDomain(String),

    #[error("Unknown field '{field}' for domain '{domain}'")]
    UnknownField { domain: TopicDomain, field: String },

    #[error("Invalid player instance '{0}' (expected 1 or 2)")]
    InvalidInstance(String),

    #[error("Domain '{0}' requires a player instance")]
    MissingInstance(TopicDomain),

    #[error("Domain '{0}' does not take a player instance")]
    UnexpectedInstance(TopicDomain),

    #[error("Malformed topic '{0}'")]
    Malformed(String),
}

impl TopicError {
    pub fn unknown_field(domain: TopicDomain, field: impl Into<String>) -> Self {
        Self::UnknownField {
            domain,
            field: field.into(),
        }
    }
}

/// Top-level namespace segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicDomain {
    Match,
    Player,
    Event,
    Control,
}

impl TopicDomain {
    pub const ALL: [TopicDomain; 4] = [
        TopicDomain::Match,
        TopicDomain::Player,
        TopicDomain::Event,
        TopicDomain::Control,
    ];

    /// Path segment on the wire. Note the event domain is plural.
    pub fn segment(self) -> &'static str {
        match self {
            TopicDomain::Match => "match",
            TopicDomain::Player => "player",
            TopicDomain::Event => "events",
            TopicDomain::Control => "control",
        }
    }

    pub fn from_segment(segment: &str) -> Result<Self, TopicError> {
        match segment {
            "match" => Ok(TopicDomain::Match),
            "player" => Ok(TopicDomain::Player),
            "events" => Ok(TopicDomain::Event),
            "control" => Ok(TopicDomain::Control),
            other => Err(TopicError::UnknownDomain(other.to_string())),
        }
    }
}

impl fmt::Display for TopicDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Declares a closed field set with its wire names.
macro_rules! field_set {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

field_set! {
    /// Match-level facts.
    MatchField {
        Init => "init",
        Reset => "reset",
        Title => "title",
        Stipulations => "stipulations",
        CrowdMeter => "crowd_meter",
    }
}

field_set! {
    /// Per-player facts. `Discard` and `InPlay` are reserved and not yet published.
    PlayerField {
        Competitor => "competitor",
        HandCount => "hand_count",
        DeckCount => "deck_count",
        TurnRoll => "turn_roll",
        TurnsPassed => "turns_passed",
        FinishRoll => "finish_roll",
        BreakoutRolls => "breakout_rolls",
        Discard => "discard",
        InPlay => "in_play",
    }
}

field_set! {
    /// Fire-and-forget match events.
    EventField {
        MatchStart => "match_start",
        TurnRoll => "turn_roll",
        CardPlayed => "card_played",
        CardStopped => "card_stopped",
        CardDiscarded => "card_discarded",
        CardToHand => "card_to_hand",
        CardBuried => "card_buried",
        CardTopped => "card_topped",
        TurnWon => "turn_won",
        TurnPassed => "turn_passed",
        CrowdIncrement => "crowd_increment",
        MatchEnd => "match_end",
    }
}

field_set! {
    /// Process liveness signals between controller and production.
    ControlField {
        Heartbeat => "heartbeat",
        Ready => "ready",
    }
}

impl PlayerField {
    /// The seven fields a full snapshot publishes, in publish order.
    pub const SNAPSHOT: [PlayerField; 7] = [
        PlayerField::Competitor,
        PlayerField::HandCount,
        PlayerField::DeckCount,
        PlayerField::TurnRoll,
        PlayerField::TurnsPassed,
        PlayerField::FinishRoll,
        PlayerField::BreakoutRolls,
    ];
}

/// A field qualified by its domain. Handler registries key on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Match(MatchField),
    Player(PlayerField),
    Event(EventField),
    Control(ControlField),
}

impl Field {
    pub fn domain(self) -> TopicDomain {
        match self {
            Field::Match(_) => TopicDomain::Match,
            Field::Player(_) => TopicDomain::Player,
            Field::Event(_) => TopicDomain::Event,
            Field::Control(_) => TopicDomain::Control,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Match(f) => f.as_str(),
            Field::Player(f) => f.as_str(),
            Field::Event(f) => f.as_str(),
            Field::Control(f) => f.as_str(),
        }
    }

    pub fn from_name(domain: TopicDomain, name: &str) -> Result<Self, TopicError> {
        let field = match domain {
            TopicDomain::Match => MatchField::from_name(name).map(Field::Match),
            TopicDomain::Player => PlayerField::from_name(name).map(Field::Player),
            TopicDomain::Event => EventField::from_name(name).map(Field::Event),
            TopicDomain::Control => ControlField::from_name(name).map(Field::Control),
        };
        field.ok_or_else(|| TopicError::unknown_field(domain, name))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain(), self.as_str())
    }
}

/// A canonical, fully-qualified topic.
///
/// Only player topics carry an instance, so a topic with a missing or stray
/// instance can't be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Match(MatchField),
    Player(PlayerId, PlayerField),
    Event(EventField),
    Control(ControlField),
}

impl Topic {
    /// Build from loose parts, validating the field name and instance.
    pub fn build(
        domain: TopicDomain,
        field: &str,
        instance: Option<PlayerId>,
    ) -> Result<Self, TopicError> {
        let field = Field::from_name(domain, field)?;
        Self::from_field(field, instance)
    }

    pub fn from_field(field: Field, instance: Option<PlayerId>) -> Result<Self, TopicError> {
        match (field, instance) {
            (Field::Player(f), Some(id)) => Ok(Topic::Player(id, f)),
            (Field::Player(_), None) => Err(TopicError::MissingInstance(TopicDomain::Player)),
            (other, Some(_)) => Err(TopicError::UnexpectedInstance(other.domain())),
            (Field::Match(f), None) => Ok(Topic::Match(f)),
            (Field::Event(f), None) => Ok(Topic::Event(f)),
            (Field::Control(f), None) => Ok(Topic::Control(f)),
        }
    }

    pub fn domain(self) -> TopicDomain {
        self.field().domain()
    }

    pub fn field(self) -> Field {
        match self {
            Topic::Match(f) => Field::Match(f),
            Topic::Player(_, f) => Field::Player(f),
            Topic::Event(f) => Field::Event(f),
            Topic::Control(f) => Field::Control(f),
        }
    }

    pub fn instance(self) -> Option<PlayerId> {
        match self {
            Topic::Player(id, _) => Some(id),
            _ => None,
        }
    }

    /// Whether this topic holds last-value state the broker should retain.
    ///
    /// The reset signal, events and control signals are transient.
    pub fn is_retained(self) -> bool {
        match self {
            Topic::Match(MatchField::Reset) => false,
            Topic::Match(_) | Topic::Player(..) => true,
            Topic::Event(_) | Topic::Control(_) => false,
        }
    }

    /// Every retained state topic: match fields then both players' fields.
    ///
    /// This is the set a reset clears.
    pub fn retained_state_topics() -> Vec<Topic> {
        let match_topics = MatchField::ALL
            .iter()
            .map(|f| Topic::Match(*f))
            .filter(|t| t.is_retained());
        let player_topics = PlayerId::ALL.into_iter().flat_map(|id| {
            PlayerField::ALL.iter().map(move |f| Topic::Player(id, *f))
        });
        match_topics.chain(player_topics).collect()
    }

    /// Every valid topic in the namespace.
    pub fn all() -> Vec<Topic> {
        let mut topics: Vec<Topic> = MatchField::ALL.iter().map(|f| Topic::Match(*f)).collect();
        for id in PlayerId::ALL {
            topics.extend(PlayerField::ALL.iter().map(|f| Topic::Player(id, *f)));
        }
        topics.extend(EventField::ALL.iter().map(|f| Topic::Event(*f)));
        topics.extend(ControlField::ALL.iter().map(|f| Topic::Control(*f)));
        topics
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Player(id, field) => {
                write!(f, "{}/{}/{}/{}", TOPIC_ROOT, TopicDomain::Player, id, field)
            }
            other => write!(
                f,
                "{}/{}/{}",
                TOPIC_ROOT,
                other.domain(),
                other.field().as_str()
            ),
        }
    }
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match parts.next() {
            Some(TOPIC_ROOT) => {}
            _ => return Err(TopicError::ForeignRoot(s.to_string())),
        }
        let domain = parts
            .next()
            .ok_or_else(|| TopicError::Malformed(s.to_string()))
            .and_then(TopicDomain::from_segment)?;

        let rest: Vec<&str> = parts.collect();
        match (domain, rest.as_slice()) {
            (TopicDomain::Player, [instance, field]) => {
                let id = instance
                    .parse::<PlayerId>()
                    .map_err(|_| TopicError::InvalidInstance((*instance).to_string()))?;
                Topic::build(domain, field, Some(id))
            }
            (TopicDomain::Player, [_]) => Err(TopicError::MissingInstance(domain)),
            (_, [field]) => Topic::build(domain, field, None),
            _ => Err(TopicError::Malformed(s.to_string())),
        }
    }
}

/// MQTT filter match: `+` matches one level, a trailing `#` matches the rest.
pub fn filter_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
