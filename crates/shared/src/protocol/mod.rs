//! Wire protocol: topic addressing and payload encoding.

pub mod payload;
pub mod topic;

pub use payload::{
    ControlSignal, DecodeError, InboundPayload, MatchEventRecord, MatchInitPayload, Payload,
};
pub use topic::{
    filter_matches, ControlField, EventField, Field, MatchField, PlayerField, Topic, TopicDomain,
    TopicError, TOPIC_ROOT, WILDCARD_ALL, WILDCARD_CONTROL,
};
