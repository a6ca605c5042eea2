//! Replica of the live match, rebuilt field by field from the bus.

pub mod changes;
pub mod handlers;
pub mod manager;

pub use changes::{ChangeKind, HandlerError, ReplicaChange};
pub use manager::{ChangeCallback, ReplicaStateManager};
