//! Supershow Production - the observer side of the match.
//!
//! [`BusRouter`] subscribes to the whole `supershow/#` namespace and hands
//! each message to the handler registered for its field. The handlers feed
//! [`ReplicaStateManager`], which mirrors the match and tells the view what
//! changed.

pub mod beacon;
pub mod replica;
pub mod router;

#[cfg(test)]
mod e2e_tests;

use std::sync::Arc;

use supershow_shared::CardCatalog;

pub use beacon::ControlBeacon;
pub use replica::{ChangeKind, HandlerError, ReplicaChange, ReplicaStateManager};
pub use router::{BusRouter, Dispatch, Handler};

/// A replica and a router with every state field wired to it.
pub fn build_replica(catalog: Arc<dyn CardCatalog>) -> (Arc<BusRouter>, Arc<ReplicaStateManager>) {
    let replica = Arc::new(ReplicaStateManager::new(catalog));
    let mut router = BusRouter::new();
    replica::handlers::register(&mut router, &replica);
    (Arc::new(router), replica)
}
