//! Supershow Controller - the authoritative side of the match.
//!
//! [`MatchController`] owns the one true [`supershow_domain::MatchState`] and
//! publishes every change through [`StatePublisher`] as retained topics.

pub mod app;
pub mod error;
pub mod infrastructure;
pub mod match_controller;
pub mod publisher;

pub use app::{App, Outcome};
pub use error::ControllerError;
pub use infrastructure::clock::{ClockPort, SystemClock};
pub use infrastructure::console::{ConsoleCommand, ParseCommandError};
pub use match_controller::{MatchController, MatchSetup};
pub use publisher::StatePublisher;

#[cfg(any(test, feature = "testing"))]
pub use infrastructure::clock::{FixedClock, MockClockPort};
