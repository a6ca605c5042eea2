//! End-to-end tests: controller, in-memory broker and replica wired together.
//!
//! The in-memory broker keeps MQTT retained semantics, and can shuffle
//! retained replay to show that a late joiner doesn't depend on cross-topic
//! order.
//!
//! ```bash
//! cargo test -p supershow-production --lib e2e_tests
//! ```

mod e2e_helpers;

pub use e2e_helpers::*;
