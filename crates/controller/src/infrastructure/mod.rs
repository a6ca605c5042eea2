//! Infrastructure adapters for the controller.

pub mod clock;
pub mod console;
