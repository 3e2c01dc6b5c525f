//! Failure classification shared by every crate
//!
//! Each crate keeps its own `thiserror` enum; this module only defines the
//! coarse classification reported next to a failed file in progress events.

mod category;

pub use category::FailureKind;
