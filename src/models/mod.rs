//! Data models for the duty roster.
//!
//! Field names follow the camelCase JSON contract shared with the frontend.

mod member;
mod queue;
mod schedule;

pub use member::*;
pub use queue::*;
pub use schedule::*;
