//! Duty-roster prediction engine.
//!
//! Given the latest committed schedule, the rotation pool and the pending deferrals, the
//! engine derives the schedules of the next working days. It only reads from its
//! collaborators and never persists what it predicts.
//!
//! A prediction is a snapshot approximation: the engine issues several independent reads
//! without transactional isolation, so concurrent writes between them can produce a
//! forecast that matches no single state of the store.

mod error;
mod predictor;
mod providers;
mod queue;
mod rotation;

#[cfg(test)]
mod memory;

pub use error::RosterError;
pub use predictor::Predictor;
pub use providers::{MemberProvider, QueueProvider, RosterStore, ScheduleProvider};
pub use queue::OrganizedQueue;
pub use rotation::RotationCursor;
