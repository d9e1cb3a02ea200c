//! Calendar collaborator: candidate-slot proposal, free/busy conflict
//! checking, and best-effort event creation.
//!
//! Availability is a convenience, not a hard guarantee. When the provider
//! cannot be reached the proposer degrades to treating all candidates as
//! free; a human reconciles conflicts later.

pub mod client;
pub mod error;
pub mod slots;

pub use client::{CalendarClient, CalendarConfig};
pub use error::CalendarError;
pub use slots::{candidate_slots, mark_availability, BusyInterval};
