//! Core domain types for the Parlor voice front desk.
//!
//! A [`CallSession`] tracks one active phone call: the slot-filling
//! [`Appointment`] record, a bounded conversation history, the last
//! classified [`Intent`] (kept for sticky multi-turn flows), and the
//! at-most-once persistence guard for completion side effects.

pub mod appointment;

pub use appointment::{Appointment, ExtractedFields, Field, Slot};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of conversation turns retained per session. Bounds both
/// memory use and the context window sent to the assistant collaborator.
pub const HISTORY_LIMIT: usize = 12;

/// Coarse call progress, tracked for observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Greeting,
    Collecting,
    Complete,
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Caller,
    Assistant,
}

/// One recorded turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub speaker: Speaker,
    pub text: String,
}

/// Caller intent, as classified by the keyword router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Booking,
    Info,
    Cancel,
    Message,
    Fallback,
}

/// The result of one conversation turn: what to say, and whether the call
/// should end after the reply is played.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub end_call: bool,
}

impl TurnOutcome {
    /// A reply that keeps the call open for another utterance.
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: text.into(),
            end_call: false,
        }
    }

    /// A reply after which the call ends.
    pub fn ending(text: impl Into<String>) -> Self {
        Self {
            reply: text.into(),
            end_call: true,
        }
    }
}

/// Per-call conversational state. One exists per active call, keyed by the
/// telephony provider's opaque call identifier.
#[derive(Debug, Clone)]
pub struct CallSession {
    /// External call identifier. Empty for ephemeral (non-persisted) sessions.
    pub id: String,
    pub stage: Stage,
    pub appointment: Appointment,
    /// Ordered conversation history, oldest first, bounded to
    /// [`HISTORY_LIMIT`] entries.
    pub history: Vec<TurnMessage>,
    /// Last classified intent; keeps multi-turn flows sticky.
    pub last_intent: Option<Intent>,
    /// True once completion side effects have fired for this session.
    pub appointment_persisted: bool,
    /// Last time a webhook touched this session; used by the idle reaper.
    pub last_activity: DateTime<Utc>,
}

impl CallSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stage: Stage::Greeting,
            appointment: Appointment::default(),
            history: Vec::new(),
            last_intent: None,
            appointment_persisted: false,
            last_activity: Utc::now(),
        }
    }

    /// Appends a turn to the history, dropping the oldest entries beyond
    /// [`HISTORY_LIMIT`].
    pub fn push_turn(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.history.push(TurnMessage {
            speaker,
            text: text.into(),
        });
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }

    /// Merges newly-extracted fields into the appointment. Only non-empty
    /// incoming values overwrite; previously-filled fields are never blanked.
    pub fn merge_fields(&mut self, partial: &ExtractedFields) {
        self.appointment.merge(partial);
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Claims the right to run completion side effects. Returns `true`
    /// exactly once per session; later calls see the guard already set.
    pub fn begin_persist(&mut self) -> bool {
        if self.appointment_persisted {
            return false;
        }
        self.appointment_persisted = true;
        true
    }
}
