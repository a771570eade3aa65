//! Events that can occur in a logging session

use super::state::ErrorKind;
use crate::backend::{ChatReply, SymptomEntry};
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
///
/// Completions carry the epoch they were issued under.
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    BeginAnalysis {
        text: String,
        at: DateTime<Utc>,
    },
    FollowUp {
        text: String,
        at: DateTime<Utc>,
    },
    Save {
        at: DateTime<Utc>,
    },
    Reset,

    // Remote session service events
    AssistantReply {
        epoch: u64,
        reply: ChatReply,
        at: DateTime<Utc>,
    },
    RequestFailed {
        epoch: u64,
        kind: ErrorKind,
        message: String,
    },
    SaveComplete {
        epoch: u64,
        entry: SymptomEntry,
    },
    SaveFailed {
        epoch: u64,
        message: String,
    },

    // Timer events
    AutoResetElapsed {
        epoch: u64,
    },
}

impl Event {
    pub fn begin(text: impl Into<String>) -> Self {
        Event::BeginAnalysis {
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn follow_up(text: impl Into<String>) -> Self {
        Event::FollowUp {
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn save() -> Self {
        Event::Save { at: Utc::now() }
    }

    /// Epoch of a completion or timer event
    pub fn epoch(&self) -> Option<u64> {
        match self {
            Event::AssistantReply { epoch, .. }
            | Event::RequestFailed { epoch, .. }
            | Event::SaveComplete { epoch, .. }
            | Event::SaveFailed { epoch, .. }
            | Event::AutoResetElapsed { epoch } => Some(*epoch),
            Event::BeginAnalysis { .. }
            | Event::FollowUp { .. }
            | Event::Save { .. }
            | Event::Reset => None,
        }
    }
}
