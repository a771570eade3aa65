//! Logging session state types

use crate::backend::{SymptomEntry, TranscriptEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Assistant replies allowed before the session closes for saving
pub const MAX_AI_TURNS: u32 = 3;

/// Appended by the session itself once the exchange is complete
pub const CLOSING_MESSAGE: &str = "Thank you for the information. You can now save this entry.";

pub const MISSING_COMPLAINT_MESSAGE: &str = "Please describe your main symptom first.";

/// Default delay before a saved session resets itself
pub const DEFAULT_AUTO_RESET_DELAY: Duration = Duration::from_secs(3);

// ============================================================================
// Transcript
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai")]
    Assistant,
}

impl Sender {
    /// Display name used when rendering transcripts
    pub fn label(self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "MediLogAI",
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(deserialize_with = "crate::backend::lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            timestamp,
        }
    }

    pub fn assistant(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            timestamp,
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.sender == Sender::Assistant
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Waiting for the initial complaint
    #[default]
    InitialInput,
    /// Follow-up exchange in progress
    Chatting,
    /// Exchange finished, entry ready to persist
    Saving,
    /// Entry persisted; resets after a short delay
    Done,
    /// A request failed; transcript kept for display
    Error,
}

/// The single request a session may have outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingRequest {
    /// Waiting for the next assistant turn
    Reply,
    /// Waiting for the save call
    Persist,
}

/// Failure classification surfaced to the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Network,
    Server,
    Persistence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The aggregate the shell renders from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoggingSession {
    pub stage: Stage,
    pub initial_complaint: Option<String>,
    pub transcript: Vec<ChatMessage>,
    pub assistant_turn_count: u32,
    pub pending: Option<PendingRequest>,
    pub last_error: Option<SessionError>,
    /// Entry the backend accepted, set once the stage reaches `Done`
    pub last_saved: Option<SymptomEntry>,
    /// Bumped on every reset; completions from an older epoch are dropped
    pub epoch: u64,
}

impl LoggingSession {
    /// Fresh state for the epoch after `self`
    #[must_use]
    pub fn reset(&self) -> Self {
        Self {
            epoch: self.epoch + 1,
            ..Self::default()
        }
    }

    pub fn can_send_follow_up(&self) -> bool {
        self.stage == Stage::Chatting && self.pending.is_none()
    }

    pub fn is_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Equal to a freshly constructed session, ignoring the epoch
    pub fn is_pristine(&self) -> bool {
        *self
            == Self {
                epoch: self.epoch,
                ..Self::default()
            }
    }

    pub fn with_error(mut self, error: SessionError) -> Self {
        self.last_error = Some(error);
        self
    }

    /// Entry handed to the persistence collaborator
    pub fn to_entry(&self, identity: &str, timestamp: DateTime<Utc>) -> SymptomEntry {
        SymptomEntry::Transcript(TranscriptEntry {
            identity: identity.to_string(),
            timestamp,
            initial_symptom: self.initial_complaint.clone().unwrap_or_default(),
            conversation: self.transcript.clone(),
            final_summary: None,
        })
    }
}

/// Immutable per-session configuration
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub identity: String,
    pub auto_reset_delay: Duration,
}

impl SessionContext {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            auto_reset_delay: DEFAULT_AUTO_RESET_DELAY,
        }
    }

    #[must_use]
    pub fn with_auto_reset_delay(mut self, delay: Duration) -> Self {
        self.auto_reset_delay = delay;
        self
    }
}
