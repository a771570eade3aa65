//! Pure state transition function

use super::state::{
    ChatMessage, ErrorKind, LoggingSession, PendingRequest, SessionError, Stage, CLOSING_MESSAGE,
    MAX_AI_TURNS, MISSING_COMPLAINT_MESSAGE,
};
use super::{Effect, Event, SessionContext};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: LoggingSession,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: LoggingSession) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons a command is refused; the state is left untouched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{0}")]
    Validation(String),
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A request is already in flight, wait for it to finish")]
    SessionBusy,
    #[error("Completion from a discarded session (epoch {0})")]
    Stale(u64),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Session runtime has stopped")]
    RuntimeStopped,
}

impl TransitionError {
    /// Errors that are recorded as the session's `last_error`
    pub fn as_session_error(&self) -> Option<SessionError> {
        match self {
            TransitionError::Validation(message) => {
                Some(SessionError::new(ErrorKind::Validation, message.clone()))
            }
            _ => None,
        }
    }
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; timestamps
/// arrive inside the events.
pub fn transition(
    state: &LoggingSession,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    if let Some(epoch) = event.epoch() {
        if epoch != state.epoch {
            return Err(TransitionError::Stale(epoch));
        }
    }

    match (state.stage, state.pending, event) {
        // ============================================================
        // Reset
        // ============================================================
        (_, _, Event::Reset) => Ok(TransitionResult::new(state.reset())
            .with_effect(Effect::CancelAutoReset)
            .with_effect(Effect::PublishState)),

        (Stage::Done, None, Event::AutoResetElapsed { .. }) => {
            Ok(TransitionResult::new(state.reset()).with_effect(Effect::PublishState))
        }

        // ============================================================
        // Single in-flight request
        // ============================================================
        (
            _,
            Some(_),
            Event::BeginAnalysis { .. } | Event::FollowUp { .. } | Event::Save { .. },
        ) => Err(TransitionError::SessionBusy),

        // ============================================================
        // Initial complaint
        // ============================================================
        (Stage::InitialInput, None, Event::BeginAnalysis { text, at }) => {
            let complaint = text.trim();
            if complaint.is_empty() {
                return Err(TransitionError::Validation(
                    MISSING_COMPLAINT_MESSAGE.to_string(),
                ));
            }

            let new_state = LoggingSession {
                stage: Stage::Chatting,
                initial_complaint: Some(complaint.to_string()),
                transcript: vec![ChatMessage::user(complaint, at)],
                assistant_turn_count: 0,
                pending: Some(PendingRequest::Reply),
                last_error: None,
                last_saved: None,
                epoch: state.epoch,
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::PublishState)
                .with_effect(Effect::RequestReply {
                    epoch: state.epoch,
                    text: complaint.to_string(),
                }))
        }

        // ============================================================
        // Follow-up exchange
        // ============================================================
        (Stage::Chatting, None, Event::FollowUp { text, at }) => {
            let message = text.trim();
            if message.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }

            let mut new_state = state.clone();
            new_state.last_error = None;
            new_state.transcript.push(ChatMessage::user(message, at));
            new_state.pending = Some(PendingRequest::Reply);
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::PublishState)
                .with_effect(Effect::RequestReply {
                    epoch: state.epoch,
                    text: message.to_string(),
                }))
        }

        (Stage::Chatting, Some(PendingRequest::Reply), Event::AssistantReply { reply, at, .. }) => {
            let mut new_state = state.clone();
            new_state.pending = None;
            new_state
                .transcript
                .push(ChatMessage::assistant(reply.text, at));
            new_state.assistant_turn_count += 1;

            if new_state.assistant_turn_count >= MAX_AI_TURNS || reply.should_stop {
                new_state
                    .transcript
                    .push(ChatMessage::assistant(CLOSING_MESSAGE, at));
                new_state.assistant_turn_count += 1;
                new_state.stage = Stage::Saving;
            }
            Ok(TransitionResult::new(new_state).with_effect(Effect::PublishState))
        }

        (
            Stage::Chatting,
            Some(PendingRequest::Reply),
            Event::RequestFailed { kind, message, .. },
        ) => {
            let mut new_state = state.clone();
            new_state.pending = None;
            new_state.stage = Stage::Error;
            new_state.last_error = Some(SessionError::new(kind, message));
            Ok(TransitionResult::new(new_state).with_effect(Effect::PublishState))
        }

        // ============================================================
        // Saving
        // ============================================================
        (Stage::Saving, None, Event::Save { at }) => {
            let entry = state.to_entry(&context.identity, at);
            let mut new_state = state.clone();
            new_state.last_error = None;
            new_state.pending = Some(PendingRequest::Persist);
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::PublishState)
                .with_effect(Effect::PersistSession {
                    epoch: state.epoch,
                    entry,
                }))
        }

        (Stage::Saving, Some(PendingRequest::Persist), Event::SaveComplete { entry, .. }) => {
            let mut new_state = state.clone();
            new_state.pending = None;
            new_state.stage = Stage::Done;
            new_state.last_saved = Some(entry);
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::PublishState)
                .with_effect(Effect::ScheduleAutoReset {
                    epoch: state.epoch,
                    delay: context.auto_reset_delay,
                }))
        }

        (Stage::Saving, Some(PendingRequest::Persist), Event::SaveFailed { message, .. }) => {
            let mut new_state = state.clone();
            new_state.pending = None;
            new_state.last_error = Some(SessionError::new(ErrorKind::Persistence, message));
            Ok(TransitionResult::new(new_state).with_effect(Effect::PublishState))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (stage, pending, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {stage:?} (pending {pending:?}) with event {event:?}"
        ))),
    }
}
