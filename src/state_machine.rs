//! Symptom logging session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{
    ChatMessage, ErrorKind, LoggingSession, PendingRequest, Sender, SessionContext, SessionError,
    Stage,
};
pub use transition::{transition, TransitionError};
