//! Runtime for driving logging sessions
//!
//! Each session runs in its own task; the shell talks to it through a
//! [`SessionHandle`] and renders from the published snapshots.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::backend::SessionService;
use crate::state_machine::{Event, LoggingSession, SessionContext, TransitionError};
use executor::Command;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Handle to interact with a running logging session
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<LoggingSession>,
}

impl SessionHandle {
    /// Start a session runtime for `context.identity`
    pub fn spawn<S>(context: SessionContext, service: Arc<S>) -> Self
    where
        S: SessionService + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(LoggingSession::default());
        let runtime =
            SessionRuntime::new(context, service, command_rx, command_tx.downgrade(), state_tx);
        tokio::spawn(runtime.run());
        Self {
            command_tx,
            state_rx,
        }
    }

    async fn dispatch(&self, event: Event) -> Result<(), TransitionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command {
                event,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| TransitionError::RuntimeStopped)?;
        reply_rx.await.map_err(|_| TransitionError::RuntimeStopped)?
    }

    /// Submit the initial complaint; returns once the request is issued
    pub async fn begin_analysis(&self, complaint: &str) -> Result<(), TransitionError> {
        self.dispatch(Event::begin(complaint)).await
    }

    /// Answer the assistant; rejected while a reply is outstanding
    pub async fn send_follow_up(&self, message: &str) -> Result<(), TransitionError> {
        self.dispatch(Event::follow_up(message)).await
    }

    /// Persist the finished session
    pub async fn save(&self) -> Result<(), TransitionError> {
        self.dispatch(Event::save()).await
    }

    /// Discard the session and start over
    pub async fn reset(&self) -> Result<(), TransitionError> {
        self.dispatch(Event::Reset).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> LoggingSession {
        self.state_rx.borrow().clone()
    }

    pub fn can_send_follow_up(&self) -> bool {
        self.state_rx.borrow().can_send_follow_up()
    }

    /// Receiver that wakes on every published state
    pub fn subscribe(&self) -> watch::Receiver<LoggingSession> {
        self.state_rx.clone()
    }

    /// Wait until no request is in flight
    pub async fn settled(&self) -> Result<LoggingSession, TransitionError> {
        let mut state_rx = self.subscribe();
        let state = state_rx
            .wait_for(|state| !state.is_in_flight())
            .await
            .map_err(|_| TransitionError::RuntimeStopped)?;
        Ok(state.clone())
    }
}
