//! Logging session runtime executor

use crate::backend::{BackendError, SessionService};
use crate::state_machine::{
    transition, Effect, ErrorKind, Event, LoggingSession, SessionContext, TransitionError,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// A command for the runtime, optionally acknowledged
#[derive(Debug)]
pub(crate) struct Command {
    pub event: Event,
    pub reply: Option<oneshot::Sender<Result<(), TransitionError>>>,
}

/// Owns one logging session and executes the effects of its transitions
pub struct SessionRuntime<S>
where
    S: SessionService + 'static,
{
    context: SessionContext,
    state: LoggingSession,
    service: Arc<S>,
    command_rx: mpsc::Receiver<Command>,
    /// Completions re-enter through here; weak so dropped handles stop the loop
    completion_tx: mpsc::WeakSender<Command>,
    state_tx: watch::Sender<LoggingSession>,
    /// Token to cancel the pending auto-reset
    auto_reset: Option<CancellationToken>,
}

impl<S> SessionRuntime<S>
where
    S: SessionService + 'static,
{
    pub(crate) fn new(
        context: SessionContext,
        service: Arc<S>,
        command_rx: mpsc::Receiver<Command>,
        completion_tx: mpsc::WeakSender<Command>,
        state_tx: watch::Sender<LoggingSession>,
    ) -> Self {
        Self {
            context,
            state: LoggingSession::default(),
            service,
            command_rx,
            completion_tx,
            state_tx,
            auto_reset: None,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(identity = %self.context.identity, "Starting logging session runtime");

        while let Some(command) = self.command_rx.recv().await {
            let outcome = self.process_event(command.event);
            if let Some(reply) = command.reply {
                // Caller may have stopped waiting
                let _ = reply.send(outcome);
            }
        }

        self.cancel_auto_reset();
        tracing::info!(identity = %self.context.identity, "Logging session runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        match transition(&self.state, &self.context, event) {
            Ok(result) => {
                tracing::debug!(
                    from = ?self.state.stage,
                    to = ?result.new_state.stage,
                    turns = result.new_state.assistant_turn_count,
                    "Session transition"
                );
                self.state = result.new_state;
                for effect in result.effects {
                    self.execute_effect(effect);
                }
                Ok(())
            }
            Err(TransitionError::Stale(epoch)) => {
                tracing::debug!(epoch, current = self.state.epoch, "Dropping stale completion");
                Err(TransitionError::Stale(epoch))
            }
            Err(e) => {
                if let Some(error) = e.as_session_error() {
                    self.state = self.state.clone().with_error(error);
                    self.publish();
                }
                tracing::debug!(error = %e, stage = ?self.state.stage, "Command rejected");
                Err(e)
            }
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::PublishState => self.publish(),

            Effect::RequestReply { epoch, text } => {
                let service = Arc::clone(&self.service);
                let identity = self.context.identity.clone();
                let completion_tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let event = match service.advance_conversation(&identity, &text).await {
                        Ok(reply) => Event::AssistantReply {
                            epoch,
                            reply,
                            at: Utc::now(),
                        },
                        Err(e) => Event::RequestFailed {
                            epoch,
                            kind: request_error_kind(&e),
                            message: format!("Failed to send message in chat: {e}"),
                        },
                    };
                    deliver(&completion_tx, event).await;
                });
            }

            Effect::PersistSession { epoch, entry } => {
                let service = Arc::clone(&self.service);
                let identity = self.context.identity.clone();
                let completion_tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let event = match service.persist_session(&identity, &entry).await {
                        Ok(()) => Event::SaveComplete { epoch, entry },
                        Err(e) => Event::SaveFailed {
                            epoch,
                            message: format!("Failed to save symptom entry: {e}"),
                        },
                    };
                    deliver(&completion_tx, event).await;
                });
            }

            Effect::ScheduleAutoReset { epoch, delay } => self.schedule_auto_reset(epoch, delay),

            Effect::CancelAutoReset => self.cancel_auto_reset(),
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    fn schedule_auto_reset(&mut self, epoch: u64, delay: Duration) {
        self.cancel_auto_reset();

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {
                    tracing::debug!(epoch, "Auto-reset cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    deliver(&completion_tx, Event::AutoResetElapsed { epoch }).await;
                }
            }
        });
        self.auto_reset = Some(token);
    }

    fn cancel_auto_reset(&mut self) {
        if let Some(token) = self.auto_reset.take() {
            token.cancel();
        }
    }
}

fn request_error_kind(error: &BackendError) -> ErrorKind {
    if error.kind.is_network() {
        ErrorKind::Network
    } else {
        ErrorKind::Server
    }
}

async fn deliver(completion_tx: &mpsc::WeakSender<Command>, event: Event) {
    let Some(tx) = completion_tx.upgrade() else {
        tracing::debug!(?event, "Session closed before completion arrived");
        return;
    };
    if tx.send(Command { event, reply: None }).await.is_err() {
        tracing::debug!("Session runtime stopped before completion was delivered");
    }
}
