//! Remote session service abstraction
//!
//! Everything the client needs from the backend goes through these traits so
//! the session runtime and the views can be exercised against mocks.

mod error;
mod http;
mod types;

pub use error::{BackendError, BackendErrorKind};
pub use http::HttpSessionService;
pub(crate) use types::lenient_timestamp;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Conversation, report and history endpoints
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Send one user utterance and get the next assistant turn
    async fn advance_conversation(
        &self,
        identity: &str,
        user_text: &str,
    ) -> Result<ChatReply, BackendError>;

    /// Synthesize a doctor-visit report from the stored history
    async fn generate_doctor_report(
        &self,
        identity: &str,
        visit_reason: &str,
    ) -> Result<ReportPayload, BackendError>;

    /// Whether any entries exist for this identity
    async fn has_history(&self, identity: &str) -> Result<bool, BackendError>;

    /// Persist a finished logging session
    async fn persist_session(
        &self,
        identity: &str,
        entry: &SymptomEntry,
    ) -> Result<(), BackendError>;

    /// All saved entries for this identity
    async fn fetch_history(&self, identity: &str) -> Result<Vec<SymptomEntry>, BackendError>;
}

/// Identity-token exchange and profile completion
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn exchange_id_token(&self, id_token: &str) -> Result<PatientIdentity, BackendError>;

    async fn complete_signup(&self, profile: &SignupProfile) -> Result<(), BackendError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionService + ?Sized> SessionService for Arc<T> {
    async fn advance_conversation(
        &self,
        identity: &str,
        user_text: &str,
    ) -> Result<ChatReply, BackendError> {
        (**self).advance_conversation(identity, user_text).await
    }

    async fn generate_doctor_report(
        &self,
        identity: &str,
        visit_reason: &str,
    ) -> Result<ReportPayload, BackendError> {
        (**self).generate_doctor_report(identity, visit_reason).await
    }

    async fn has_history(&self, identity: &str) -> Result<bool, BackendError> {
        (**self).has_history(identity).await
    }

    async fn persist_session(
        &self,
        identity: &str,
        entry: &SymptomEntry,
    ) -> Result<(), BackendError> {
        (**self).persist_session(identity, entry).await
    }

    async fn fetch_history(&self, identity: &str) -> Result<Vec<SymptomEntry>, BackendError> {
        (**self).fetch_history(identity).await
    }
}

#[async_trait]
impl<T: AccountService + ?Sized> AccountService for Arc<T> {
    async fn exchange_id_token(&self, id_token: &str) -> Result<PatientIdentity, BackendError> {
        (**self).exchange_id_token(id_token).await
    }

    async fn complete_signup(&self, profile: &SignupProfile) -> Result<(), BackendError> {
        (**self).complete_signup(profile).await
    }
}

// ============================================================================
// Logging decorator
// ============================================================================

/// Logging wrapper for backend services
pub struct LoggingService<S> {
    inner: S,
}

impl<S> LoggingService<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(
    operation: &'static str,
    identity: &str,
    start: Instant,
    result: &Result<T, BackendError>,
) {
    let duration = start.elapsed();
    match result {
        Ok(_) => {
            tracing::info!(
                operation,
                identity = %identity,
                duration_ms = %duration.as_millis(),
                "Backend request completed"
            );
        }
        Err(e) => {
            tracing::error!(
                operation,
                identity = %identity,
                duration_ms = %duration.as_millis(),
                error = %e.message,
                kind = ?e.kind,
                "Backend request failed"
            );
        }
    }
}

#[async_trait]
impl<S: SessionService> SessionService for LoggingService<S> {
    async fn advance_conversation(
        &self,
        identity: &str,
        user_text: &str,
    ) -> Result<ChatReply, BackendError> {
        let start = Instant::now();
        let result = self.inner.advance_conversation(identity, user_text).await;
        log_outcome("advance_conversation", identity, start, &result);
        if let Ok(reply) = &result {
            tracing::debug!(should_stop = reply.should_stop, "Assistant turn received");
        }
        result
    }

    async fn generate_doctor_report(
        &self,
        identity: &str,
        visit_reason: &str,
    ) -> Result<ReportPayload, BackendError> {
        let start = Instant::now();
        let result = self.inner.generate_doctor_report(identity, visit_reason).await;
        log_outcome("generate_doctor_report", identity, start, &result);
        result
    }

    async fn has_history(&self, identity: &str) -> Result<bool, BackendError> {
        let start = Instant::now();
        let result = self.inner.has_history(identity).await;
        log_outcome("has_history", identity, start, &result);
        result
    }

    async fn persist_session(
        &self,
        identity: &str,
        entry: &SymptomEntry,
    ) -> Result<(), BackendError> {
        let start = Instant::now();
        let result = self.inner.persist_session(identity, entry).await;
        log_outcome("persist_session", identity, start, &result);
        result
    }

    async fn fetch_history(&self, identity: &str) -> Result<Vec<SymptomEntry>, BackendError> {
        let start = Instant::now();
        let result = self.inner.fetch_history(identity).await;
        log_outcome("fetch_history", identity, start, &result);
        if let Ok(entries) = &result {
            tracing::debug!(count = entries.len(), "History fetched");
        }
        result
    }
}

#[async_trait]
impl<S: AccountService> AccountService for LoggingService<S> {
    async fn exchange_id_token(&self, id_token: &str) -> Result<PatientIdentity, BackendError> {
        let start = Instant::now();
        let result = self.inner.exchange_id_token(id_token).await;
        let identity = result.as_ref().map_or("-", |p| p.identity.as_str());
        log_outcome("exchange_id_token", identity, start, &result);
        result
    }

    async fn complete_signup(&self, profile: &SignupProfile) -> Result<(), BackendError> {
        let start = Instant::now();
        let result = self.inner.complete_signup(profile).await;
        log_outcome("complete_signup", &profile.mail, start, &result);
        result
    }
}
