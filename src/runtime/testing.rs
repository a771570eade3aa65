//! Mock implementations for testing
//!
//! These mocks enable runtime and view tests without real I/O.

use crate::backend::{
    AccountService, BackendError, ChatReply, PatientIdentity, ReportPayload, SessionService,
    SignupProfile, SymptomEntry,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Semaphore};

// ============================================================================
// Mock Session Service
// ============================================================================

/// Session service that answers from queues and records what it was asked
#[allow(dead_code)]
pub struct MockSessionService {
    replies: Mutex<VecDeque<Result<ChatReply, BackendError>>>,
    saves: Mutex<VecDeque<Result<(), BackendError>>>,
    history: Mutex<Result<Vec<SymptomEntry>, BackendError>>,
    report: Mutex<Result<ReportPayload, BackendError>>,
    has_history: Mutex<Result<bool, BackendError>>,
    /// Replies block on this until released
    gate: Option<Arc<Semaphore>>,
    replies_done: watch::Sender<usize>,
    /// (identity, prompt) per conversation request
    pub prompts: Mutex<Vec<(String, String)>>,
    pub saved: Mutex<Vec<SymptomEntry>>,
    /// (identity, reason) per report request
    pub report_requests: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl MockSessionService {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            saves: Mutex::new(VecDeque::new()),
            history: Mutex::new(Ok(Vec::new())),
            report: Mutex::new(Err(BackendError::network("No mock report set"))),
            has_history: Mutex::new(Ok(true)),
            gate: None,
            replies_done: watch::channel(0).0,
            prompts: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
            report_requests: Mutex::new(Vec::new()),
        }
    }

    /// Replies wait for [`MockSessionService::release`]
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    /// Let `n` blocked replies proceed
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn queue_reply(&self, reply: ChatReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn queue_reply_error(&self, error: BackendError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Saves succeed unless a result is queued
    pub fn queue_save_result(&self, result: Result<(), BackendError>) {
        self.saves.lock().unwrap().push_back(result);
    }

    pub fn set_history(&self, history: Result<Vec<SymptomEntry>, BackendError>) {
        *self.history.lock().unwrap() = history;
    }

    pub fn set_report(&self, report: Result<ReportPayload, BackendError>) {
        *self.report.lock().unwrap() = report;
    }

    pub fn set_has_history(&self, result: Result<bool, BackendError>) {
        *self.has_history.lock().unwrap() = result;
    }

    pub fn recorded_prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn saved_entries(&self) -> Vec<SymptomEntry> {
        self.saved.lock().unwrap().clone()
    }

    pub fn recorded_report_requests(&self) -> Vec<(String, String)> {
        self.report_requests.lock().unwrap().clone()
    }

    /// Wait until `count` conversation requests have produced a result
    pub async fn wait_for_replies(&self, count: usize) {
        let mut rx = self.replies_done.subscribe();
        rx.wait_for(|done| *done >= count).await.unwrap();
    }
}

#[async_trait]
impl SessionService for MockSessionService {
    async fn advance_conversation(
        &self,
        identity: &str,
        user_text: &str,
    ) -> Result<ChatReply, BackendError> {
        self.prompts
            .lock()
            .unwrap()
            .push((identity.to_string(), user_text.to_string()));

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let result = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::network("No mock response queued")));
        self.replies_done.send_modify(|done| *done += 1);
        result
    }

    async fn generate_doctor_report(
        &self,
        identity: &str,
        visit_reason: &str,
    ) -> Result<ReportPayload, BackendError> {
        self.report_requests
            .lock()
            .unwrap()
            .push((identity.to_string(), visit_reason.to_string()));
        self.report.lock().unwrap().clone()
    }

    async fn has_history(&self, _identity: &str) -> Result<bool, BackendError> {
        self.has_history.lock().unwrap().clone()
    }

    async fn persist_session(
        &self,
        _identity: &str,
        entry: &SymptomEntry,
    ) -> Result<(), BackendError> {
        self.saved.lock().unwrap().push(entry.clone());
        self.saves.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn fetch_history(&self, _identity: &str) -> Result<Vec<SymptomEntry>, BackendError> {
        self.history.lock().unwrap().clone()
    }
}

// ============================================================================
// Mock Account Service
// ============================================================================

/// Account service with a fixed token exchange answer
#[allow(dead_code)]
pub struct MockAccountService {
    exchange: Mutex<Result<PatientIdentity, BackendError>>,
    signup: Mutex<Result<(), BackendError>>,
    pub tokens: Mutex<Vec<String>>,
    pub profiles: Mutex<Vec<SignupProfile>>,
}

#[allow(dead_code)]
impl MockAccountService {
    pub fn new(identity: PatientIdentity) -> Self {
        Self {
            exchange: Mutex::new(Ok(identity)),
            signup: Mutex::new(Ok(())),
            tokens: Mutex::new(Vec::new()),
            profiles: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: BackendError) -> Self {
        let mock = Self::new(PatientIdentity {
            exists: false,
            identity: String::new(),
        });
        *mock.exchange.lock().unwrap() = Err(error);
        mock
    }

    pub fn set_signup_result(&self, result: Result<(), BackendError>) {
        *self.signup.lock().unwrap() = result;
    }

    pub fn recorded_tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn recorded_profiles(&self) -> Vec<SignupProfile> {
        self.profiles.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountService for MockAccountService {
    async fn exchange_id_token(&self, id_token: &str) -> Result<PatientIdentity, BackendError> {
        self.tokens.lock().unwrap().push(id_token.to_string());
        self.exchange.lock().unwrap().clone()
    }

    async fn complete_signup(&self, profile: &SignupProfile) -> Result<(), BackendError> {
        self.profiles.lock().unwrap().push(profile.clone());
        self.signup.lock().unwrap().clone()
    }
}
