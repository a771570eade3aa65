//! HTTP implementation of the backend services

use super::types::{AnswerEnvelope, SaveStatus, TokenExchange};
use super::{
    AccountService, BackendError, ChatReply, PatientIdentity, ReportPayload, SessionService,
    SignupProfile, SymptomEntry,
};
use crate::config::BackendConfig;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// JSON-over-HTTP client for the MediLog backend
pub struct HttpSessionService {
    client: Client,
    base_url: Url,
}

impl HttpSessionService {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            BackendError::config(format!("Invalid base URL {}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::config(format!(
                "Base URL cannot carry a path: {}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::config("Base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn prompt_endpoint(&self, route: &str, identity: &str, prompt: &str) -> Result<Url, BackendError> {
        let mut url = self.endpoint(&[route, identity])?;
        url.query_pairs_mut().append_pair("prompt", prompt);
        Ok(url)
    }

    async fn read_body(response: Response) -> Result<String, BackendError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(BackendError::from_status(status, &body));
        }
        Ok(body)
    }

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
        serde_json::from_str(body).map_err(|e| {
            BackendError::decode(format!("Failed to parse response: {e} - body: {body}"))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, BackendError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| BackendError::from_transport(&e))?;
        let body = Self::read_body(response).await?;
        Self::decode(&body)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: Url, payload: &B) -> Result<String, BackendError> {
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| BackendError::from_transport(&e))?;
        Self::read_body(response).await
    }
}

#[async_trait]
impl SessionService for HttpSessionService {
    async fn advance_conversation(
        &self,
        identity: &str,
        user_text: &str,
    ) -> Result<ChatReply, BackendError> {
        let url = self.prompt_endpoint("response", identity, user_text)?;
        self.get_json(url).await
    }

    async fn generate_doctor_report(
        &self,
        identity: &str,
        visit_reason: &str,
    ) -> Result<ReportPayload, BackendError> {
        let url = self.prompt_endpoint("doctor_report", identity, visit_reason)?;
        let envelope: AnswerEnvelope<ReportPayload> = self.get_json(url).await?;
        Ok(envelope.answer)
    }

    async fn has_history(&self, identity: &str) -> Result<bool, BackendError> {
        let url = self.endpoint(&["has_history", identity])?;
        self.get_json(url).await
    }

    async fn persist_session(
        &self,
        identity: &str,
        entry: &SymptomEntry,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["save_summary", identity])?;
        let body = self.post_json(url, entry).await?;
        if !body.trim().is_empty() {
            if let Ok(status) = serde_json::from_str::<SaveStatus>(&body) {
                tracing::debug!(status = %status.status, "Save acknowledged");
            }
        }
        Ok(())
    }

    async fn fetch_history(&self, identity: &str) -> Result<Vec<SymptomEntry>, BackendError> {
        let url = self.endpoint(&["history", identity])?;
        self.get_json(url).await
    }
}

#[async_trait]
impl AccountService for HttpSessionService {
    async fn exchange_id_token(&self, id_token: &str) -> Result<PatientIdentity, BackendError> {
        let url = self.endpoint(&["api", "auth", "google"])?;
        let body = self.post_json(url, &TokenExchange { token: id_token }).await?;
        Self::decode(&body)
    }

    async fn complete_signup(&self, profile: &SignupProfile) -> Result<(), BackendError> {
        let url = self.endpoint(&["api", "auth", "complete_signup"])?;
        self.post_json(url, profile).await?;
        Ok(())
    }
}
