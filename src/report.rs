//! Doctor-visit report generation

use crate::backend::{BackendError, ReportPayload, SessionService};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("Please provide the reason for your doctor visit.")]
    MissingReason,
    #[error("No symptom entries available to generate a report. Please log some symptoms first.")]
    NoHistory,
    #[error("Failed to generate report: {0}")]
    Backend(#[from] BackendError),
}

/// Builds reports from a patient's saved history
pub struct ReportGenerator<S> {
    service: S,
}

impl<S: SessionService> ReportGenerator<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Ask the backend for a report covering `reason`
    ///
    /// The history check runs first so an empty account gets a useful message
    /// instead of a synthesized report about nothing.
    pub async fn generate(&self, identity: &str, reason: &str) -> Result<ReportPayload, ReportError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ReportError::MissingReason);
        }

        if !self.service.has_history(identity).await? {
            tracing::info!(identity = %identity, "Report requested without any history");
            return Err(ReportError::NoHistory);
        }

        let report = self.service.generate_doctor_report(identity, reason).await?;
        tracing::info!(
            identity = %identity,
            structured = matches!(report, ReportPayload::Structured(_)),
            "Doctor report generated"
        );
        Ok(report)
    }
}
