//! Wire types exchanged with the backend

use crate::state_machine::ChatMessage;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Conversation
// ============================================================================

/// Assistant reply to one user utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(rename = "answer")]
    pub text: String,
    /// Backend signals the exchange has gathered enough
    #[serde(rename = "stop", default)]
    pub should_stop: bool,
}

#[cfg(test)]
impl ChatReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            should_stop: false,
        }
    }

    pub fn final_reply(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            should_stop: true,
        }
    }
}

/// Most endpoints wrap their payload as `{"answer": ...}`
#[derive(Debug, Deserialize)]
pub(crate) struct AnswerEnvelope<T> {
    pub answer: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveStatus {
    #[serde(default)]
    pub status: String,
}

// ============================================================================
// Doctor report
// ============================================================================

/// Structured doctor-visit report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorReport {
    pub reason: String,
    #[serde(rename = "HPI", alias = "historyOfPresentIllness")]
    pub history_of_present_illness: Vec<String>,
    pub impression: String,
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reason for Visit: {}\n\nHPI (History of Present Illness):\n{}\n\nImpression: {}",
            self.reason,
            self.history_of_present_illness.join("\n"),
            self.impression
        )
    }
}

/// Report as returned by the backend: structured, or already formatted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportPayload {
    Structured(DoctorReport),
    Text(String),
}

impl fmt::Display for ReportPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportPayload::Structured(report) => report.fmt(f),
            ReportPayload::Text(text) => f.write_str(text),
        }
    }
}

// ============================================================================
// History entries
// ============================================================================

/// Backend-summarised entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    #[serde(default)]
    pub identity: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub title: String,
    #[serde(deserialize_with = "one_or_many")]
    pub summary: Vec<String>,
}

/// Entry carrying the full logging transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    #[serde(default)]
    pub identity: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub initial_symptom: String,
    pub conversation: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_summary: Option<String>,
}

/// One saved symptom log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymptomEntry {
    Transcript(TranscriptEntry),
    Summary(SummaryEntry),
}

impl SymptomEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            SymptomEntry::Transcript(entry) => entry.timestamp,
            SymptomEntry::Summary(entry) => entry.timestamp,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            SymptomEntry::Transcript(entry) => &entry.initial_symptom,
            SymptomEntry::Summary(entry) => &entry.title,
        }
    }

    /// Lines shown when the entry is expanded
    pub fn summary_lines(&self) -> Vec<String> {
        match self {
            SymptomEntry::Summary(entry) => entry.summary.clone(),
            SymptomEntry::Transcript(entry) => match &entry.final_summary {
                Some(summary) => vec![summary.clone()],
                None => entry
                    .conversation
                    .iter()
                    .map(|msg| format!("{}: {}", msg.sender.label(), msg.text))
                    .collect(),
            },
        }
    }
}

/// RFC 3339, or an ISO timestamp without offset taken as UTC
pub(crate) fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(line) => vec![line],
        OneOrMany::Many(lines) => lines,
    })
}

// ============================================================================
// Accounts
// ============================================================================

/// Result of exchanging a Google identity token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientIdentity {
    /// Whether the backend already has a patient profile
    pub exists: bool,
    #[serde(rename = "uuid")]
    pub identity: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenExchange<'a> {
    pub token: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" | "o" => Ok(Gender::Other),
            other => Err(format!("unknown gender: {other}")),
        }
    }
}

/// Patient profile submitted to complete sign-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupProfile {
    pub mail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    pub gender: Gender,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub chronic_diseases: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
}

impl SignupProfile {
    /// Trim every list item and drop blanks
    #[must_use]
    pub fn normalized(mut self) -> Self {
        fn clean(items: Vec<String>) -> Vec<String> {
            items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        }
        self.mail = self.mail.trim().to_string();
        self.allergies = clean(self.allergies);
        self.chronic_diseases = clean(self.chronic_diseases);
        self.medications = clean(self.medications);
        self
    }
}
