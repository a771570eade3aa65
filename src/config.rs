//! Environment-driven configuration

use crate::state_machine::state::DEFAULT_AUTO_RESET_DELAY;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "http://localhost:5000";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for the remote session service
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

/// Top-level client configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub db_path: PathBuf,
    /// Delay before a saved session returns to the initial stage
    pub auto_reset_delay: Duration,
    /// Google identity token used for a non-interactive sign-in
    pub id_token: Option<String>,
    pub email: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        let db_path = lookup("MEDILOG_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.medilog/medilog.db"))
            },
            PathBuf::from,
        );

        Self {
            backend: BackendConfig {
                base_url: lookup("MEDILOG_API_BASE")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                request_timeout: secs("MEDILOG_REQUEST_TIMEOUT_SECS")
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            },
            db_path,
            auto_reset_delay: secs("MEDILOG_AUTO_RESET_SECS").unwrap_or(DEFAULT_AUTO_RESET_DELAY),
            id_token: lookup("MEDILOG_ID_TOKEN").filter(|v| !v.trim().is_empty()),
            email: lookup("MEDILOG_EMAIL").filter(|v| !v.trim().is_empty()),
        }
    }
}
