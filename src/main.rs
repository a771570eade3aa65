//! MediLogAI - conversational symptom logging client
//!
//! A terminal client that interviews the patient about a symptom through a
//! remote assistant, saves the resulting entry, and prepares doctor-visit
//! reports from the saved history.

mod backend;
mod config;
mod db;
mod history;
mod identity;
mod report;
mod runtime;
mod shell;
mod state_machine;

use backend::{HttpSessionService, LoggingService};
use config::AppConfig;
use db::LocalStore;
use history::HistoryView;
use identity::{IdentityError, IdentityManager};
use report::ReportGenerator;
use runtime::SessionHandle;
use shell::Shell;
use state_machine::SessionContext;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout belongs to the shell
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medilog=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = AppConfig::from_env();

    // Ensure store directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening local store");
    let store = LocalStore::open(&config.db_path)?;

    tracing::info!(base_url = %config.backend.base_url, "Connecting to session service");
    let service = Arc::new(LoggingService::new(HttpSessionService::new(&config.backend)?));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    // Sign in with a fresh token if one was provided, else reuse the cached identity
    let identity = IdentityManager::new(Arc::clone(&service), store.clone());
    let email = config
        .email
        .clone()
        .or_else(|| identity.email())
        .unwrap_or_default();
    let patient_id = match &config.id_token {
        Some(token) => identity.sign_in(token, &email).await?.identity().to_string(),
        None => identity.current().ok_or(IdentityError::NotSignedIn)?,
    };

    if !identity.profile_complete() {
        let Some(profile) = shell::read_profile(&mut lines, &mut stdout, &email).await? else {
            tracing::info!("Input closed before signup completed");
            return Ok(());
        };
        identity.complete_signup(profile).await?;
    }

    let context = SessionContext::new(patient_id.clone())
        .with_auto_reset_delay(config.auto_reset_delay);
    let session = SessionHandle::spawn(context, Arc::clone(&service));

    let mut shell = Shell::new(
        patient_id,
        session,
        ReportGenerator::new(Arc::clone(&service)),
        HistoryView::new(Arc::clone(&service), store),
        stdout,
    );
    shell.run(&mut lines).await?;

    Ok(())
}
