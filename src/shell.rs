//! Line-oriented terminal front end
//!
//! Reads commands and free text from the user, forwards them to the session
//! runtime or the report/history services, and renders the results. All
//! session rules live in the state machine; this module only presents them.

use crate::backend::{Gender, SessionService, SignupProfile};
use crate::history::{HistorySource, HistoryView};
use crate::report::ReportGenerator;
use crate::runtime::SessionHandle;
use crate::state_machine::{ChatMessage, LoggingSession, Stage};
use chrono::{Local, TimeZone};
use std::fmt;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, Lines};

const HELP: &str = "\
Commands:
  /log       Log a symptom (default view)
  /report    Generate a report for a doctor visit
  /history   Show saved symptom entries
  /save      Save the finished entry
  /reset     Discard the current entry and start over
  /help      Show this help
  /quit      Exit";

/// Which screen plain text is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Logger,
    Reporter,
    History,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Log,
    Report,
    History,
    Save,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Command(ShellCommand),
    Text(String),
}

pub fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Text(line.to_string());
    };
    let name = command.split_whitespace().next().unwrap_or_default();
    Input::Command(match name.to_ascii_lowercase().as_str() {
        "log" => ShellCommand::Log,
        "report" => ShellCommand::Report,
        "history" => ShellCommand::History,
        "save" => ShellCommand::Save,
        "reset" => ShellCommand::Reset,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        _ => ShellCommand::Unknown(line.to_string()),
    })
}

/// `[HH:MM] Label: text` in the given time zone
pub fn render_message<Tz>(message: &ChatMessage, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "[{}] {}: {}",
        message.timestamp.with_timezone(tz).format("%H:%M"),
        message.sender.label(),
        message.text
    )
}

pub struct Shell<S, W> {
    identity: String,
    session: SessionHandle,
    reports: ReportGenerator<S>,
    history: HistoryView<S>,
    out: W,
    view: View,
    /// Transcript entries already printed for `epoch`
    rendered: usize,
    epoch: u64,
}

impl<S, W> Shell<S, W>
where
    S: SessionService,
    W: Write,
{
    pub fn new(
        identity: impl Into<String>,
        session: SessionHandle,
        reports: ReportGenerator<S>,
        history: HistoryView<S>,
        out: W,
    ) -> Self {
        Self {
            identity: identity.into(),
            session,
            reports,
            history,
            out,
            view: View::Logger,
            rendered: 0,
            epoch: 0,
        }
    }

    /// Process lines until `/quit` or end of input
    pub async fn run<R>(&mut self, lines: &mut Lines<R>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        writeln!(
            self.out,
            "MediLogAI, signed in as {}. Type /help for commands.",
            self.identity
        )?;
        self.show_view_hint()?;
        self.out.flush()?;

        while let Some(line) = lines.next_line().await? {
            match parse_line(&line) {
                Input::Empty => continue,
                Input::Command(ShellCommand::Quit) => break,
                Input::Command(command) => self.handle_command(command).await?,
                Input::Text(text) => self.handle_text(&text).await?,
            }
            self.out.flush()?;
        }

        tracing::info!(identity = %self.identity, "Shell exiting");
        Ok(())
    }

    async fn handle_command(&mut self, command: ShellCommand) -> io::Result<()> {
        match command {
            ShellCommand::Log => {
                self.view = View::Logger;
                self.show_view_hint()
            }
            ShellCommand::Report => {
                self.view = View::Reporter;
                self.show_view_hint()
            }
            ShellCommand::History => {
                self.view = View::History;
                self.show_history().await
            }
            ShellCommand::Save => self.save().await,
            ShellCommand::Reset => {
                if let Err(e) = self.session.reset().await {
                    return writeln!(self.out, "Error: {e}");
                }
                self.sync_epoch();
                writeln!(self.out, "Started a new entry.")?;
                self.view = View::Logger;
                self.show_view_hint()
            }
            ShellCommand::Help => writeln!(self.out, "{HELP}"),
            ShellCommand::Unknown(command) => writeln!(
                self.out,
                "Unknown command: {command}. Type /help for a list of commands."
            ),
            ShellCommand::Quit => Ok(()),
        }
    }

    async fn handle_text(&mut self, text: &str) -> io::Result<()> {
        match self.view {
            View::Logger => self.log_text(text).await,
            View::Reporter => self.generate_report(text).await,
            View::History => writeln!(
                self.out,
                "Use /log to record a symptom or /report to prepare a doctor visit."
            ),
        }
    }

    fn show_view_hint(&mut self) -> io::Result<()> {
        match self.view {
            View::Logger => match self.session.snapshot().stage {
                Stage::InitialInput => writeln!(
                    self.out,
                    "Describe your main symptom (e.g. 'Sharp pain in my lower back for 3 days')."
                ),
                Stage::Chatting => writeln!(self.out, "Type your answer."),
                Stage::Saving => self.save_hint(),
                Stage::Done | Stage::Error => {
                    writeln!(self.out, "Type /reset to start a new entry.")
                }
            },
            View::Reporter => writeln!(self.out, "What is the reason for your doctor visit?"),
            View::History => Ok(()),
        }
    }

    fn save_hint(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "Type /save to store this entry or /reset to discard it."
        )
    }

    // ========================================================================
    // Logger
    // ========================================================================

    async fn log_text(&mut self, text: &str) -> io::Result<()> {
        let sent = match self.session.snapshot().stage {
            Stage::InitialInput => self.session.begin_analysis(text).await,
            Stage::Chatting => self.session.send_follow_up(text).await,
            Stage::Done => match self.session.reset().await {
                Ok(()) => {
                    self.sync_epoch();
                    self.session.begin_analysis(text).await
                }
                Err(e) => Err(e),
            },
            Stage::Saving => return self.save_hint(),
            Stage::Error => {
                return writeln!(
                    self.out,
                    "This entry could not be completed. Type /reset to start over."
                )
            }
        };
        if let Err(e) = sent {
            return writeln!(self.out, "Error: {e}");
        }

        let snapshot = self.session.snapshot();
        self.render_transcript(&snapshot)?;
        self.out.flush()?;

        let state = match self.session.settled().await {
            Ok(state) => state,
            Err(e) => return writeln!(self.out, "Error: {e}"),
        };
        self.render_transcript(&state)?;
        if let Some(error) = &state.last_error {
            writeln!(self.out, "Error: {}", error.message)?;
        } else if state.stage == Stage::Saving {
            self.save_hint()?;
        }
        Ok(())
    }

    async fn save(&mut self) -> io::Result<()> {
        if self.session.snapshot().stage != Stage::Saving {
            return writeln!(self.out, "Nothing to save yet.");
        }
        if let Err(e) = self.session.save().await {
            return writeln!(self.out, "Error: {e}");
        }
        writeln!(self.out, "Saving...")?;
        self.out.flush()?;

        match self.session.settled().await {
            Ok(state) if state.stage == Stage::Done => {
                writeln!(self.out, "Symptom entry saved successfully!")?;
                if let Some(entry) = &state.last_saved {
                    if let Err(e) = self.history.remember(&self.identity, entry) {
                        tracing::warn!(error = %e, "Failed to cache saved entry");
                    }
                }
                Ok(())
            }
            Ok(state) => match state.last_error {
                Some(error) => writeln!(self.out, "Error: {}", error.message),
                None => Ok(()),
            },
            Err(e) => writeln!(self.out, "Error: {e}"),
        }
    }

    fn sync_epoch(&mut self) {
        let epoch = self.session.snapshot().epoch;
        if epoch != self.epoch {
            self.epoch = epoch;
            self.rendered = 0;
        }
    }

    /// Print transcript entries not yet shown
    fn render_transcript(&mut self, state: &LoggingSession) -> io::Result<()> {
        if state.epoch != self.epoch {
            self.epoch = state.epoch;
            self.rendered = 0;
        }
        for message in state.transcript.iter().skip(self.rendered) {
            writeln!(self.out, "{}", render_message(message, &Local))?;
        }
        self.rendered = state.transcript.len();
        Ok(())
    }

    // ========================================================================
    // Reporter
    // ========================================================================

    async fn generate_report(&mut self, reason: &str) -> io::Result<()> {
        writeln!(self.out, "Generating report...")?;
        self.out.flush()?;
        match self.reports.generate(&self.identity, reason).await {
            Ok(report) => writeln!(self.out, "\n{report}\n"),
            Err(e) => writeln!(self.out, "Error: {e}"),
        }
    }

    // ========================================================================
    // History
    // ========================================================================

    async fn show_history(&mut self) -> io::Result<()> {
        let page = match self.history.load(&self.identity).await {
            Ok(page) => page,
            Err(e) => return writeln!(self.out, "Error: Failed to load history: {e}"),
        };

        if page.source == HistorySource::Cache {
            writeln!(self.out, "(Backend unavailable, showing cached entries)")?;
        }
        if page.entries.is_empty() {
            return writeln!(self.out, "No symptom entries yet. Use /log to record one.");
        }
        for entry in &page.entries {
            writeln!(
                self.out,
                "{}  {}",
                entry.timestamp().with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                entry.title()
            )?;
            for line in entry.summary_lines() {
                writeln!(self.out, "    {line}")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Signup prompts
// ============================================================================

async fn ask<R, W>(lines: &mut Lines<R>, out: &mut W, question: &str) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "{question} ")?;
    out.flush()?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

fn split_list(line: &str) -> Vec<String> {
    line.split(',').map(str::to_string).collect()
}

/// Collect a signup profile interactively; `None` if input ends first
pub async fn read_profile<R, W>(
    lines: &mut Lines<R>,
    out: &mut W,
    email: &str,
) -> io::Result<Option<SignupProfile>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "Welcome! Please complete your patient profile.")?;

    let age = loop {
        let Some(answer) = ask(lines, out, "Age (leave blank to skip):").await? else {
            return Ok(None);
        };
        if answer.is_empty() {
            break None;
        }
        match answer.parse::<u32>() {
            Ok(age) => break Some(age),
            Err(_) => writeln!(out, "Please enter a whole number.")?,
        }
    };

    let gender = loop {
        let Some(answer) = ask(lines, out, "Gender (male/female/other):").await? else {
            return Ok(None);
        };
        match answer.parse::<Gender>() {
            Ok(gender) => break gender,
            Err(_) => writeln!(out, "Please answer male, female or other.")?,
        }
    };

    let Some(allergies) = ask(lines, out, "Allergies (comma separated):").await? else {
        return Ok(None);
    };
    let Some(chronic_diseases) = ask(lines, out, "Chronic diseases (comma separated):").await?
    else {
        return Ok(None);
    };
    let Some(medications) = ask(lines, out, "Current medications (comma separated):").await?
    else {
        return Ok(None);
    };

    Ok(Some(SignupProfile {
        mail: email.to_string(),
        age,
        gender,
        allergies: split_list(&allergies),
        chronic_diseases: split_list(&chronic_diseases),
        medications: split_list(&medications),
    }))
}
