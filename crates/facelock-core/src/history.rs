//! Append-only per-session history file.
//!
//! One logger is bound to one lock session. Lifecycle is fixed:
//! open → append* → finalize. Every append is flushed so an abnormal
//! termination loses at most the footer.
//!
//! Entry format:
//! `[HH:MM:SS.mmm] <KIND> | <description> | conf=<2dp> | val=<4dp>` for
//! actions, `[HH:MM:SS.mmm] STATUS | <description>` for status lines.
//! Timestamps are elapsed time since session start, not wall clock.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::types::{ActionEvent, StatusEvent};

const RULE: &str = "================================";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history file already finalized")]
    Finalized,
}

/// Append-only writer for one session's event timeline.
#[derive(Debug)]
pub struct HistoryLogger {
    file: File,
    path: PathBuf,
    action_count: u64,
    finalized: bool,
}

impl HistoryLogger {
    /// Create the history directory if needed and open a new session file
    /// named `<identity-lowercase>_history_<epoch-millis-of-start>.txt`.
    pub fn open(
        dir: &Path,
        identity: &str,
        started: DateTime<Local>,
    ) -> Result<Self, HistoryError> {
        fs::create_dir_all(dir)?;
        let file_name = format!(
            "{}_history_{}.txt",
            identity.to_lowercase(),
            started.timestamp_millis()
        );
        let path = dir.join(&file_name);
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;

        writeln!(file, "{RULE}")?;
        writeln!(file, "identity: {identity}")?;
        writeln!(file, "started:  {}", started.format("%Y-%m-%d %H:%M:%S%.3f"))?;
        writeln!(file, "file:     {file_name}")?;
        writeln!(file, "{RULE}")?;
        file.flush()?;

        tracing::info!(path = %path.display(), identity, "history file opened");
        Ok(Self {
            file,
            path,
            action_count: 0,
            finalized: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one action event in arrival order.
    pub fn append_action(&mut self, event: &ActionEvent) -> Result<(), HistoryError> {
        if self.finalized {
            return Err(HistoryError::Finalized);
        }
        writeln!(
            self.file,
            "[{}] {} | {} | conf={:.2} | val={:.4}",
            format_elapsed(event.elapsed),
            event.kind,
            event.description,
            event.confidence,
            event.value
        )?;
        self.file.flush()?;
        self.action_count += 1;
        Ok(())
    }

    /// Append one status event. Status lines carry no confidence or value
    /// and are excluded from the footer action count.
    pub fn append_status(&mut self, event: &StatusEvent) -> Result<(), HistoryError> {
        if self.finalized {
            return Err(HistoryError::Finalized);
        }
        writeln!(
            self.file,
            "[{}] STATUS | {}",
            format_elapsed(event.elapsed),
            event.description
        )?;
        self.file.flush()?;
        Ok(())
    }

    /// Write the footer and close the file for writing. Returns the file
    /// path. The logger is marked finalized only after the footer is
    /// durably written, so a failed finalize may be retried.
    pub fn finalize(&mut self) -> Result<PathBuf, HistoryError> {
        if self.finalized {
            return Err(HistoryError::Finalized);
        }
        writeln!(self.file, "{RULE}")?;
        writeln!(
            self.file,
            "ended:   {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
        )?;
        writeln!(self.file, "actions: {}", self.action_count)?;
        self.file.flush()?;
        self.finalized = true;
        tracing::info!(path = %self.path.display(), actions = self.action_count, "history file finalized");
        Ok(self.path.clone())
    }
}

/// Format a monotonic offset as `HH:MM:SS.mmm`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    let hours = millis / 3_600_000;
    let minutes = (millis / 60_000) % 60;
    let seconds = (millis / 1_000) % 60;
    let millis = millis % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}
