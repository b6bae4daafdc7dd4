//! The shared conversation transcript.
//!
//! A single [`HistoryLog`] instance is owned by the gateway state and
//! shared by every client session and reply loop. Mutations happen under
//! one `std::sync::Mutex` and the whole transcript is rewritten to disk
//! before the lock is released, so the file always reflects the last
//! completed mutation. The lock is never held across an await point; a
//! slow write blocks other mutators but no session's socket I/O.
//!
//! On-disk format: a UTF-8 JSON array of two-element arrays
//! `[user_text, reply_text]`, overwritten wholesale on each mutation.
//! The write is a plain overwrite with no temp-file-then-rename, so a
//! crash mid-write can leave a truncated file behind.
//!
//! Transcript invariant: at most the last turn is pending (empty reply);
//! every earlier turn is answered.

use parley_types::Turn;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

/// Errors from transcript mutations.
///
/// Persistence failures propagate to the mutating caller; the in-memory
/// state still reflects the mutation that failed to persist.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read transcript file: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write transcript file: {0}")]
    Write(#[source] std::io::Error),

    #[error("transcript is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("transcript lock poisoned")]
    Poisoned,
}

/// The ordered, durable conversation transcript.
pub struct HistoryLog {
    path: PathBuf,
    turns: Mutex<Vec<Turn>>,
}

impl HistoryLog {
    /// Opens the transcript at `path`, loading any previously persisted
    /// turns. A missing file starts an empty conversation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let turns: Vec<Turn> = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(HistoryError::Read(e)),
        };
        if !turns.is_empty() {
            info!(path = %path.display(), turns = turns.len(), "loaded transcript");
        }
        Ok(Self {
            path,
            turns: Mutex::new(turns),
        })
    }

    /// Records recognized user speech.
    ///
    /// Starts a new pending turn when the log is empty or the last turn
    /// is answered; otherwise concatenates onto the pending turn's user
    /// text (recognition delivers speech in fragments).
    pub fn append_user(&self, text: &str) -> Result<(), HistoryError> {
        let mut turns = self.turns.lock().map_err(|_| HistoryError::Poisoned)?;
        match turns.last_mut() {
            Some(last) if last.is_pending() => last.user.push_str(text),
            _ => turns.push(Turn::pending(text)),
        }
        self.persist(&turns)
    }

    /// Records assistant reply text by concatenating onto the last
    /// turn's reply field. A no-op on an empty log.
    pub fn append_bot(&self, text: &str) -> Result<(), HistoryError> {
        let mut turns = self.turns.lock().map_err(|_| HistoryError::Poisoned)?;
        let Some(last) = turns.last_mut() else {
            return Ok(());
        };
        last.reply.push_str(text);
        self.persist(&turns)
    }

    /// Replaces the whole transcript, as returned by a generation
    /// round-trip.
    pub fn set(&self, new_turns: Vec<Turn>) -> Result<(), HistoryError> {
        let mut turns = self.turns.lock().map_err(|_| HistoryError::Poisoned)?;
        *turns = new_turns;
        self.persist(&turns)
    }

    /// Returns a snapshot of the transcript.
    pub fn get(&self) -> Vec<Turn> {
        self.turns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Path the transcript is persisted to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, turns: &[Turn]) -> Result<(), HistoryError> {
        let bytes = serde_json::to_vec(turns)?;
        fs::write(&self.path, bytes).map_err(HistoryError::Write)
    }
}
