//! Question history: `(question, answer)` pairs per answered turn.

use crate::config::HistoryConfig;
use crate::error::{IntervoiceError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub question: String,
    pub answer: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub user_id: String,
}

/// Where answered questions go.
pub trait HistoryStore: Send + Sync {
    fn record(&self, question: &str, answer: &str) -> Result<HistoryEntry>;

    /// All entries, newest first.
    fn list(&self) -> Result<Vec<HistoryEntry>>;

    /// Returns whether an entry was removed.
    fn delete(&self, id: u64) -> Result<bool>;

    fn clear(&self) -> Result<()>;
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullHistory;

impl HistoryStore for NullHistory {
    fn record(&self, question: &str, answer: &str) -> Result<HistoryEntry> {
        Ok(HistoryEntry {
            id: 0,
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: unix_now(),
            user_id: String::new(),
        })
    }

    fn list(&self) -> Result<Vec<HistoryEntry>> {
        Ok(Vec::new())
    }

    fn delete(&self, _id: u64) -> Result<bool> {
        Ok(false)
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// Append-only JSON lines file.
pub struct JsonlHistory {
    path: PathBuf,
    user: String,
    // Serialises writers within this process.
    lock: Mutex<u64>,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            user: user.into(),
            lock: Mutex::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, u64>> {
        self.lock.lock().map_err(|_| history_error("history lock poisoned"))
    }

    fn read_entries(&self) -> Result<Vec<HistoryEntry>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(
                    "Skipping malformed history line {} in {}: {}",
                    number + 1,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(entries)
    }

    fn write_entries(&self, entries: &[HistoryEntry]) -> Result<()> {
        let mut contents = String::new();
        for entry in entries {
            contents.push_str(&encode(entry)?);
            contents.push('\n');
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl HistoryStore for JsonlHistory {
    fn record(&self, question: &str, answer: &str) -> Result<HistoryEntry> {
        let mut last_id = self.guard()?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Millisecond ids, bumped when two records land in the same millisecond.
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let id = millis.max(*last_id + 1);
        *last_id = id;

        let entry = HistoryEntry {
            id,
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: id / 1000,
            user_id: self.user.clone(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", encode(&entry)?)?;
        Ok(entry)
    }

    fn list(&self) -> Result<Vec<HistoryEntry>> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;
        entries.reverse();
        Ok(entries)
    }

    fn delete(&self, id: u64) -> Result<bool> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.write_entries(&entries)?;
        Ok(true)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.guard()?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The store `config` asks for.
pub fn open_history(config: &HistoryConfig) -> Result<Arc<dyn HistoryStore>> {
    if !config.enabled {
        return Ok(Arc::new(NullHistory));
    }
    Ok(Arc::new(JsonlHistory::new(
        config.resolved_path()?,
        config.resolved_user(),
    )))
}

fn encode(entry: &HistoryEntry) -> Result<String> {
    serde_json::to_string(entry).map_err(|e| history_error(&format!("failed to encode entry: {e}")))
}

fn history_error(message: &str) -> IntervoiceError {
    IntervoiceError::History {
        message: message.to_string(),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
