//! Append-only event journal.
//!
//! Every emitted event is appended as one JSON line. The journal is an
//! at-least-once record for downstream consumers and restarts; a failed
//! append never rolls back in-memory state, it only surfaces as an
//! error the caller logs.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use bandwatch_core::EngineEvent;

use crate::error::{AppError, AppResult};

/// JSON-lines sink for engine events.
#[derive(Debug, Clone)]
pub struct EventJournal {
    path: PathBuf,
}

impl EventJournal {
    /// Open a journal at `path`, creating parent directories.
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(AppError::JournalUnavailable)?;
        }
        Ok(Self { path })
    }

    /// Append one event as a JSON line.
    pub async fn append(&self, event: &EngineEvent) -> AppResult<()> {
        let mut line = serde_json::to_string(event)
            .map_err(|e| AppError::JournalUnavailable(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(AppError::JournalUnavailable)?;
        file.write_all(line.as_bytes())
            .await
            .map_err(AppError::JournalUnavailable)?;
        file.flush().await.map_err(AppError::JournalUnavailable)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
