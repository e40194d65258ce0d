//! JSON-lines persistence of learning rounds.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::LearningRound;
use crate::domain::ports::RoundSink;

/// Appends one JSON object per round to a file.
pub struct JsonLinesRoundLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesRoundLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every round recorded in `path`.
    pub async fn read_all(path: impl AsRef<Path>) -> DomainResult<Vec<LearningRound>> {
        let raw = tokio::fs::read_to_string(path).await?;
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<LearningRound>(line).map_err(DomainError::from))
            .collect()
    }
}

#[async_trait]
impl RoundSink for JsonLinesRoundLog {
    async fn record(&self, round: &LearningRound) -> DomainResult<()> {
        let mut line = serde_json::to_string(round)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Keeps rounds in memory; useful when no log file is configured.
#[derive(Default)]
pub struct InMemoryRoundSink {
    rounds: Mutex<Vec<LearningRound>>,
}

impl InMemoryRoundSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rounds(&self) -> Vec<LearningRound> {
        self.rounds.lock().await.clone()
    }
}

#[async_trait]
impl RoundSink for InMemoryRoundSink {
    async fn record(&self, round: &LearningRound) -> DomainResult<()> {
        self.rounds.lock().await.push(round.clone());
        Ok(())
    }
}
