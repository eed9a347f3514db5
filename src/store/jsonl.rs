use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{matches, newest_first, SignalStore, StoreError};
use crate::signal::Signal;

/// Append-only JSON-lines file, one signal per line.
///
/// Rows are loaded into memory on open; inserts append a line and update the
/// in-memory index under one lock, so uniqueness holds within a process.
#[derive(Debug)]
pub struct JsonlSignalStore {
    path: PathBuf,
    rows: Mutex<Vec<Signal>>,
}

impl JsonlSignalStore {
    /// Open or create the store at `path`.
    ///
    /// Unparsable lines are skipped with a warning; a later duplicate key is
    /// ignored so reloading never violates uniqueness.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut rows: Vec<Signal> = Vec::new();
        match fs::read_to_string(&path).await {
            Ok(content) => {
                for (line_no, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Signal>(line) {
                        Ok(signal) if rows.iter().any(|s| s.key() == signal.key()) => {
                            warn!(
                                target: "macro_signals::store",
                                line = line_no + 1,
                                key = %signal.key(),
                                "Duplicate row ignored"
                            );
                        }
                        Ok(signal) => rows.push(signal),
                        Err(e) => {
                            warn!(
                                target: "macro_signals::store",
                                line = line_no + 1,
                                error = %e,
                                "Unparsable row skipped"
                            );
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        debug!(
            target: "macro_signals::store",
            path = %path.display(),
            rows = rows.len(),
            "Opened signal store"
        );
        Ok(Self {
            path,
            rows: Mutex::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SignalStore for JsonlSignalStore {
    async fn find(
        &self,
        signal_type: &str,
        period: &str,
        prompt_version: Option<&str>,
    ) -> Result<Option<Signal>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|s| matches(s, signal_type, period, prompt_version))
            .min_by(|a, b| newest_first(a, b))
            .cloned())
    }

    async fn insert(&self, signal: Signal) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        let key = signal.key();
        if rows.iter().any(|s| s.key() == key) {
            return Err(StoreError::Conflict(key));
        }

        let mut line = serde_json::to_string(&signal)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        rows.push(signal);
        Ok(())
    }

    async fn latest(&self, signal_type: &str) -> Result<Option<Signal>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|s| s.signal_type == signal_type)
            .min_by(|a, b| newest_first(a, b))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::signal_row;

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.jsonl");

        let store = JsonlSignalStore::open(&path).await.unwrap();
        store.insert(signal_row("inflation", "2024-04", "v1")).await.unwrap();
        store.insert(signal_row("inflation", "2024-05", "v1")).await.unwrap();
        drop(store);

        let reopened = JsonlSignalStore::open(&path).await.unwrap();
        let latest = reopened.latest("inflation").await.unwrap().unwrap();
        assert_eq!(latest.period, "2024-05");
        assert!(reopened
            .insert(signal_row("inflation", "2024-05", "v1"))
            .await
            .unwrap_err()
            .is_conflict());
    }

    #[tokio::test]
    async fn test_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.jsonl");
        let good = serde_json::to_string(&signal_row("inflation", "2024-05", "v1")).unwrap();
        std::fs::write(&path, format!("{{not json\n{good}\n\n{good}\n")).unwrap();

        let store = JsonlSignalStore::open(&path).await.unwrap();
        assert!(store.find("inflation", "2024-05", None).await.unwrap().is_some());
        assert!(store.latest("key_event").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("signals.jsonl");
        let store = JsonlSignalStore::open(&path).await.unwrap();
        store.insert(signal_row("inflation", "2024-05", "v1")).await.unwrap();
        assert!(path.exists());
    }
}
