use crate::record::Record;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::error;

/// Append-only JSON-lines file with every detected change.
pub struct ChangeLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ChangeLog {
    /// Open `path` for appending, creating it if needed
    pub async fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line per record. Failures are logged, never returned.
    pub async fn append(&self, records: &[Record]) {
        if records.is_empty() {
            return;
        }

        let mut buf = Vec::new();
        for record in records {
            match serde_json::to_vec(record) {
                Ok(line) => {
                    buf.extend_from_slice(&line);
                    buf.push(b'\n');
                }
                Err(e) => error!(facility = record.id, error = %e, "Failed to encode change log line"),
            }
        }

        let mut file = self.file.lock().await;
        if let Err(e) = file.write_all(&buf).await {
            error!(path = %self.path.display(), error = %e, "Failed to write change log");
            return;
        }
        if let Err(e) = file.flush().await {
            error!(path = %self.path.display(), error = %e, "Failed to flush change log");
        }
    }
}
