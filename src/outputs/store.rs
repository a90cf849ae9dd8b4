//! Append-only JSON Lines news store.
//!
//! Every saved [`NewsRecord`] becomes one line of `news.jsonl`, wrapped with
//! the id it was assigned and the time it was saved.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::collaborators::NewsStore;
use crate::error::GatherError;
use crate::models::NewsRecord;

pub const STORE_FILE: &str = "news.jsonl";

#[allow(non_snake_case)]
#[derive(Debug, Serialize)]
struct StoredLine<'a> {
    id: &'a str,
    savedAt: DateTime<Utc>,
    #[serde(flatten)]
    record: &'a NewsRecord,
}

#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    next: AtomicU64,
    write: Mutex<()>,
}

impl JsonlStore {
    /// A store appending to `{output_dir}/news.jsonl`.
    pub fn new(output_dir: &str) -> Self {
        Self::at(Path::new(output_dir).join(STORE_FILE))
    }

    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            next: AtomicU64::new(1),
            write: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NewsStore for JsonlStore {
    #[instrument(level = "debug", skip_all, fields(url = %record.sourceUrl))]
    async fn save_news_item(&self, record: &NewsRecord) -> Result<String, GatherError> {
        let saved_at = Utc::now();
        let id = format!(
            "{}-{}",
            saved_at.format("%Y%m%d%H%M%S"),
            self.next.fetch_add(1, Ordering::Relaxed)
        );
        let mut line = serde_json::to_string(&StoredLine {
            id: &id,
            savedAt: saved_at,
            record,
        })?;
        line.push('\n');

        let _guard = self.write.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| GatherError::Storage(format!("{}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| GatherError::Storage(format!("{}: {e}", self.path.display())))?;
        file.flush().await?;
        debug!(%id, "Appended news record");
        Ok(id)
    }
}
