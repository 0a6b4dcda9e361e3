use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::core::url_parser;
use crate::models::history::{format_duration, DownloadRecord, FormatEntry};
use crate::models::media::MediaFormat;
use crate::storage::kv::KvStore;

const HISTORY_KEY: &str = "download_history";

// Completed downloads, newest first. Every load reconciles the list
// against the filesystem, so a file moved or deleted behind the app's
// back never shows up in the UI.
pub struct HistoryStore {
    store: Arc<dyn KvStore>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    // Malformed stored data is recovered as an empty history, never an
    // error. The pruned list is written back only when something changed.
    pub async fn load(&self) -> Vec<DownloadRecord> {
        let raw = match self.store.read(HISTORY_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read download history: {}", e);
                return Vec::new();
            }
        };

        let records: Vec<DownloadRecord> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Malformed download history, starting fresh: {}", e);
                return Vec::new();
            }
        };

        let mut kept = Vec::with_capacity(records.len());
        let mut changed = false;

        for mut record in records {
            let url_ok = url_parser::is_youtube_url(&record.url);

            let mut live = BTreeMap::new();
            for (format, entry) in std::mem::take(&mut record.formats) {
                // An existence check that fails counts as missing.
                if tokio::fs::try_exists(&entry.file_path).await.unwrap_or(false) {
                    live.insert(format, entry);
                } else {
                    tracing::debug!(
                        "Pruning {} entry of '{}': {} is gone",
                        format,
                        record.title,
                        entry.file_path.display()
                    );
                    changed = true;
                }
            }
            record.formats = live;

            if url_ok && !record.formats.is_empty() {
                kept.push(record);
            } else {
                tracing::debug!("Dropping history record '{}'", record.title);
                changed = true;
            }
        }

        if changed {
            if let Err(e) = self.persist(&kept).await {
                tracing::warn!("Failed to persist reconciled history: {}", e);
            }
        }

        kept
    }

    // A URL already present gets its entry for that format replaced in
    // place; the touched record moves to the front.
    pub async fn record_completion(
        &self,
        url: &str,
        title: &str,
        thumbnail: &str,
        duration_seconds: u64,
        format: MediaFormat,
        file_path: &Path,
    ) -> anyhow::Result<DownloadRecord> {
        let mut records = self.load().await;
        let now = Utc::now();

        let entry = FormatEntry {
            file_path: file_path.to_path_buf(),
            download_date: now,
        };

        let record = match records.iter().position(|r| r.url == url) {
            Some(i) => {
                let mut record = records.remove(i);
                record.formats.insert(format, entry);
                record.download_date = now;
                record
            }
            None => DownloadRecord {
                id: Uuid::new_v4().to_string(),
                url: url.to_string(),
                title: title.to_string(),
                thumbnail: thumbnail.to_string(),
                duration: format_duration(duration_seconds),
                download_date: now,
                formats: BTreeMap::from([(format, entry)]),
            },
        };

        records.insert(0, record.clone());
        self.persist(&records).await?;

        Ok(record)
    }

    // The removed record is handed back so the caller can delete its
    // files. Unknown ids are a no-op.
    pub async fn remove(&self, id: &str) -> anyhow::Result<Option<DownloadRecord>> {
        let mut records = self.load().await;

        let Some(i) = records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };

        let removed = records.remove(i);
        self.persist(&records).await?;

        Ok(Some(removed))
    }

    // Files on disk are left alone.
    pub async fn remove_all(&self) -> anyhow::Result<()> {
        self.persist(&[]).await
    }

    async fn persist(&self, records: &[DownloadRecord]) -> anyhow::Result<()> {
        let json = serde_json::to_string(records)?;
        self.store.write(HISTORY_KEY, &json).await
    }
}
