use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;

pub mod core;
pub mod error;
pub mod fs_paths;
pub mod models;
pub mod storage;

pub use crate::core::download::{DownloadEvent, DownloadHandle, DownloadRequest, Downloader};
pub use crate::core::filename::suggested_filename;
pub use crate::core::metadata::{MetadataResolver, MetadataSource, YtdlpMetadata};
pub use crate::core::progress::ProgressSample;
pub use crate::core::url_parser::{extract_video_id, is_youtube_url};
pub use crate::error::{Error, Result};
pub use crate::models::history::{format_duration, DownloadRecord, FormatEntry};
pub use crate::models::media::{MediaFormat, StreamFormat, Thumbnail, VideoInfo};
pub use crate::storage::history::HistoryStore;
pub use crate::storage::kv::{JsonFileStore, KvStore, MemoryStore};

#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    // Overrides the platform data directory (history and managed binaries).
    pub data_dir: Option<PathBuf>,
    // Skips binary discovery and uses this yt-dlp executable.
    pub ytdlp_path: Option<PathBuf>,
}

// Everything the UI layer talks to. Built from injected parts so a shell
// (or a test) can swap any of them out.
pub struct DownloadService {
    resolver: MetadataResolver,
    downloader: Downloader,
    history: HistoryStore,
}

impl DownloadService {
    pub async fn init(config: ServiceConfig) -> anyhow::Result<Self> {
        let data_dir = match config.data_dir {
            Some(dir) => dir,
            None => fs_paths::app_data_dir()
                .ok_or_else(|| anyhow!("Could not determine data directory"))?,
        };

        let ytdlp = match config.ytdlp_path {
            Some(path) => path,
            None => core::ytdlp::ensure_ytdlp(&data_dir).await?,
        };

        let source: Arc<dyn MetadataSource> = Arc::new(YtdlpMetadata::new(ytdlp.clone()));
        let store: Arc<dyn KvStore> = Arc::new(JsonFileStore::new(data_dir));

        Ok(Self::with_parts(
            source,
            Downloader::new(ytdlp),
            HistoryStore::new(store),
        ))
    }

    pub fn with_parts(
        source: Arc<dyn MetadataSource>,
        downloader: Downloader,
        history: HistoryStore,
    ) -> Self {
        Self {
            resolver: MetadataResolver::new(source),
            downloader,
            history,
        }
    }

    pub async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        self.resolver.resolve(url).await
    }

    pub fn start_download(&self, request: DownloadRequest) -> Result<DownloadHandle> {
        self.downloader.start(request)
    }

    pub async fn record_completion(
        &self,
        url: &str,
        info: &VideoInfo,
        format: MediaFormat,
        file_path: &Path,
    ) -> Result<DownloadRecord> {
        let thumbnail = info
            .thumbnails
            .first()
            .map(|t| t.url.clone())
            .unwrap_or_default();

        self.history
            .record_completion(url, &info.title, &thumbnail, info.length_seconds, format, file_path)
            .await
            .map_err(|e| Error::FileOperation(e.to_string()))
    }

    pub async fn history(&self) -> Vec<DownloadRecord> {
        self.history.load().await
    }

    // Deletes the record and its files. A file that is already gone does
    // not fail the removal.
    pub async fn remove_history_entry(&self, id: &str) -> Result<()> {
        let removed = self
            .history
            .remove(id)
            .await
            .map_err(|e| Error::FileOperation(e.to_string()))?;

        if let Some(record) = removed {
            for entry in record.formats.values() {
                if let Err(e) = tokio::fs::remove_file(&entry.file_path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            "Failed to delete '{}': {}",
                            entry.file_path.display(),
                            e
                        );
                    }
                }
            }
        }

        Ok(())
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.history
            .remove_all()
            .await
            .map_err(|e| Error::FileOperation(e.to_string()))
    }

    // Reveals the file's folder in the system file manager. A missing
    // file is surfaced to the user, not silently ignored.
    pub async fn open_file_location(&self, path: &Path) -> Result<()> {
        let exists = tokio::fs::try_exists(path).await.unwrap_or(false);
        if !exists {
            return Err(Error::FileOperation(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let target = path.parent().unwrap_or(path);
        open::that(target)
            .map_err(|e| Error::FileOperation(format!("Failed to open folder: {}", e)))
    }
}
