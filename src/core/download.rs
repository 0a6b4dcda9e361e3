use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use anyhow::anyhow;
use futures::Stream;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::mpsc;

use crate::core::progress::ProgressSample;
use crate::core::{url_parser, ytdlp};
use crate::error::Error;
use crate::models::media::MediaFormat;

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub destination: PathBuf,
    pub format: MediaFormat,
}

// Zero or more Progress events, then exactly one terminal event.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum DownloadEvent {
    Progress { percent: f64 },
    Complete,
    Error { message: String },
}

impl DownloadEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadEvent::Complete | DownloadEvent::Error { .. })
    }
}

// Spawns yt-dlp for one download at a time; history bookkeeping after
// completion is the caller's job.
pub struct Downloader {
    ytdlp: PathBuf,
    in_flight: Arc<AtomicBool>,
}

impl Downloader {
    pub fn new(ytdlp: PathBuf) -> Self {
        Self {
            ytdlp,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    // The URL is validated again here; upstream checks are not trusted.
    pub fn start(&self, request: DownloadRequest) -> Result<DownloadHandle, Error> {
        if !url_parser::is_youtube_url(&request.url) {
            return Err(Error::InvalidUrl);
        }

        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(Error::DownloadInFlight);
        }

        let (tx, rx) = mpsc::channel(32);
        let ytdlp = self.ytdlp.clone();
        let in_flight = self.in_flight.clone();

        tokio::spawn(async move {
            let outcome = drive_subprocess(&ytdlp, &request, &tx).await;

            // The subprocess has fully exited by now, so the slot frees
            // before the terminal event becomes observable.
            in_flight.store(false, Ordering::SeqCst);

            match outcome {
                Ok(()) => {
                    let _ = tx.send(DownloadEvent::Progress { percent: 100.0 }).await;
                    let _ = tx.send(DownloadEvent::Complete).await;
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::error!("Download failed for '{}': {}", request.url, message);
                    let _ = tx.send(DownloadEvent::Error { message }).await;
                }
            }
        });

        Ok(DownloadHandle { rx })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

async fn drive_subprocess(
    ytdlp: &Path,
    request: &DownloadRequest,
    tx: &mpsc::Sender<DownloadEvent>,
) -> anyhow::Result<()> {
    if let Some(parent) = request.destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let args = ytdlp::download_args(&request.url, &request.destination, request.format);

    let mut child = tokio::process::Command::new(ytdlp)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| anyhow!("Failed to start yt-dlp: {}", e))?;

    let pump = child.stdout.take().map(|stdout| {
        let progress_tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(pct) = ProgressSample::Text(line).parse() {
                    let _ = progress_tx
                        .send(DownloadEvent::Progress { percent: pct })
                        .await;
                }
            }
        })
    });

    // Drained concurrently so a chatty subprocess cannot wedge on a full
    // stderr pipe; the text becomes the failure reason on a bad exit.
    let stderr_reader = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut buf = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
            buf
        })
    });

    let status = child
        .wait()
        .await
        .map_err(|e| anyhow!("yt-dlp process failed: {}", e))?;

    if let Some(pump) = pump {
        let _ = pump.await;
    }

    let stderr_text = match stderr_reader {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    if !status.success() {
        let reason = stderr_text.trim();
        if reason.is_empty() {
            return Err(anyhow!("yt-dlp exited with {}", status));
        }
        return Err(anyhow!("yt-dlp exited with {}: {}", status, reason));
    }

    Ok(())
}

// Dropping the handle does not stop the subprocess; it runs to exit on
// its own.
#[derive(Debug)]
pub struct DownloadHandle {
    rx: mpsc::Receiver<DownloadEvent>,
}

impl DownloadHandle {
    pub async fn recv(&mut self) -> Option<DownloadEvent> {
        self.rx.recv().await
    }

    // Drains the stream and folds the run into a single result.
    pub async fn wait(mut self) -> Result<(), Error> {
        while let Some(event) = self.rx.recv().await {
            match event {
                DownloadEvent::Complete => return Ok(()),
                DownloadEvent::Error { message } => return Err(Error::DownloadProcess(message)),
                DownloadEvent::Progress { .. } => {}
            }
        }
        Err(Error::DownloadProcess(
            "event stream ended without a terminal event".to_string(),
        ))
    }
}

impl Stream for DownloadHandle {
    type Item = DownloadEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
