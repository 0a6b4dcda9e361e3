use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{url_parser, ytdlp};
use crate::error::Error;
use crate::models::media::{StreamFormat, Thumbnail, VideoInfo};

// Production shells out to yt-dlp; tests substitute a canned source.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_info(&self, video_id: &str) -> anyhow::Result<serde_json::Value>;
}

pub struct YtdlpMetadata {
    ytdlp: PathBuf,
}

impl YtdlpMetadata {
    pub fn new(ytdlp: PathBuf) -> Self {
        Self { ytdlp }
    }
}

#[async_trait]
impl MetadataSource for YtdlpMetadata {
    async fn fetch_info(&self, video_id: &str) -> anyhow::Result<serde_json::Value> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        ytdlp::fetch_info_json(&self.ytdlp, &url).await
    }
}

pub struct MetadataResolver {
    source: Arc<dyn MetadataSource>,
}

impl MetadataResolver {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    pub async fn resolve(&self, url: &str) -> Result<VideoInfo, Error> {
        if !url_parser::is_youtube_url(url) {
            return Err(Error::InvalidUrl);
        }
        let video_id = url_parser::extract_video_id(url)?;

        let json = self
            .source
            .fetch_info(&video_id)
            .await
            .map_err(|e| Error::MetadataFetch(e.to_string()))?;

        let mut info = parse_video_info(&json);
        info.formats = filter_playable(&info.formats);

        if info.formats.is_empty() {
            return Err(Error::NoPlayableFormat);
        }

        Ok(info)
    }
}

pub fn parse_video_info(json: &serde_json::Value) -> VideoInfo {
    let id = json
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let title = json
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let description = json
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let length_seconds = json
        .get("duration")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
        .max(0.0) as u64;

    let view_count = json.get("view_count").and_then(|v| v.as_u64()).unwrap_or(0);

    let mut thumbnails = Vec::new();
    if let Some(thumbs) = json.get("thumbnails").and_then(|v| v.as_array()) {
        for t in thumbs {
            let url = match t.get("url").and_then(|v| v.as_str()) {
                Some(u) => u.to_string(),
                None => continue,
            };
            thumbnails.push(Thumbnail {
                url,
                width: t.get("width").and_then(|v| v.as_u64()).map(|v| v as u32),
                height: t.get("height").and_then(|v| v.as_u64()).map(|v| v as u32),
            });
        }
    }

    let mut formats = Vec::new();
    if let Some(raw) = json.get("formats").and_then(|v| v.as_array()) {
        for f in raw {
            let format_id = match f.get("format_id").and_then(|v| v.as_str()) {
                Some(id) => id.to_string(),
                None => continue,
            };

            let container = f.get("ext").and_then(|v| v.as_str()).unwrap_or("").to_string();
            let width = f.get("width").and_then(|v| v.as_u64()).map(|v| v as u32);
            let height = f.get("height").and_then(|v| v.as_u64()).map(|v| v as u32);
            let fps = f.get("fps").and_then(|v| v.as_f64());
            let filesize = f
                .get("filesize")
                .or_else(|| f.get("filesize_approx"))
                .and_then(|v| v.as_u64());
            let vcodec = f.get("vcodec").and_then(|v| v.as_str());
            let acodec = f.get("acodec").and_then(|v| v.as_str());

            let has_video = vcodec.map(|v| v != "none").unwrap_or(false);
            let has_audio = acodec.map(|v| v != "none").unwrap_or(false);

            let quality_label = match height {
                Some(h) if h > 0 => format!("{}p", h),
                _ => f
                    .get("format_note")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
            };

            formats.push(StreamFormat {
                format_id,
                container,
                quality_label,
                width,
                height,
                fps,
                filesize,
                has_video,
                has_audio,
            });
        }
    }

    VideoInfo {
        id,
        title,
        description,
        length_seconds,
        view_count,
        thumbnails,
        formats,
    }
}

// Playable as-is means audio and video muxed into one mp4. Ordered
// best-first by the numeric part of the quality label.
pub fn filter_playable(formats: &[StreamFormat]) -> Vec<StreamFormat> {
    let mut kept: Vec<StreamFormat> = formats
        .iter()
        .filter(|f| f.has_video && f.has_audio && f.container == "mp4")
        .cloned()
        .collect();

    kept.sort_by(|a, b| quality_value(&b.quality_label).cmp(&quality_value(&a.quality_label)));
    kept
}

fn quality_value(label: &str) -> u32 {
    let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
