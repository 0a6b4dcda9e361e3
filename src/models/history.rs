use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::media::MediaFormat;

// A record can hold both the mp3 and the mp4 file of the same video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub thumbnail: String,
    pub duration: String,
    pub download_date: DateTime<Utc>,
    pub formats: BTreeMap<MediaFormat, FormatEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatEntry {
    pub file_path: PathBuf,
    pub download_date: DateTime<Utc>,
}

// M:SS with minutes uncapped; an hour-long video reads "61:40" rather
// than rolling into hours.
pub fn format_duration(seconds: u64) -> String {
    let minutes = seconds / 60;
    let secs = seconds % 60;
    format!("{}:{:02}", minutes, secs)
}
