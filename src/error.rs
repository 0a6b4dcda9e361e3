use thiserror::Error;

// Internals use anyhow and map into one of these classes at the component
// boundary; the UI layer matches on the class, never on message text.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid YouTube URL")]
    InvalidUrl,

    #[error("Failed to fetch video info: {0}")]
    MetadataFetch(String),

    #[error("No suitable video format found")]
    NoPlayableFormat,

    #[error("Download failed: {0}")]
    DownloadProcess(String),

    #[error("File operation failed: {0}")]
    FileOperation(String),

    #[error("A download is already in progress")]
    DownloadInFlight,
}

pub type Result<T> = std::result::Result<T, Error>;
