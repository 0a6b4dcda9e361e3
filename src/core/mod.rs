pub mod download;
pub mod filename;
pub mod metadata;
pub mod progress;
pub mod url_parser;
pub mod ytdlp;
