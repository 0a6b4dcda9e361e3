use std::path::{Path, PathBuf};

pub fn app_data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("TUBEGET_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }
    dirs::data_dir().map(|d| d.join("tubeget"))
}

// Binaries the app manages itself (yt-dlp) live next to the history file,
// so a configured data directory governs both.
pub fn managed_bin_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("bin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_bin_dir_lives_under_the_data_dir() {
        assert_eq!(
            managed_bin_dir(Path::new("/data/tubeget")),
            PathBuf::from("/data/tubeget/bin")
        );
    }
}
