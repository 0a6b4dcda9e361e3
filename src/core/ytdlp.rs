use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::anyhow;

use crate::fs_paths;
use crate::models::media::MediaFormat;

fn bin_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    }
}

// A PATH install takes priority over the managed copy.
pub async fn find_ytdlp(data_dir: &Path) -> Option<PathBuf> {
    let bin = bin_name();

    if let Ok(status) = tokio::process::Command::new(bin)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        if status.success() {
            return Some(PathBuf::from(bin));
        }
    }

    let managed = managed_ytdlp_path(data_dir);
    if managed.exists() {
        return Some(managed);
    }

    None
}

fn managed_ytdlp_path(data_dir: &Path) -> PathBuf {
    fs_paths::managed_bin_dir(data_dir).join(bin_name())
}

pub async fn ensure_ytdlp(data_dir: &Path) -> anyhow::Result<PathBuf> {
    if let Some(path) = find_ytdlp(data_dir).await {
        return Ok(path);
    }

    download_ytdlp_binary(data_dir).await
}

async fn download_ytdlp_binary(data_dir: &Path) -> anyhow::Result<PathBuf> {
    let target = managed_ytdlp_path(data_dir);

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::info!("yt-dlp not found, downloading to {}", target.display());

    let download_url = if cfg!(target_os = "windows") {
        "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp.exe"
    } else if cfg!(target_os = "macos") {
        "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp_macos"
    } else {
        "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp"
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()?;

    let response = client.get(download_url).send().await?;

    if !response.status().is_success() {
        return Err(anyhow!("Failed to download yt-dlp: HTTP {}", response.status()));
    }

    let bytes = response.bytes().await?;
    tokio::fs::write(&target, &bytes).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        tokio::fs::set_permissions(&target, perms).await?;
    }

    Ok(target)
}

pub async fn fetch_info_json(ytdlp: &Path, url: &str) -> anyhow::Result<serde_json::Value> {
    let output = tokio::process::Command::new(ytdlp)
        .args(["--dump-json", "--no-warnings", "--no-playlist", url])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| anyhow!("Failed to run yt-dlp: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("yt-dlp failed: {}", stderr.trim()));
    }

    let json: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| anyhow!("yt-dlp returned invalid JSON: {}", e))?;

    Ok(json)
}

// mp4 walks a fallback chain from the best ready-made mp4 through an
// mp4+m4a merge. --no-playlist keeps one URL to one file.
pub fn download_args(url: &str, destination: &Path, format: MediaFormat) -> Vec<String> {
    let mut args = vec!["-f".to_string()];

    match format {
        MediaFormat::Mp3 => args.extend([
            "bestaudio".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            "0".to_string(),
        ]),
        MediaFormat::Mp4 => args.extend([
            "best[ext=mp4]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best".to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
        ]),
    }

    args.extend([
        "-o".to_string(),
        destination.to_string_lossy().to_string(),
        "--no-playlist".to_string(),
        "--newline".to_string(),
        "--progress-template".to_string(),
        "%(progress._percent_str)s".to_string(),
        url.to_string(),
    ]);

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    #[test]
    fn mp3_args_request_audio_extraction() {
        let args = download_args(URL, Path::new("/tmp/out.mp3"), MediaFormat::Mp3);
        assert_eq!(
            &args[..7],
            &[
                "-f",
                "bestaudio",
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "0"
            ]
        );
    }

    #[test]
    fn mp4_args_fall_back_through_containers() {
        let args = download_args(URL, Path::new("/tmp/out.mp4"), MediaFormat::Mp4);
        assert_eq!(
            &args[..4],
            &[
                "-f",
                "best[ext=mp4]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best",
                "--merge-output-format",
                "mp4"
            ]
        );
    }

    #[test]
    fn common_tail_sets_output_and_disables_playlists() {
        for format in [MediaFormat::Mp3, MediaFormat::Mp4] {
            let args = download_args(URL, Path::new("/tmp/out"), format);
            let o = args.iter().position(|a| a == "-o").unwrap();
            assert_eq!(args[o + 1], "/tmp/out");
            assert!(args.contains(&"--no-playlist".to_string()));
            assert!(args.contains(&"--newline".to_string()));
            let t = args.iter().position(|a| a == "--progress-template").unwrap();
            assert_eq!(args[t + 1], "%(progress._percent_str)s");
        }
    }

    #[test]
    fn url_is_the_final_argument() {
        let args = download_args(URL, Path::new("/tmp/out.mp4"), MediaFormat::Mp4);
        assert_eq!(args.last().map(String::as_str), Some(URL));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ensure_picks_up_a_managed_copy_under_the_data_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let managed = dir.path().join("bin").join(bin_name());
        std::fs::create_dir_all(managed.parent().unwrap()).unwrap();
        std::fs::write(&managed, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&managed, std::fs::Permissions::from_mode(0o755)).unwrap();

        let found = ensure_ytdlp(dir.path()).await.unwrap();

        // A PATH install wins when one exists; either way nothing gets
        // downloaded over a managed copy that is already in place.
        assert!(found == PathBuf::from(bin_name()) || found == managed);
        assert_eq!(std::fs::read_to_string(&managed).unwrap(), "#!/bin/sh\nexit 0\n");
    }
}
