use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

// Users paste "youtube.com/watch?v=..." as often as the full https form;
// a missing scheme defaults to https.
fn parse_lenient(url_str: &str) -> Option<url::Url> {
    if let Some((scheme, _)) = url_str.split_once("://") {
        if scheme != "http" && scheme != "https" {
            return None;
        }
        return url::Url::parse(url_str).ok();
    }
    url::Url::parse(&format!("https://{}", url_str)).ok()
}

fn is_youtube_host(host: &str) -> bool {
    host == "youtube.com"
        || host.ends_with(".youtube.com")
        || host == "youtu.be"
        || host.ends_with(".youtu.be")
}

// The path must carry something beyond "/" so "youtube.com" alone does
// not pass.
pub fn is_youtube_url(url_str: &str) -> bool {
    let parsed = match parse_lenient(url_str) {
        Some(p) => p,
        None => return false,
    };

    let host = match parsed.host_str() {
        Some(h) => h.to_lowercase(),
        None => return false,
    };

    if !is_youtube_host(&host) {
        return false;
    }

    parsed.path() != "/" || parsed.query().is_some()
}

// Handles watch?v=, youtu.be/, /shorts/ and /embed/.
pub fn extract_video_id(url_str: &str) -> Result<String, Error> {
    let parsed = parse_lenient(url_str).ok_or(Error::InvalidUrl)?;
    let host = parsed
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(Error::InvalidUrl)?;

    if !is_youtube_host(&host) {
        return Err(Error::InvalidUrl);
    }

    let segments: Vec<&str> = parsed.path().split('/').filter(|s| !s.is_empty()).collect();

    let candidate = if host.contains("youtu.be") {
        segments.first().map(|s| s.to_string())
    } else if segments.first() == Some(&"shorts") || segments.first() == Some(&"embed") {
        segments.get(1).map(|s| s.to_string())
    } else {
        parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.to_string())
    };

    match candidate {
        Some(id) if VIDEO_ID_RE.is_match(&id) => Ok(id),
        _ => Err(Error::InvalidUrl),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_standard_watch_urls() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("http://youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
    }

    #[test]
    fn accepts_scheme_less_urls() {
        assert!(is_youtube_url("youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("youtu.be/dQw4w9WgXcQ"));
    }

    #[test]
    fn accepts_subdomain_hosts() {
        assert!(is_youtube_url("https://m.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://music.youtube.com/watch?v=dQw4w9WgXcQ"));
    }

    #[test]
    fn rejects_bare_host() {
        assert!(!is_youtube_url("https://www.youtube.com"));
        assert!(!is_youtube_url("https://www.youtube.com/"));
        assert!(!is_youtube_url("youtube.com"));
    }

    #[test]
    fn rejects_other_sites_and_garbage() {
        assert!(!is_youtube_url("https://vimeo.com/12345"));
        assert!(!is_youtube_url("https://notyoutube.com/watch?v=dQw4w9WgXcQ"));
        assert!(!is_youtube_url("not a url"));
        assert!(!is_youtube_url(""));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(!is_youtube_url("ftp://youtube.com/watch?v=dQw4w9WgXcQ"));
    }

    #[test]
    fn query_only_path_counts() {
        assert!(is_youtube_url("https://youtube.com/?v=dQw4w9WgXcQ"));
    }

    #[test]
    fn extracts_id_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn extracts_id_from_short_link() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=42").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn extracts_id_from_shorts_and_embed() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn extracts_id_without_scheme() {
        assert_eq!(
            extract_video_id("youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(extract_video_id("https://www.youtube.com/watch?v=short").is_err());
        assert!(extract_video_id("https://www.youtube.com/watch?v=way_too_long_for_an_id").is_err());
        assert!(extract_video_id("https://youtu.be/bad!chars@@").is_err());
        assert!(extract_video_id("https://www.youtube.com/watch").is_err());
    }

    #[test]
    fn id_must_be_exactly_eleven_chars() {
        // One short and one long of the real id.
        assert!(extract_video_id("https://youtu.be/dQw4w9WgXc").is_err());
        assert!(extract_video_id("https://youtu.be/dQw4w9WgXcQQ").is_err());
    }

    #[test]
    fn rejects_foreign_hosts() {
        assert!(extract_video_id("https://vimeo.com/dQw4w9WgXcQ").is_err());
    }
}
