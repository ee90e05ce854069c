use serde::Serialize;
use std::fmt;
use url::Url;

use crate::{Result, YoutextError};

/// Length of every YouTube video identifier
pub const VIDEO_ID_LEN: usize = 11;

/// Path prefixes on youtube.com that carry the video ID as the next segment
const ID_PATH_PREFIXES: &[&str] = &["embed", "v", "shorts", "live", "e"];

/// Canonical 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Accept `candidate` only if it is exactly a well-formed ID
    fn parse(candidate: &str) -> Option<Self> {
        let valid = candidate.len() == VIDEO_ID_LEN
            && candidate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        valid.then(|| Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract a video ID from a YouTube URL or a bare ID.
///
/// Supported shapes:
/// - `dQw4w9WgXcQ`
/// - `https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42`
/// - `https://youtu.be/dQw4w9WgXcQ?si=...`
/// - `https://www.youtube.com/{embed,v,shorts,live}/dQw4w9WgXcQ`
/// - `https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ`
///
/// The scheme may be omitted and `www.`, `m.` and `music.` hosts are accepted.
pub fn extract_video_id(input: &str) -> Result<VideoId> {
    let input = input.trim();
    tracing::debug!("Extracting video ID from input: {}", input);

    if let Some(id) = VideoId::parse(input) {
        return Ok(id);
    }

    parse_url(input)
        .and_then(|url| id_from_url(&url))
        .ok_or_else(|| YoutextError::InvalidReference(input.to_string()))
}

/// Parse `input` as a URL, adding a scheme when it was left out
fn parse_url(input: &str) -> Option<Url> {
    if input.is_empty() || input.chars().any(char::is_whitespace) {
        return None;
    }

    let url = match Url::parse(input) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", input)).ok()
        }
        Err(_) => None,
    };

    url.filter(|url| matches!(url.scheme(), "http" | "https"))
}

fn id_from_url(url: &Url) -> Option<VideoId> {
    let host = url.host_str()?.to_ascii_lowercase();
    let host = ["www.", "m.", "music."]
        .iter()
        .find_map(|prefix| host.strip_prefix(prefix))
        .unwrap_or(host.as_str());

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = match host {
        "youtu.be" => segments.next()?.to_string(),
        "youtube.com" | "youtube-nocookie.com" => match segments.next()? {
            "watch" => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())?,
            prefix if ID_PATH_PREFIXES.contains(&prefix) => segments.next()?.to_string(),
            _ => return None,
        },
        _ => return None,
    };

    VideoId::parse(&candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn test_all_url_shapes_yield_same_id() {
        let inputs = [
            "dQw4w9WgXcQ",
            "  dQw4w9WgXcQ\n",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42s",
            "http://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ&list=RD",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abc&t=10",
            "youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ?start=5",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ?feature=share",
        ];

        for input in inputs {
            let id = extract_video_id(input).unwrap_or_else(|e| panic!("{input}: {e}"));
            assert_eq!(id.as_str(), ID, "input: {input}");
        }
    }

    #[test]
    fn test_rejects_unrecognised_input() {
        let inputs = [
            "",
            "not a video",
            "dQw4w9WgXc",
            "dQw4w9WgXcQQ",
            "dQw4w9WgX!Q",
            "https://vimeo.com/dQw4w9WgXcQ",
            "https://www.youtube.com/watch",
            "https://www.youtube.com/watch?v=short",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQextra",
            "https://www.youtube.com/channel/UC38IQsAvIsxxjztdMZQtwHA",
            "https://youtu.be/",
            "ftp://youtu.be/dQw4w9WgXcQ",
            "https://notyoutube.com/watch?v=dQw4w9WgXcQ",
        ];

        for input in inputs {
            match extract_video_id(input) {
                Err(YoutextError::InvalidReference(reported)) => {
                    assert_eq!(reported, input.trim())
                }
                other => panic!("{input:?} should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_display_is_bare_id() {
        let id = extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(id.to_string(), ID);
        assert_eq!(extract_video_id(&id.to_string()).unwrap(), id);
    }
}
