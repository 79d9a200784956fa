//! Video identifier helpers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tracing::debug;

/// Number of characters in a YouTube video identifier.
pub const VIDEO_ID_LEN: usize = 11;

/// `v=<id>` or `/<id>`, first occurrence wins.
static VIDEO_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11}).*").expect("video id pattern is valid")
});

/// An 11-character video identifier drawn from `[0-9A-Za-z_-]`.
/// It keys caption lookups and names the written artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Validate a bare identifier.
    pub fn new(id: &str) -> Option<Self> {
        let valid = id.len() == VIDEO_ID_LEN
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| Self(id.to_string()))
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

/// Extract the video identifier from a watch, short or embed URL.
/// This never fails loudly: anything without a `v=` or `/` followed by
/// eleven identifier characters yields `None`.
pub fn extract_video_id(url: &str) -> Option<VideoId> {
    debug!("extracting video ID from URL: {url}");
    let id = VIDEO_ID_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId(m.as_str().to_string()));
    match &id {
        Some(id) => debug!("extracted video ID: {id}"),
        None => debug!("no video ID found in URL"),
    }
    id
}
