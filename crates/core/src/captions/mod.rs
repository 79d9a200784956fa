//! Caption track discovery and retrieval.
//! The prober picks an auto-generated track in the requested language and
//! remembers the answer for the rest of the session.

use crate::error::{Error, Result};
use crate::video::VideoId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

pub mod youtube;

/// One caption stream available for a video.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    /// Human readable name reported by the service, e.g. "Malayalam (auto-generated)".
    pub language_name: String,
    /// True for machine-generated (speech recognition) tracks.
    pub is_generated: bool,
    /// Where the entries for this track are fetched from.
    pub base_url: String,
}

/// A timestamped caption fragment. Times are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionEntry {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Failures reported by a transcript listing service.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("subtitles are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("video {0} is unavailable")]
    VideoUnavailable(String),

    #[error("no transcript found for video {0}")]
    NoTranscriptFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ListingError {
    /// Whether the service told us plainly that there is nothing to fetch,
    /// as opposed to something going wrong on the way.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            ListingError::TranscriptsDisabled(_)
                | ListingError::VideoUnavailable(_)
                | ListingError::NoTranscriptFound(_)
        )
    }
}

/// Lists and fetches caption tracks for a video.
#[async_trait]
pub trait TranscriptLister: Send + Sync {
    /// All tracks for `id`, in the order the service returns them.
    async fn list_transcripts(&self, id: &VideoId) -> Result<Vec<CaptionTrack>, ListingError>;

    /// Fetch the ordered entries of `track`.
    async fn fetch(&self, track: CaptionTrack) -> Result<Vec<CaptionEntry>, ListingError>;
}

/// Join caption texts with single spaces, preserving order.
pub fn source_text(entries: &[CaptionEntry]) -> String {
    entries
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pick the first auto-generated track in `language`. Human uploaded tracks
/// never match.
pub fn find_generated<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.language_code == language && t.is_generated)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProbeKey {
    video_id: VideoId,
    language: String,
}

/// Session memo of probe results keyed by video and language.
/// Clones share the same storage. Entries are never evicted.
#[derive(Debug, Clone, Default)]
pub struct ProbeCache {
    entries: Arc<Mutex<HashMap<ProbeKey, Option<CaptionTrack>>>>,
}

impl ProbeCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn get(&self, key: &ProbeKey) -> Option<Option<CaptionTrack>> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Store `result` unless another probe got there first, and return
    /// whichever value is now cached.
    async fn insert(&self, key: ProbeKey, result: Option<CaptionTrack>) -> Option<CaptionTrack> {
        self.entries
            .lock()
            .await
            .entry(key)
            .or_insert(result)
            .clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// Finds caption tracks and turns them into source text.
pub struct CaptionService<L> {
    lister: L,
    cache: ProbeCache,
}

impl<L: TranscriptLister> CaptionService<L> {
    pub fn new(lister: L, cache: ProbeCache) -> Self {
        Self { lister, cache }
    }

    /// Look for an auto-generated track in `source_lang`.
    /// Listing failures of any kind are reported as `None`; repeated calls with
    /// the same arguments are answered from the cache.
    pub async fn probe(&self, id: &VideoId, source_lang: &str) -> Option<CaptionTrack> {
        let key = ProbeKey {
            video_id: id.clone(),
            language: source_lang.to_string(),
        };
        if let Some(cached) = self.cache.get(&key).await {
            debug!("probe cache hit for {id} ({source_lang})");
            return cached;
        }
        debug!("checking subtitles for video ID {id} in {source_lang}");
        let result = match self.lister.list_transcripts(id).await {
            Ok(tracks) => {
                let found = find_generated(&tracks, source_lang).cloned();
                if found.is_some() {
                    debug!("subtitles are available");
                } else {
                    warn!("no auto-generated {source_lang} subtitles for video {id}");
                }
                found
            }
            Err(err) if err.is_expected() => {
                warn!("error checking subtitles: {err}; subtitles might be disabled or unavailable");
                None
            }
            Err(err) => {
                error!("unexpected error while checking subtitles: {err:#}");
                None
            }
        };
        self.cache.insert(key, result).await
    }

    /// Fetch `track` and join its entries into one text.
    pub async fn fetch_source_text(&self, id: &VideoId, track: CaptionTrack) -> Result<String> {
        let language = track.language_code.clone();
        match self.lister.fetch(track).await {
            Ok(entries) => {
                debug!("fetched {} caption entries for {id}", entries.len());
                Ok(source_text(&entries))
            }
            Err(err) => {
                error!("failed to fetch {language} subtitles for {id}: {err:#}");
                Err(Error::CaptionsUnavailable {
                    video_id: id.clone(),
                    language,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex as StdMutex;

    fn track(lang: &str, generated: bool) -> CaptionTrack {
        CaptionTrack {
            language_code: lang.to_string(),
            language_name: lang.to_string(),
            is_generated: generated,
            base_url: format!("https://example.com/{lang}"),
        }
    }

    fn video() -> VideoId {
        VideoId::new("dQw4w9WgXcQ").unwrap()
    }

    /// Lister returning canned tracks and counting calls.
    struct MockLister {
        tracks: Vec<CaptionTrack>,
        fail_with: Option<fn(&VideoId) -> ListingError>,
        calls: Arc<StdMutex<u32>>,
    }

    impl MockLister {
        fn with_tracks(tracks: Vec<CaptionTrack>) -> Self {
            Self {
                tracks,
                fail_with: None,
                calls: Arc::new(StdMutex::new(0)),
            }
        }

        fn failing(f: fn(&VideoId) -> ListingError) -> Self {
            Self {
                tracks: Vec::new(),
                fail_with: Some(f),
                calls: Arc::new(StdMutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl TranscriptLister for MockLister {
        async fn list_transcripts(&self, id: &VideoId) -> Result<Vec<CaptionTrack>, ListingError> {
            *self.calls.lock().unwrap() += 1;
            match self.fail_with {
                Some(f) => Err(f(id)),
                None => Ok(self.tracks.clone()),
            }
        }

        async fn fetch(&self, track: CaptionTrack) -> Result<Vec<CaptionEntry>, ListingError> {
            if track.language_code == "broken" {
                return Err(anyhow!("connection reset").into());
            }
            Ok(vec![
                CaptionEntry {
                    text: "hello".into(),
                    start: 0.0,
                    duration: 1.0,
                },
                CaptionEntry {
                    text: "world".into(),
                    start: 1.0,
                    duration: 1.5,
                },
            ])
        }
    }

    #[tokio::test]
    async fn picks_generated_track_and_skips_human_ones() {
        let lister = MockLister::with_tracks(vec![track("en", false), track("ml", true)]);
        let service = CaptionService::new(lister, ProbeCache::new());
        assert_eq!(service.probe(&video(), "ml").await, Some(track("ml", true)));
        assert_eq!(service.probe(&video(), "en").await, None);
    }

    #[tokio::test]
    async fn keeps_service_order_when_several_tracks_match() {
        let mut first = track("ml", true);
        first.base_url = "https://example.com/first".into();
        let lister = MockLister::with_tracks(vec![first.clone(), track("ml", true)]);
        let service = CaptionService::new(lister, ProbeCache::new());
        assert_eq!(service.probe(&video(), "ml").await, Some(first));
    }

    #[tokio::test]
    async fn repeated_probes_hit_the_cache() {
        let lister = MockLister::with_tracks(vec![track("ml", true)]);
        let calls = lister.calls.clone();
        let cache = ProbeCache::new();
        let service = CaptionService::new(lister, cache.clone());
        let first = service.probe(&video(), "ml").await;
        let second = service.probe(&video(), "ml").await;
        assert_eq!(first, second);
        assert_eq!(*calls.lock().unwrap(), 1);
        // A different language is a different key.
        assert_eq!(service.probe(&video(), "ta").await, None);
        assert_eq!(*calls.lock().unwrap(), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn not_found_results_are_cached_too() {
        let lister = MockLister::failing(|id| ListingError::TranscriptsDisabled(id.to_string()));
        let calls = lister.calls.clone();
        let service = CaptionService::new(lister, ProbeCache::new());
        assert_eq!(service.probe(&video(), "ml").await, None);
        assert_eq!(service.probe(&video(), "ml").await, None);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn listing_failures_become_not_found() {
        let failures: [fn(&VideoId) -> ListingError; 4] = [
            |id| ListingError::TranscriptsDisabled(id.to_string()),
            |id| ListingError::VideoUnavailable(id.to_string()),
            |id| ListingError::NoTranscriptFound(id.to_string()),
            |_| ListingError::Other(anyhow!("rate limited")),
        ];
        for f in failures {
            let service = CaptionService::new(MockLister::failing(f), ProbeCache::new());
            assert_eq!(service.probe(&video(), "ml").await, None);
        }
    }

    #[tokio::test]
    async fn concurrent_probes_agree() {
        let lister = MockLister::with_tracks(vec![track("hi", true)]);
        let service = CaptionService::new(lister, ProbeCache::new());
        let id = video();
        let results =
            futures::future::join_all((0..8).map(|_| service.probe(&id, "hi"))).await;
        assert!(results.iter().all(|r| r == &Some(track("hi", true))));
    }

    #[tokio::test]
    async fn builds_source_text_from_entries() {
        let service = CaptionService::new(MockLister::with_tracks(Vec::new()), ProbeCache::new());
        let text = service
            .fetch_source_text(&video(), track("ml", true))
            .await
            .unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn fetch_failure_reports_captions_unavailable() {
        let service = CaptionService::new(MockLister::with_tracks(Vec::new()), ProbeCache::new());
        let err = service
            .fetch_source_text(&video(), track("broken", true))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CaptionsUnavailable { .. }));
    }

    #[test]
    fn classifies_expected_listing_errors() {
        assert!(ListingError::VideoUnavailable("x".into()).is_expected());
        assert!(!ListingError::Other(anyhow!("boom")).is_expected());
    }
}
