//! Failures surfaced to whoever triggered a translation run.

use crate::video::VideoId;
use thiserror::Error;

/// Terminal outcome of a failed run. Nothing partial is ever returned
/// alongside one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// No video identifier could be extracted from the input.
    #[error("invalid YouTube URL: {0}")]
    InvalidUrl(String),

    /// No auto-generated track in the requested language, or the listing
    /// service reported captions as disabled or unavailable.
    #[error(
        "could not retrieve {language} subtitles for video ID {video_id}; \
         subtitles might be disabled or unavailable"
    )]
    CaptionsUnavailable { video_id: VideoId, language: String },

    /// A chunk exhausted its attempt budget.
    #[error(
        "failed to translate chunk {chunk} of {total} after {attempts} attempts"
    )]
    TranslationFailed {
        /// One-based position of the chunk that gave up.
        chunk: usize,
        total: usize,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    /// Every chunk came back, but the concatenated translation is blank.
    #[error("translation resulted in empty text; check the translation service or input")]
    EmptyTranslation,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
