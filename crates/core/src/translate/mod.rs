//! Chunked translation with a bounded per-chunk retry budget.
//! Text is cut into fixed-size character chunks that are translated one
//! after another; the first chunk to exhaust its attempts aborts the run.

use crate::error::{Error, Result};
use async_trait::async_trait;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub mod google;

/// Maximum number of characters sent to the translation service at once.
pub const CHUNK_CHARS: usize = 500;

/// Translates a piece of text between two language codes.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> anyhow::Result<String>;
}

/// Waits between attempts.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Non-blocking wait on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How often a chunk is attempted and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per chunk, including the first one.
    pub max_attempts: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Attempts per chunk; never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// A wait drawn uniformly from `min_backoff..=max_backoff`.
    pub fn backoff(&self) -> Duration {
        if self.max_backoff <= self.min_backoff {
            return self.min_backoff;
        }
        rand::rng().random_range(self.min_backoff..=self.max_backoff)
    }
}

/// Split `text` into consecutive slices of at most `max_chars` characters.
/// Boundaries ignore words and sentences; only the character count matters.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::with_capacity(text.len() / max_chars + 1);
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

/// Drives a [`Translator`] over chunked input.
pub struct ChunkedTranslator<T, P = TokioPause> {
    translator: T,
    policy: RetryPolicy,
    pause: P,
}

impl<T: Translator> ChunkedTranslator<T> {
    pub fn new(translator: T, policy: RetryPolicy) -> Self {
        Self {
            translator,
            policy,
            pause: TokioPause,
        }
    }
}

impl<T: Translator, P: Pause> ChunkedTranslator<T, P> {
    /// Swap the waiting primitive used between attempts.
    pub fn with_pause<Q: Pause>(self, pause: Q) -> ChunkedTranslator<T, Q> {
        ChunkedTranslator {
            translator: self.translator,
            policy: self.policy,
            pause,
        }
    }

    /// Translate `text` chunk by chunk. Each translated chunk is followed by a
    /// newline in the result. Nothing is returned unless every chunk succeeds
    /// and the result is not blank.
    pub async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let chunks = chunk_text(text, CHUNK_CHARS);
        let total = chunks.len();
        debug!("translating {total} chunks from {source} to {target}");
        let mut translated = String::new();
        for (i, chunk) in chunks.into_iter().enumerate() {
            let begin = Instant::now();
            let piece = self.translate_chunk(chunk, source, target, i + 1, total).await?;
            translated.push_str(&piece);
            translated.push('\n');
            info!(
                "translated chunk {}/{} in {} ms",
                i + 1,
                total,
                begin.elapsed().as_millis()
            );
        }
        if translated.trim().is_empty() {
            error!("translation resulted in empty text");
            return Err(Error::EmptyTranslation);
        }
        Ok(translated)
    }

    /// Attempt one chunk until it succeeds or the budget runs out.
    async fn translate_chunk(
        &self,
        chunk: &str,
        source: &str,
        target: &str,
        index: usize,
        total: usize,
    ) -> Result<String> {
        let attempts = self.policy.attempts();
        let mut attempt = 1;
        loop {
            match self.translator.translate(chunk, source, target).await {
                Ok(piece) => return Ok(piece),
                Err(err) if attempt >= attempts => {
                    error!(
                        "chunk {index}/{total} failed after {attempts} attempts: {err:#}"
                    );
                    return Err(Error::TranslationFailed {
                        chunk: index,
                        total,
                        attempts,
                        source: err,
                    });
                }
                Err(err) => {
                    let wait = self.policy.backoff();
                    warn!(
                        "translation error on chunk {index}/{total} (attempt {attempt}/{attempts}): {err:#}; retrying in {} ms",
                        wait.as_millis()
                    );
                    self.pause.pause(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}
