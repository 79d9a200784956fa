//! End-to-end run: URL in, original and translated subtitles out.

use crate::captions::{CaptionService, TranscriptLister};
use crate::error::{Error, Result};
use crate::language::Language;
use crate::translate::{ChunkedTranslator, Pause, Translator};
use crate::video::{extract_video_id, VideoId};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, trace};

/// The product of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtitles {
    pub video_id: VideoId,
    pub original: String,
    pub translated: String,
}

impl Subtitles {
    pub fn original_file_name(&self) -> String {
        format!("{}_original.txt", self.video_id)
    }

    pub fn translated_file_name(&self) -> String {
        format!("{}_translated.txt", self.video_id)
    }

    /// Write both texts into `dir` and return their paths.
    pub fn write_to(&self, dir: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
        trace!("write_to dir={}", dir.display());
        fs::create_dir_all(dir)?;
        let original = dir.join(self.original_file_name());
        let translated = dir.join(self.translated_file_name());
        fs::write(&original, &self.original)?;
        fs::write(&translated, &self.translated)?;
        debug!("wrote {} and {}", original.display(), translated.display());
        Ok((original, translated))
    }
}

/// Wires the caption service to the chunked translator.
pub struct Pipeline<L, T, P> {
    captions: CaptionService<L>,
    translator: ChunkedTranslator<T, P>,
}

impl<L, T, P> Pipeline<L, T, P>
where
    L: TranscriptLister,
    T: Translator,
    P: Pause,
{
    pub fn new(captions: CaptionService<L>, translator: ChunkedTranslator<T, P>) -> Self {
        Self {
            captions,
            translator,
        }
    }

    /// Fetch the auto-generated `source` subtitles of the video behind `url`
    /// and translate them to `target`. Any failure ends the run.
    pub async fn run(&self, url: &str, source: Language, target: Language) -> Result<Subtitles> {
        let Some(video_id) = extract_video_id(url) else {
            error!("invalid YouTube URL: {url}");
            return Err(Error::InvalidUrl(url.to_string()));
        };
        info!("fetching {} subtitles for video ID {video_id}", source.name());

        let Some(track) = self.captions.probe(&video_id, source.code()).await else {
            error!("could not retrieve subtitles for video ID {video_id}");
            return Err(Error::CaptionsUnavailable {
                video_id,
                language: source.code().to_string(),
            });
        };
        let original = self.captions.fetch_source_text(&video_id, track).await?;

        info!("translating subtitles to {}", target.name());
        let translated = self
            .translator
            .translate(&original, source.code(), target.code())
            .await?;
        info!("translation completed successfully");
        Ok(Subtitles {
            video_id,
            original,
            translated,
        })
    }
}
