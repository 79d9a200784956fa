//! Binary entry point for the subtitle translator.

use anyhow::{bail, Context, Result};
use captrans_core::captions::youtube::{self, YouTubeTranscripts};
use captrans_core::captions::{CaptionService, ProbeCache};
use captrans_core::translate::google::{self, GoogleTranslator};
use captrans_core::translate::{ChunkedTranslator, RetryPolicy};
use captrans_core::{Language, Pipeline};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Translate the auto-generated subtitles of a YouTube video.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// YouTube link of the video.
    url: String,

    /// Language of the auto-generated subtitles (ml, ta, te, hi, en).
    #[arg(long, default_value = "ml")]
    source: Language,

    /// Language to translate into (ml, ta, te, hi, en).
    #[arg(long, default_value = "en")]
    target: Language,

    /// Directory that receives `<id>_original.txt` and `<id>_translated.txt`.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Attempts per chunk before the translation is abandoned.
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Lower bound of the wait between attempts, in seconds.
    #[arg(long, default_value_t = 5.0)]
    min_backoff_secs: f64,

    /// Upper bound of the wait between attempts, in seconds.
    #[arg(long, default_value_t = 10.0)]
    max_backoff_secs: f64,

    /// Base URL of the YouTube web endpoints.
    #[arg(long, env = "CAPTRANS_YOUTUBE_URL", default_value = youtube::DEFAULT_BASE_URL)]
    youtube_url: String,

    /// Base URL of the translation endpoint.
    #[arg(long, env = "CAPTRANS_TRANSLATE_URL", default_value = google::DEFAULT_BASE_URL)]
    translate_url: String,

    /// Enable verbose debug and trace logs.
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// Build the retry policy, rejecting ranges that make no sense.
    fn retry_policy(&self) -> Result<RetryPolicy> {
        let (min, max) = (self.min_backoff_secs, self.max_backoff_secs);
        if !min.is_finite() || !max.is_finite() || min < 0.0 || max < 0.0 {
            bail!("backoff bounds must be non-negative numbers of seconds");
        }
        if min > max {
            bail!("--min-backoff-secs ({min}) is larger than --max-backoff-secs ({max})");
        }
        if self.max_attempts == 0 {
            bail!("--max-attempts must be at least 1");
        }
        let backoff = |secs: f64| {
            Duration::try_from_secs_f64(secs)
                .with_context(|| format!("backoff of {secs} seconds is out of range"))
        };
        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            min_backoff: backoff(min)?,
            max_backoff: backoff(max)?,
        })
    }
}

fn init_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::default()
            .add_directive("captrans=trace".parse()?)
            .add_directive("captrans_core=trace".parse()?)
            .add_directive("info".parse()?)
    } else {
        EnvFilter::default()
            .add_directive("captrans=info".parse()?)
            .add_directive("captrans_core=info".parse()?)
            .add_directive("warn".parse()?)
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Application entry point which parses CLI args, runs the pipeline and
/// presents the result.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug)?;
    let policy = cli.retry_policy()?;

    let captions = CaptionService::new(
        YouTubeTranscripts::with_base_url(&cli.youtube_url)?,
        ProbeCache::new(),
    );
    let translator = ChunkedTranslator::new(GoogleTranslator::with_base_url(&cli.translate_url)?, policy);
    let pipeline = Pipeline::new(captions, translator);

    let subs = match pipeline.run(&cli.url, cli.source, cli.target).await {
        Ok(subs) => subs,
        Err(err) => {
            error!("{err}");
            bail!("{err}");
        }
    };

    println!("== Original Subtitles ==\n{}\n", subs.original);
    println!("== Translated Subtitles ==\n{}", subs.translated);
    if let Some(dir) = &cli.output_dir {
        let (original, translated) = subs.write_to(dir)?;
        info!("wrote {} and {}", original.display(), translated.display());
    }
    println!("Translation completed successfully!");
    Ok(())
}
