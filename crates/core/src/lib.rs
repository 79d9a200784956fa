//! Fetch auto-generated YouTube subtitles and translate them in chunks.

pub mod captions;
pub mod error;
pub mod language;
pub mod pipeline;
pub mod translate;
pub mod video;

pub use error::{Error, Result};
pub use language::Language;
pub use pipeline::{Pipeline, Subtitles};
pub use video::{extract_video_id, VideoId};
