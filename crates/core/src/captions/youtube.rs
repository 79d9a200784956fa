//! YouTube-backed transcript listing.
//! Tracks come from the InnerTube player endpoint; entries come from the
//! timedtext XML each track points at.

use super::{CaptionEntry, CaptionTrack, ListingError, TranscriptLister};
use crate::video::VideoId;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::trace;

pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// Formatting markup left in caption text once entities are decoded.
static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static API_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("api key pattern is valid")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    #[serde(default)]
    status: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrack {
    base_url: String,
    language_code: String,
    kind: Option<String>,
    name: Option<TrackName>,
}

/// Track names arrive either as a plain `simpleText` or as a list of runs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl RawTrack {
    fn into_track(self) -> CaptionTrack {
        let language_name = self
            .name
            .and_then(|n| n.simple_text.or_else(|| n.runs.into_iter().next().map(|r| r.text)))
            .unwrap_or_else(|| self.language_code.clone());
        CaptionTrack {
            is_generated: self.kind.as_deref() == Some("asr"),
            base_url: self.base_url.replace("&fmt=srv3", ""),
            language_code: self.language_code,
            language_name,
        }
    }
}

/// Lists caption tracks through YouTube's web endpoints.
#[derive(Clone)]
pub struct YouTubeTranscripts {
    client: Client,
    base_url: String,
}

impl YouTubeTranscripts {
    /// Create a lister talking to youtube.com.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a lister against another host, e.g. a mock server.
    pub fn with_base_url(base_url: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));
        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_watch_page(&self, id: &VideoId) -> Result<String, ListingError> {
        trace!("fetch_watch_page(id={id})");
        let resp = self
            .client
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", id.as_str())])
            .send()
            .await?;
        Ok(check_status(resp)?.text().await?)
    }

    async fn fetch_player(&self, id: &VideoId, api_key: &str) -> Result<PlayerResponse, ListingError> {
        trace!("fetch_player(id={id})");
        let body = json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "20.10.38"
                }
            },
            "videoId": id.as_str(),
        });
        let resp = self
            .client
            .post(format!("{}/youtubei/v1/player", self.base_url))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;
        Ok(check_status(resp)?.json().await?)
    }
}

#[async_trait]
impl TranscriptLister for YouTubeTranscripts {
    async fn list_transcripts(&self, id: &VideoId) -> Result<Vec<CaptionTrack>, ListingError> {
        let html = self.fetch_watch_page(id).await?;
        let api_key = extract_api_key(&html)?;
        let player = self.fetch_player(id, &api_key).await?;
        tracks_from_player(id, player)
    }

    async fn fetch(&self, track: CaptionTrack) -> Result<Vec<CaptionEntry>, ListingError> {
        trace!("fetch(language={})", track.language_code);
        if track.base_url.contains("&exp=xpe") {
            return Err(anyhow!("track requires a proof-of-origin token").into());
        }
        let resp = self.client.get(&track.base_url).send().await?;
        let xml = check_status(resp)?.text().await?;
        Ok(parse_timedtext(&xml)?)
    }
}

fn check_status(resp: Response) -> Result<Response, ListingError> {
    if resp.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(anyhow!("YouTube is rate limiting requests (HTTP 429)").into());
    }
    Ok(resp.error_for_status()?)
}

fn extract_api_key(html: &str) -> Result<String, ListingError> {
    if html.contains("g-recaptcha") {
        return Err(anyhow!("request blocked by a captcha page").into());
    }
    API_KEY_PATTERN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| anyhow!("watch page has no InnerTube API key").into())
}

/// Map a player response to tracks, classifying the expected failures.
fn tracks_from_player(id: &VideoId, player: PlayerResponse) -> Result<Vec<CaptionTrack>, ListingError> {
    if let Some(status) = player.playability_status {
        match status.status.as_str() {
            "" | "OK" => {}
            "ERROR" if status.reason.to_lowercase().contains("unavailable") => {
                return Err(ListingError::VideoUnavailable(id.to_string()));
            }
            other => {
                return Err(anyhow!("video {id} is unplayable ({other}): {}", status.reason).into());
            }
        }
    }
    let Some(renderer) = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
    else {
        return Err(ListingError::TranscriptsDisabled(id.to_string()));
    };
    let tracks: Vec<CaptionTrack> = renderer
        .caption_tracks
        .into_iter()
        .map(RawTrack::into_track)
        .collect();
    if tracks.is_empty() {
        return Err(ListingError::NoTranscriptFound(id.to_string()));
    }
    Ok(tracks)
}

/// Parse `<transcript><text start=".." dur="..">..</text></transcript>`.
fn parse_timedtext(xml: &str) -> anyhow::Result<Vec<CaptionEntry>> {
    let doc = roxmltree::Document::parse(xml).context("timedtext is not valid XML")?;
    let mut entries = Vec::new();
    for node in doc.descendants().filter(|n| n.has_tag_name("text")) {
        let Some(text) = node.text() else {
            continue;
        };
        let start = parse_seconds(node.attribute("start"))?;
        let duration = parse_seconds(node.attribute("dur"))?;
        entries.push(CaptionEntry {
            text: clean_text(text),
            start,
            duration,
        });
    }
    Ok(entries)
}

/// Timedtext escapes entities a second time and may carry `<font>` markup.
fn clean_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    TAG_PATTERN.replace_all(&decoded, "").into_owned()
}

fn parse_seconds(value: Option<&str>) -> anyhow::Result<f64> {
    match value {
        Some(v) => v.parse().with_context(|| format!("bad time value {v:?}")),
        None => Ok(0.0),
    }
}
