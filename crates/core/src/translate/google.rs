//! Google Translate-backed translator implementation.
//! This uses the public `translate_a/single` endpoint with the `gtx` client.

use super::Translator;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::trace;

pub const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";

/// Translator that delegates to the Google Translate web endpoint.
#[derive(Clone)]
pub struct GoogleTranslator {
    client: Client,
    base_url: String,
}

impl GoogleTranslator {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a translator against another host, e.g. a mock server.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    /// Translate `text` in one request and join the returned sentence segments.
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        trace!("translate(chars={}, {source} -> {target})", text.chars().count());
        let resp = self
            .client
            .get(format!("{}/translate_a/single", self.base_url))
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;
        let value: Value = resp.error_for_status()?.json().await?;
        join_segments(&value)
    }
}

/// The response is `[[["translated", "original", ...], ...], ...]`; a `null`
/// first element means nothing came back.
fn join_segments(value: &Value) -> Result<String> {
    let segments = match value.get(0) {
        Some(Value::Array(segments)) => segments,
        Some(Value::Null) => return Ok(String::new()),
        _ => return Err(anyhow!("unexpected translation response shape")),
    };
    Ok(segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn joins_translated_segments() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/translate_a/single")
                    .query_param("client", "gtx")
                    .query_param("sl", "ml")
                    .query_param("tl", "en")
                    .query_param("dt", "t")
                    .query_param("q", "നമസ്കാരം. സുഖമാണോ?");
                then.status(200).json_body(json!([
                    [["Hello. ", "നമസ്കാരം. ", null, null], ["How are you?", "സുഖമാണോ?", null, null]],
                    null,
                    "ml"
                ]));
            })
            .await;

        let tr = GoogleTranslator::with_base_url(&server.base_url()).unwrap();
        let out = tr.translate("നമസ്കാരം. സുഖമാണോ?", "ml", "en").await.unwrap();
        mock.assert_async().await;
        assert_eq!(out, "Hello. How are you?");
    }

    #[tokio::test]
    async fn server_errors_are_failures() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/translate_a/single");
                then.status(429);
            })
            .await;

        let tr = GoogleTranslator::with_base_url(&server.base_url()).unwrap();
        assert!(tr.translate("hi", "en", "ta").await.is_err());
    }

    #[test]
    fn null_body_is_empty_translation() {
        assert_eq!(join_segments(&json!([null, null, "en"])).unwrap(), "");
        assert!(join_segments(&json!({"error": 1})).is_err());
    }
}
