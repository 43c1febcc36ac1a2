//! Thin blocking HTTP client for the text and image generation endpoints.
//!
//! Network plumbing only: prompts go out, raw text comes back and is handed
//! to [`crate::metaphor::parse`]. Provider error bodies are mined for their
//! structured message and truncated when unparseable.

use anyhow::Context as _;
use base64::Engine as _;

use crate::foundation::error::{PosterError, PosterResult};
use crate::metaphor::model::MetaphorResponse;
use crate::metaphor::parse;
use crate::metaphor::prompt::metaphor_prompt;

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
const TEXT_MODEL: &str = "claude-sonnet-4-20250514";
const IMAGE_MODEL: &str = "gpt-image-1";
const IMAGE_MODEL_FALLBACK: &str = "dall-e-3";
const ERROR_BODY_LIMIT: usize = 200;

/// Result of image generation: providers return either a hosted URL or an
/// inline base64 payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeneratedImage {
    Url(String),
    Png(Vec<u8>),
}

pub struct GenerationClient {
    http: reqwest::blocking::Client,
    anthropic_key: String,
    openai_key: String,
    messages_url: String,
    images_url: String,
}

impl GenerationClient {
    pub fn new(anthropic_key: impl Into<String>, openai_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            anthropic_key: anthropic_key.into(),
            openai_key: openai_key.into(),
            messages_url: ANTHROPIC_MESSAGES_URL.to_string(),
            images_url: OPENAI_IMAGES_URL.to_string(),
        }
    }

    /// Point the client at alternate endpoints (integration testing).
    pub fn with_endpoints(mut self, messages_url: String, images_url: String) -> Self {
        self.messages_url = messages_url;
        self.images_url = images_url;
        self
    }

    /// Generate and parse a metaphor for the user's situation.
    #[tracing::instrument(skip(self))]
    pub fn generate_metaphor(&self, topic: &str) -> PosterResult<MetaphorResponse> {
        let body = serde_json::json!({
            "model": TEXT_MODEL,
            "max_tokens": 2048,
            "messages": [{
                "role": "user",
                "content": [{ "type": "text", "text": metaphor_prompt(topic) }],
            }],
        });

        let resp = self
            .http
            .post(&self.messages_url)
            .header("x-api-key", &self.anthropic_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .context("send text generation request")?;

        let status = resp.status().as_u16();
        let text = resp.text().context("read text generation response")?;
        if !(200..300).contains(&status) {
            return Err(api_error(status, &text));
        }

        let value: serde_json::Value =
            serde_json::from_str(&text).context("decode text generation response")?;
        let block = value["content"]
            .as_array()
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|b| b["type"].as_str() == Some("text"))
                    .and_then(|b| b["text"].as_str())
            })
            .ok_or_else(|| PosterError::api(status, "no text content in response"))?;

        Ok(parse::parse(block)?)
    }

    /// Generate an image for a finished prompt.
    ///
    /// On 400/404 from the primary model, retries exactly once with the
    /// fallback model at its own quality setting, then surfaces whatever
    /// that attempt produced.
    #[tracing::instrument(skip_all)]
    pub fn generate_image(&self, dalle_prompt: &str) -> PosterResult<GeneratedImage> {
        match self.request_image(dalle_prompt, IMAGE_MODEL, "high") {
            Err(PosterError::Api { status, .. }) if matches!(status, 400 | 404) => {
                tracing::debug!(status, "primary image model unavailable, trying fallback");
                self.request_image(dalle_prompt, IMAGE_MODEL_FALLBACK, "hd")
            }
            other => other,
        }
    }

    fn request_image(
        &self,
        prompt: &str,
        model: &str,
        quality: &str,
    ) -> PosterResult<GeneratedImage> {
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
            "quality": quality,
        });

        let resp = self
            .http
            .post(&self.images_url)
            .bearer_auth(&self.openai_key)
            .json(&body)
            .send()
            .context("send image generation request")?;

        let status = resp.status().as_u16();
        let text = resp.text().context("read image generation response")?;
        if !(200..300).contains(&status) {
            return Err(api_error(status, &text));
        }

        let value: serde_json::Value =
            serde_json::from_str(&text).context("decode image generation response")?;
        image_from_response(status, &value)
    }
}

/// Build an API error from a non-2xx body: the provider's structured
/// `error.message` when present, else the raw body truncated.
fn api_error(status: u16, body: &str) -> PosterError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(ERROR_BODY_LIMIT).collect());
    PosterError::api(status, message)
}

fn image_from_response(
    status: u16,
    value: &serde_json::Value,
) -> PosterResult<GeneratedImage> {
    let first = &value["data"][0];
    if let Some(b64) = first["b64_json"].as_str() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .context("decode base64 image payload")?;
        return Ok(GeneratedImage::Png(bytes));
    }
    if let Some(url) = first["url"].as_str() {
        return Ok(GeneratedImage::Url(url.to_string()));
    }
    Err(PosterError::api(status, "no image payload in response"))
}
