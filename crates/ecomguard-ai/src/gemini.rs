//! HTTP client for Google's Gemini `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use ecomguard_core::CapturedImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::client::Judge;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("Gemini API key is missing; set GEMINI_API_KEY")]
    MissingCredential,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model service returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("model reply contained no text")]
    EmptyReply,
}

/// Connection settings for the judgment model.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// `None` or empty disables the check; verdicts come back degraded.
    pub api_key: Option<String>,
    pub model: String,
    /// Base URL without trailing slash, e.g. `https://generativelanguage.googleapis.com`.
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GeminiConfig {
    /// The API key, if one is configured and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

// ── Wire types ──

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 2],
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

/// [`Judge`] backed by the Gemini REST API.
pub struct GeminiJudge {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl GeminiJudge {
    /// Build a client from config. Fails if no credential is configured.
    pub fn new(config: &GeminiConfig) -> Result<Self, JudgeError> {
        let api_key = config
            .credential()
            .ok_or(JudgeError::MissingCredential)?
            .to_string();
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        Ok(Self {
            client,
            api_key,
            url,
        })
    }
}

#[async_trait]
impl Judge for GeminiJudge {
    async fn judge(&self, image: &CapturedImage, prompt: &str) -> Result<String, JudgeError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [
                    Part::Text { text: prompt },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: image.mime(),
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
        };

        info!(url = %self.url, bytes = image.len(), mime = image.mime(), "requesting image judgment");
        let resp = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(JudgeError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateResponse = resp.json().await?;
        let text: String = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(JudgeError::EmptyReply);
        }
        debug!(len = text.len(), "judgment reply received");
        Ok(text)
    }
}
