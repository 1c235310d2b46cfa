//! Gemini image analyzer
//!
//! Sends a snapshot to the Generative Language `generateContent` endpoint as
//! inline base64 data and returns the first text part of the first candidate.

use crate::analysis::{AnalysisError, ImageAnalyzer};
use crate::config::GeminiConfig;
use crate::CamWatchError;
use async_trait::async_trait;
use camwatch_media::EncodedImage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Prompt sent with every snapshot
pub const SECURITY_PROMPT: &str = "You are a security camera assistant. Describe what is happening in \
this image in one or two short sentences. Mention any people, vehicles or animals and anything \
that looks unusual or suspicious.";

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
    data: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Error body returned with non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// [`ImageAnalyzer`] backed by the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiAnalyzer {
    config: GeminiConfig,
    client: Client,
    prompt: String,
}

impl GeminiAnalyzer {
    /// Create an analyzer from validated configuration
    pub fn new(config: GeminiConfig) -> Result<Self, CamWatchError> {
        config.validate()?;
        info!(model = %config.model, "Gemini analyzer configured");
        Ok(Self {
            config,
            client: Client::new(),
            prompt: SECURITY_PROMPT.to_string(),
        })
    }

    /// Create an analyzer from `GEMINI_API_KEY` and friends
    pub fn from_env() -> Result<Self, CamWatchError> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Replace the prompt sent with each image
    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.prompt = prompt.to_string();
        self
    }

    /// Model in use
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            self.config.api_key
        )
    }
}

#[async_trait]
impl ImageAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, image: &EncodedImage) -> Result<String, AnalysisError> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: &self.prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &image.mime_type,
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
        };

        debug!(model = %self.config.model, bytes = image.len(), "Sending snapshot to Gemini");
        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Network {
                reason: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AnalysisError::Service {
                status: Some(status.as_u16()),
                message,
            });
        }

        let gemini_response: GeminiResponse =
            response.json().await.map_err(|e| AnalysisError::Service {
                status: None,
                message: format!("malformed response: {}", e.without_url()),
            })?;

        let text = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(AnalysisError::EmptyResponse)?;

        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
