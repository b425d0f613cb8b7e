//! Gemini `generateContent` backend.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BackendError;
use crate::fallback::Backend;

/// A single Gemini model behind `POST {base}/{model}:generateContent`.
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
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
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate that has any.
    fn into_text(self) -> Option<String> {
        self.candidates.into_iter().find_map(|c| {
            let text: String = c
                .content?
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect();
            (!text.trim().is_empty()).then_some(text)
        })
    }
}

impl GeminiBackend {
    /// `model` may carry the API's `models/` prefix; it is dropped.
    pub fn new(client: reqwest::Client, base_url: &str, model: &str, api_key: &str) -> Self {
        let model = model.trim();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.strip_prefix("models/").unwrap_or(model).to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, "POST generateContent");
        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw = resp.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&raw)?;
        parsed.into_text().ok_or(BackendError::Empty)
    }
}
