//! Ordered fallback across generation backends.
//!
//! Backends are tried one at a time in the order given. The first one that
//! returns non-empty text wins; its output is returned unmerged. A rate-limit
//! response costs a short pause before the next backend is tried. The same
//! backend is never retried.

use std::time::Duration;

use async_trait::async_trait;
use shira_core::Settings;
use tracing::{info, warn};

use crate::error::BackendError;
use crate::gemini::GeminiBackend;
use crate::prompt::{CommentaryRequest, build_prompt};

/// Returned verbatim when every backend fails. Delivery treats it as "no
/// commentary available".
pub const FALLBACK_COMMENTARY: &str = "<p>לא ניתן היה לייצר ניתוח עומק הפעם.</p>";

/// One generation endpoint.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Generate a response for `prompt`. Only non-empty text is `Ok`.
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Try `backends` strictly in sequence and return the first usable response,
/// with code fences stripped.
pub async fn first_success(
    backends: &[Box<dyn Backend>],
    prompt: &str,
    rate_limit_pause: Duration,
) -> Option<String> {
    for backend in backends {
        info!(backend = backend.name(), "requesting commentary");
        match backend.generate(prompt).await {
            Ok(text) => {
                let text = strip_fences(&text);
                if text.trim().is_empty() {
                    warn!(backend = backend.name(), "backend returned only fences");
                    continue;
                }
                info!(backend = backend.name(), chars = text.chars().count(), "commentary received");
                return Some(text);
            }
            Err(BackendError::RateLimited) => {
                warn!(
                    backend = backend.name(),
                    pause_ms = rate_limit_pause.as_millis() as u64,
                    "rate limited, moving to next backend"
                );
                tokio::time::sleep(rate_limit_pause).await;
            }
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "backend failed");
            }
        }
    }
    None
}

/// Remove Markdown code fences (```` ```html ```` and ```` ``` ````) a model
/// may wrap around its HTML.
pub fn strip_fences(text: &str) -> String {
    text.replace("```html", "").replace("```", "").trim().to_string()
}

/// Commentary generator over an ordered backend list.
pub struct CommentaryGenerator {
    backends: Vec<Box<dyn Backend>>,
    rate_limit_pause: Duration,
    sample_cap: usize,
}

impl CommentaryGenerator {
    pub fn new(
        backends: Vec<Box<dyn Backend>>,
        rate_limit_pause: Duration,
        sample_cap: usize,
    ) -> Self {
        Self {
            backends,
            rate_limit_pause,
            sample_cap,
        }
    }

    /// One [`GeminiBackend`] per configured model, sharing a single HTTP client.
    pub fn gemini(settings: &Settings, api_key: &str) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeouts.generation)
            .build()?;

        let backends = settings
            .models
            .iter()
            .map(|model| {
                Box::new(GeminiBackend::new(
                    client.clone(),
                    &settings.generation_url,
                    model,
                    api_key,
                )) as Box<dyn Backend>
            })
            .collect();

        Ok(Self::new(
            backends,
            settings.rate_limit_pause,
            settings.sample_cap,
        ))
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Produce a commentary, or [`FALLBACK_COMMENTARY`] if no backend succeeds.
    pub async fn generate(&self, request: &CommentaryRequest<'_>) -> String {
        let prompt = build_prompt(request, self.sample_cap);
        match first_success(&self.backends, &prompt, self.rate_limit_pause).await {
            Some(text) => text,
            None => {
                warn!(backends = self.backends.len(), "all backends failed, using fallback");
                FALLBACK_COMMENTARY.to_string()
            }
        }
    }
}
