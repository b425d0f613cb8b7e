use thiserror::Error;

/// Why a single backend failed to produce a commentary.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("rate limited")]
    RateLimited,

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response contained no candidate text")]
    Empty,

    /// Carries no url: request urls hold the API key.
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}
