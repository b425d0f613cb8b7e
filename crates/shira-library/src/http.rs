//! HTTP client for the Ben-Yehuda project API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use shira_core::{Scalar, TextRecord, Timeouts};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LibraryError {
    /// Carries no url: metadata urls hold the API key.
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for LibraryError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

/// Where candidate texts come from.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Fetch the metadata record for text `id`.
    async fn fetch_text(&self, id: u32) -> Result<TextRecord, LibraryError>;

    /// Fetch the raw markup behind a record's download url.
    async fn download(&self, url: &str) -> Result<String, LibraryError>;
}

#[derive(Deserialize)]
struct AuthorRecord {
    image_url: Option<String>,
    portrait_url: Option<String>,
}

/// Client for `{base}/texts/{id}` and `{base}/authors/{id}`.
pub struct LibraryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    metadata_timeout: Duration,
    download_timeout: Duration,
}

impl LibraryClient {
    /// `base_url` should be like `https://benyehuda.org/api/v1` (a trailing
    /// slash is dropped).
    pub fn new(base_url: &str, api_key: &str, timeouts: &Timeouts) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            metadata_timeout: timeouts.metadata,
            download_timeout: timeouts.download,
        }
    }

    async fn get_json(&self, url: &str) -> Result<String, LibraryError> {
        let resp = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.metadata_timeout)
            .send()
            .await?;
        read_body(resp).await
    }

    /// Portrait url from the library's own author record, if it has one.
    pub async fn author_portrait(&self, author_id: &Scalar) -> Result<Option<String>, LibraryError> {
        let url = format!("{}/authors/{}", self.base_url, author_id);
        debug!(url = %url, "fetching author record");
        let body = self.get_json(&url).await?;
        let author: AuthorRecord = serde_json::from_str(&body)?;
        Ok([author.image_url, author.portrait_url]
            .into_iter()
            .flatten()
            .find(|u| !u.trim().is_empty()))
    }
}

#[async_trait]
impl TextSource for LibraryClient {
    async fn fetch_text(&self, id: u32) -> Result<TextRecord, LibraryError> {
        let url = format!("{}/texts/{}", self.base_url, id);
        debug!(url = %url, "fetching text metadata");
        let body = self.get_json(&url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn download(&self, url: &str) -> Result<String, LibraryError> {
        debug!(url = %url, "downloading text");
        let resp = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await?;
        read_body(resp).await
    }
}

async fn read_body(resp: reqwest::Response) -> Result<String, LibraryError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(LibraryError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.text().await?)
}
