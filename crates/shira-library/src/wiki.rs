//! Encyclopedia lookup for author portraits: open-search for the best title,
//! then the REST page summary for its thumbnail.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::http::LibraryError;

/// Honorifics that hurt open-search matching.
const HONORIFICS: &[&str] = &["רבי", "הרב"];

const USER_AGENT: &str = concat!(
    "shira/",
    env!("CARGO_PKG_VERSION"),
    " (daily poem mailer; +https://github.com/shira-bot/shira)"
);

#[derive(Deserialize)]
struct PageSummary {
    thumbnail: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    source: Option<String>,
}

/// Client for a MediaWiki site (`{base}/w/api.php`, `{base}/api/rest_v1`).
pub struct EncyclopediaClient {
    client: reqwest::Client,
    base_url: String,
}

impl EncyclopediaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LibraryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Thumbnail url of the page that best matches `author`, if any.
    pub async fn portrait(&self, author: &str) -> Result<Option<String>, LibraryError> {
        let query = clean_author_name(author);
        if query.is_empty() {
            return Ok(None);
        }

        let Some(title) = self.search(&query).await? else {
            debug!(query = %query, "no encyclopedia match");
            return Ok(None);
        };

        let url = format!(
            "{}/api/rest_v1/page/summary/{}",
            self.base_url,
            urlencoding::encode(&title)
        );
        debug!(url = %url, "fetching page summary");
        let body = get_text(self.client.get(&url)).await?;
        let summary: PageSummary = serde_json::from_str(&body)?;
        Ok(summary
            .thumbnail
            .and_then(|t| t.source)
            .filter(|s| !s.trim().is_empty()))
    }

    async fn search(&self, query: &str) -> Result<Option<String>, LibraryError> {
        let url = format!("{}/w/api.php", self.base_url);
        let request = self.client.get(&url).query(&[
            ("action", "opensearch"),
            ("search", query),
            ("limit", "1"),
            ("format", "json"),
        ]);
        let body = get_text(request).await?;
        // Response shape: [query, [titles], [descriptions], [urls]]
        let value: Value = serde_json::from_str(&body)?;
        Ok(value
            .get(1)
            .and_then(Value::as_array)
            .and_then(|titles| titles.first())
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

async fn get_text(request: reqwest::RequestBuilder) -> Result<String, LibraryError> {
    let resp = request.send().await?;
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

/// First name variant (before any `/`), without honorifics.
fn clean_author_name(author: &str) -> String {
    let first = author.split('/').next().unwrap_or_default();
    first
        .split_whitespace()
        .filter(|word| !HONORIFICS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}
