//! Library record types for texts served by the Ben-Yehuda API.
//!
//! [`TextRecord`] mirrors the JSON body of `GET /texts/{id}` loosely: every
//! field is optional so that a sparse record still parses and can be judged
//! by [`TextRecord::into_poem`] instead of failing deserialisation.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// The only genre a candidate may carry to be accepted.
pub const POETRY_GENRE: &str = "poetry";

/// A JSON value the API sends as either a number or a string (ids, years).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    /// True for `0` and for strings that are empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Int(n) => *n == 0,
            Self::Text(s) => s.trim().is_empty(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// Publication date fields, in the order [`crate::format_date`] prefers them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublicationDate {
    /// `YYYY-MM-DD` when the library knows the exact date.
    pub orig_publication_date: Option<String>,
    /// Free text, e.g. "תרפ״ג".
    pub raw_publication_date: Option<String>,
    pub year: Option<Scalar>,
}

/// The `metadata` object of a text record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextMetadata {
    pub title: Option<String>,
    pub author_string: Option<String>,
    pub author_id: Option<Scalar>,
    pub genre: Option<String>,
    pub bibliographic_info: Option<String>,
    pub source: Option<String>,
    #[serde(flatten)]
    pub date: PublicationDate,
}

/// Response body of `GET /texts/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextRecord {
    #[serde(default)]
    pub metadata: TextMetadata,
    pub download_url: Option<String>,
    pub url: Option<String>,
}

/// Why a fetched text record cannot be used as a poem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unsuitable {
    #[error("genre is {0:?}, not poetry")]
    Genre(Option<String>),
    #[error("record has no download url")]
    NoDownloadUrl,
    #[error("record has no title")]
    NoTitle,
}

/// A text record that passed the genre and download filters.
#[derive(Debug, Clone, PartialEq)]
pub struct PoemRecord {
    pub id: u32,
    pub title: String,
    pub author: String,
    pub author_id: Option<Scalar>,
    pub bibliographic_info: Option<String>,
    pub date: PublicationDate,
    pub download_url: String,
    /// Page on the library site, used for the "read more" link.
    pub page_url: Option<String>,
}

impl TextRecord {
    /// Apply the acceptance filters: genre must be exactly `"poetry"`, a
    /// download url must be present, and the title must be non-empty.
    pub fn into_poem(self, id: u32) -> Result<PoemRecord, Unsuitable> {
        let TextRecord {
            metadata,
            download_url,
            url,
        } = self;

        if metadata.genre.as_deref() != Some(POETRY_GENRE) {
            return Err(Unsuitable::Genre(metadata.genre));
        }

        let download_url = download_url
            .filter(|u| !u.trim().is_empty())
            .ok_or(Unsuitable::NoDownloadUrl)?;

        let title = metadata
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(Unsuitable::NoTitle)?;

        let bibliographic_info = non_empty(metadata.bibliographic_info).or(non_empty(metadata.source));

        Ok(PoemRecord {
            id,
            title,
            author: metadata.author_string.unwrap_or_default().trim().to_string(),
            author_id: metadata.author_id.filter(|a| !a.is_blank()),
            bibliographic_info,
            date: metadata.date,
            download_url,
            page_url: url,
        })
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
