//! Run-wide configuration, built once at startup and passed down by reference.

use std::time::Duration;

pub const DEFAULT_LIBRARY_URL: &str = "https://benyehuda.org/api/v1";
pub const DEFAULT_GENERATION_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_ENCYCLOPEDIA_URL: &str = "https://he.wikipedia.org";
pub const DEFAULT_SMTP_RELAY: &str = "smtp.gmail.com";
/// Submission port; the session is upgraded with STARTTLS.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Generation backends, most capable first.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-3-flash-preview",
    "gemini-flash-latest",
    "gemini-2.5-flash-preview-09-2025",
    "gemini-2.5-flash-lite",
    "gemma-3-27b-it",
];

/// Highest text id known to exist in the library.
pub const DEFAULT_MAX_ID: u32 = 59_083;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;
pub const DEFAULT_WORD_BUDGET: usize = 450;
/// Poems with fewer characters than this are not worth a commentary.
pub const DEFAULT_MIN_CHARS: usize = 20;
/// Characters of poem text embedded in the generation prompt.
pub const DEFAULT_SAMPLE_CAP: usize = 1500;

/// Per-endpoint request timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    pub metadata: Duration,
    pub download: Duration,
    pub generation: Duration,
    pub encyclopedia: Duration,
    pub smtp: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            metadata: Duration::from_secs(5),
            download: Duration::from_secs(10),
            generation: Duration::from_secs(20),
            encyclopedia: Duration::from_secs(10),
            smtp: Duration::from_secs(30),
        }
    }
}

/// Immutable settings for one run. Secrets live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub library_url: String,
    pub generation_url: String,
    pub encyclopedia_url: String,
    /// Outgoing mail relay and its STARTTLS submission port.
    pub smtp_relay: String,
    pub smtp_port: u16,
    /// Ordered backend preference; tried strictly in sequence.
    pub models: Vec<String>,
    pub word_budget: usize,
    pub max_id: u32,
    pub max_attempts: u32,
    pub min_chars: usize,
    pub sample_cap: usize,
    /// Pause after a backend reports rate limiting, before trying the next one.
    pub rate_limit_pause: Duration,
    /// Redraw ids already sampled in this run.
    pub dedupe: bool,
    pub timeouts: Timeouts,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            library_url: DEFAULT_LIBRARY_URL.to_string(),
            generation_url: DEFAULT_GENERATION_URL.to_string(),
            encyclopedia_url: DEFAULT_ENCYCLOPEDIA_URL.to_string(),
            smtp_relay: DEFAULT_SMTP_RELAY.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            word_budget: DEFAULT_WORD_BUDGET,
            max_id: DEFAULT_MAX_ID,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_chars: DEFAULT_MIN_CHARS,
            sample_cap: DEFAULT_SAMPLE_CAP,
            rate_limit_pause: Duration::from_millis(500),
            dedupe: false,
            timeouts: Timeouts::default(),
        }
    }
}
