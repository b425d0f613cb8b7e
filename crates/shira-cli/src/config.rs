//! Command-line and environment configuration.
//!
//! Every option can come from a flag or an environment variable. Credentials
//! are required and must be non-blank; everything else has a default.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use shira_core::Settings;
use shira_core::settings::{
    DEFAULT_ENCYCLOPEDIA_URL, DEFAULT_GENERATION_URL, DEFAULT_LIBRARY_URL, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_ID, DEFAULT_MIN_CHARS, DEFAULT_MODELS, DEFAULT_SAMPLE_CAP, DEFAULT_SMTP_PORT,
    DEFAULT_SMTP_RELAY, DEFAULT_WORD_BUDGET,
};
use shira_mail::Sender;

// No Debug: holds credentials.
#[derive(Parser)]
#[command(name = "shira", version, about = "Mail one random Hebrew poem with a literary commentary")]
pub struct Args {
    /// Generation service API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, value_parser = non_blank)]
    gemini_api_key: String,

    /// Digital library API key.
    #[arg(long, env = "BENYEHUDA_KEY", hide_env_values = true, value_parser = non_blank)]
    library_key: String,

    /// Sender mailbox.
    #[arg(long, env = "SENDER_EMAIL", value_parser = non_blank)]
    sender: String,

    /// Sender app password.
    #[arg(long, env = "APP_PASSWORD", hide_env_values = true, value_parser = non_blank)]
    app_password: String,

    /// Recipient mailbox [default: the sender].
    #[arg(long, env = "RECEIVER_EMAIL", value_parser = non_blank)]
    recipient: Option<String>,

    /// Ordered generation models, comma separated.
    #[arg(long, env = "SHIRA_MODELS", value_delimiter = ',', value_parser = non_blank)]
    models: Option<Vec<String>>,

    /// Candidates to try before giving up.
    #[arg(long, env = "SHIRA_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Highest library text id to sample.
    #[arg(long, env = "SHIRA_MAX_ID", default_value_t = DEFAULT_MAX_ID,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_id: u32,

    /// Word budget for the rendered poem.
    #[arg(long, env = "SHIRA_WORD_BUDGET", default_value_t = DEFAULT_WORD_BUDGET)]
    word_budget: usize,

    /// Minimum characters of cleaned text to accept a poem.
    #[arg(long, env = "SHIRA_MIN_CHARS", default_value_t = DEFAULT_MIN_CHARS)]
    min_chars: usize,

    /// Pause after a rate-limited model, in milliseconds.
    #[arg(long, env = "SHIRA_RATE_LIMIT_MS", default_value_t = 500)]
    rate_limit_ms: u64,

    /// Never sample the same id twice in one run.
    #[arg(long, env = "SHIRA_DEDUPE")]
    dedupe: bool,

    /// Outgoing mail relay (STARTTLS).
    #[arg(long, env = "SHIRA_SMTP_RELAY", default_value = DEFAULT_SMTP_RELAY)]
    smtp_relay: String,

    #[arg(long, env = "SHIRA_SMTP_PORT", default_value_t = DEFAULT_SMTP_PORT)]
    smtp_port: u16,

    /// Write the message into the outbox directory instead of sending it.
    #[arg(long, env = "SHIRA_DRY_RUN")]
    dry_run: bool,

    /// Directory used by --dry-run.
    #[arg(long, env = "SHIRA_OUTBOX", default_value = "outbox")]
    outbox: PathBuf,

    #[arg(long, env = "SHIRA_LIBRARY_URL", default_value = DEFAULT_LIBRARY_URL, hide = true)]
    library_url: String,

    #[arg(long, env = "SHIRA_GENERATION_URL", default_value = DEFAULT_GENERATION_URL, hide = true)]
    generation_url: String,

    #[arg(long, env = "SHIRA_ENCYCLOPEDIA_URL", default_value = DEFAULT_ENCYCLOPEDIA_URL, hide = true)]
    encyclopedia_url: String,
}

fn non_blank(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err("must not be blank".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

pub struct ApiKeys {
    pub gemini: String,
    pub library: String,
}

/// Everything a run needs, resolved from [`Args`].
pub struct RunConfig {
    pub settings: Settings,
    pub keys: ApiKeys,
    pub sender: Sender,
    pub recipient: String,
    /// Set for dry runs: write here instead of sending.
    pub outbox: Option<PathBuf>,
}

impl Args {
    pub fn into_config(self) -> RunConfig {
        let models = self
            .models
            .unwrap_or_else(|| DEFAULT_MODELS.iter().map(|m| m.to_string()).collect());

        let settings = Settings {
            library_url: self.library_url,
            generation_url: self.generation_url,
            encyclopedia_url: self.encyclopedia_url,
            smtp_relay: self.smtp_relay,
            smtp_port: self.smtp_port,
            models,
            word_budget: self.word_budget,
            max_id: self.max_id,
            max_attempts: self.max_attempts,
            min_chars: self.min_chars,
            sample_cap: DEFAULT_SAMPLE_CAP,
            rate_limit_pause: Duration::from_millis(self.rate_limit_ms),
            dedupe: self.dedupe,
            ..Settings::default()
        };

        RunConfig {
            settings,
            keys: ApiKeys {
                gemini: self.gemini_api_key,
                library: self.library_key,
            },
            recipient: self.recipient.unwrap_or_else(|| self.sender.clone()),
            sender: Sender {
                address: self.sender,
                app_password: self.app_password,
            },
            outbox: self.dry_run.then_some(self.outbox),
        }
    }
}
