mod config;
mod discover;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use shira_ai::CommentaryGenerator;
use shira_library::{EncyclopediaClient, LibraryClient, PortraitFinder};
use shira_mail::{Deliver, Outbox, SmtpDeliver};
use tracing::{info, warn};

use config::Args;
use discover::{Discovery, Outcome};

/// Exit status when the attempt budget runs out without a usable poem.
const EXIT_EXHAUSTED: u8 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    info!("shira v{}", env!("CARGO_PKG_VERSION"));

    let config = Args::parse().into_config();
    let settings = &config.settings;

    let library = Arc::new(LibraryClient::new(
        &settings.library_url,
        &config.keys.library,
        &settings.timeouts,
    ));
    let encyclopedia =
        EncyclopediaClient::new(&settings.encyclopedia_url, settings.timeouts.encyclopedia)
            .context("building encyclopedia client")?;
    let portraits = PortraitFinder::new(Arc::clone(&library), encyclopedia);
    let commentary = CommentaryGenerator::gemini(settings, &config.keys.gemini)
        .context("building generation client")?;
    let transport: Box<dyn Deliver> = match &config.outbox {
        Some(dir) => {
            info!(outbox = %dir.display(), "dry run, message will not be sent");
            Box::new(Outbox::new(dir))
        }
        None => Box::new(
            SmtpDeliver::new(
                &settings.smtp_relay,
                settings.smtp_port,
                &config.sender,
                settings.timeouts.smtp,
            )
            .context("building SMTP transport")?,
        ),
    };

    info!(
        models = ?commentary.backend_names(),
        max_attempts = settings.max_attempts,
        max_id = settings.max_id,
        "starting discovery"
    );

    let discovery = Discovery {
        settings,
        texts: library.as_ref(),
        portraits: &portraits,
        commentary: &commentary,
        transport: transport.as_ref(),
        sender: &config.sender,
        recipient: &config.recipient,
    };
    let stats = discovery.run(&mut rand::thread_rng()).await?;

    match stats.outcome {
        Outcome::Delivered { id, title } => {
            info!(
                id,
                title = %title,
                attempts = stats.attempts,
                rejected = ?stats.rejections,
                elapsed_secs = stats.elapsed_secs,
                "poem delivered"
            );
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Exhausted => {
            warn!(
                attempts = stats.attempts,
                rejected = ?stats.rejections,
                elapsed_secs = stats.elapsed_secs,
                "gave up without a poem"
            );
            Ok(ExitCode::from(EXIT_EXHAUSTED))
        }
    }
}
