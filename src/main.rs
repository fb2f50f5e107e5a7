use anyhow::{Context, Result};
use log::{error, info, warn};
use std::env;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use chatguard::prelude::*;
use chatguard::platforms::console::{spawn_event_reader, ConsoleConnection};

/// Bound on queued inbound events before the reader waits for the pipeline
const EVENT_QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables and initialize logging
    dotenv::dotenv().ok();
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("Starting chatguard v{}", env!("CARGO_PKG_VERSION"));

    // =================================================================
    // CONFIGURATION
    // =================================================================

    let config = match env::var("MODERATION_CONFIG") {
        Ok(path) => ModerationConfig::from_file(&path)
            .await
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        Err(_) => ModerationConfig::from_env()?,
    };

    if let Err(e) = config.validate() {
        error!("Invalid moderation configuration: {:#}", e);
        return Err(e);
    }

    if !config.enabled {
        warn!("Moderation is disabled in configuration; messages will be ignored");
    }

    info!(
        "Watching channels {:?} (ids {:?}), cooldown {}s, log channel '{}'",
        config.rule_channel_names,
        config.rule_channel_ids,
        config.cooldown_seconds,
        config.log_channel_name
    );

    // =================================================================
    // PIPELINE WIRING
    // =================================================================

    let transport = Arc::new(ConsoleConnection::new(tokio::io::stdout()));
    let bot = ModerationBot::new(config, transport)?;

    let (sender, receiver) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let reader = spawn_event_reader(BufReader::new(tokio::io::stdin()), sender);

    // =================================================================
    // MAIN LOOP
    // =================================================================

    tokio::select! {
        processed = bot.run(receiver) => {
            info!("Input closed after {} events", processed);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            // stdin reads block, so the reader has to be cancelled
            reader.abort();
        }
    }

    match reader.await {
        Ok(Ok(forwarded)) => info!("Event reader forwarded {} events", forwarded),
        Ok(Err(e)) => error!("Event reader failed: {:#}", e),
        Err(e) if e.is_cancelled() => {}
        Err(e) => error!("Event reader task panicked: {}", e),
    }

    info!("Final stats: {}", bot.stats().await);
    info!("chatguard stopped");
    Ok(())
}
