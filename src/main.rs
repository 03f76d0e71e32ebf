use crate::config::{cli::Command, Config};
use crate::domain::notify::Notifier;
use crate::error::Result;
use crate::infrastructure::{ChromiumLauncher, ConsoleNotifier, FileStateStore, TelegramClient};
use crate::services::watch_service::{PollState, WatchService};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};

mod config;
mod domain;
mod error;
mod infrastructure;
mod services;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::new()?;

    let level = config.args.log_level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    config.ensure_directories()?;

    let notifier: Arc<dyn Notifier> = match (
        config.args.dry_run,
        &config.args.telegram_token,
        &config.args.telegram_chat_id,
    ) {
        (true, _, _) => {
            info!("Dry run: messages are only logged");
            Arc::new(ConsoleNotifier)
        }
        (false, Some(token), Some(chat_id)) => Arc::new(TelegramClient::new(
            config.http_client.clone(),
            token.clone(),
            chat_id.clone(),
        )),
        _ => {
            warn!("TELEGRAM_TOKEN or TELEGRAM_CHAT_ID missing: messages are only logged");
            Arc::new(ConsoleNotifier)
        }
    };

    let store = FileStateStore::new(config.args.state_file.clone());
    info!("Last record kept in {}", store.path().display());

    let service = WatchService::new(
        config.dashboard.clone(),
        Arc::new(ChromiumLauncher),
        Arc::new(store),
        notifier,
    );

    match config.args.command {
        None => {
            let outcome = service.poll(&mut PollState::default(), false).await?;
            info!("Automatic check finished: {:?}", outcome.decision);
        }
        Some(Command::Check) => {
            let outcome = service.poll(&mut PollState::default(), true).await?;
            info!("Manual check finished: {:?}", outcome.decision);
        }
        Some(Command::Report) => {
            let report = service.report().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(Command::Watch { interval_minutes }) => {
            info!("Polling every {} minute(s), Ctrl-C to stop", interval_minutes);
            service
                .watch_until(Duration::from_secs(interval_minutes * 60), async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Cannot listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        }
    }

    Ok(())
}
