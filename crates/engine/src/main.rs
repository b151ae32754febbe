//! Playtime tracker - console host entry point.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playtime_engine::infrastructure::{
    config::TrackerConfig,
    console_host::{ConsoleCommand, ConsoleHost},
};
use playtime_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playtime_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting playtime tracker");

    let config = TrackerConfig::from_env()?;
    tracing::info!(
        db_path = %config.db_path.display(),
        session_cap = %config.session_cap,
        shutdown_grace_secs = config.shutdown_grace.as_secs(),
        "Configuration loaded"
    );

    let host = Arc::new(ConsoleHost::new());
    let app = App::load(&config, host.clone())
        .await
        .context("failed to open playtime database")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring input line");
                continue;
            }
        };

        if !run_command(&app, &host, command).await? {
            break;
        }
    }

    app.unload().await;
    Ok(())
}

/// Apply one console command. Returns `false` when the tracker should stop.
async fn run_command(
    app: &App,
    host: &ConsoleHost,
    command: ConsoleCommand,
) -> anyhow::Result<bool> {
    match command {
        ConsoleCommand::Connect(player) => {
            let slot = player.slot;
            host.seat(player);
            app.client_put_in_server(slot)
                .await
                .context("lifecycle dispatch stopped")?;
        }
        ConsoleCommand::Disconnect(slot) => {
            app.client_disconnect(slot)
                .await
                .context("lifecycle dispatch stopped")?;
            host.vacate(slot);
        }
        ConsoleCommand::Playtime(slot) => match app.lifecycle.play_minutes(slot) {
            Some(minutes) => println!("slot {slot}: {minutes}"),
            None => println!("slot {slot}: no open session"),
        },
        ConsoleCommand::Stats(user_id) => match app.records.get(user_id).await {
            Ok(Some(record)) => println!("{}", serde_json::to_string(&record)?),
            Ok(None) => println!("user {user_id}: no record"),
            Err(e) => tracing::error!(user_id = %user_id, error = %e, "Failed to read record"),
        },
        ConsoleCommand::Quit => return Ok(false),
    }
    Ok(true)
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
