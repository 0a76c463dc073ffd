use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notification_sync::config::{CliConfig, FileConfig, LoggingLevel, SyncConfig};
use notification_sync::notifications::{
    sorted_newest_first, HttpNotificationTransport, Listener, NotificationSync, RealtimeEvent,
    Snapshot,
};

/// Follow the notifications of one team.
///
/// Reads real-time events as JSON lines from stdin, e.g.
/// `{"type":"notificationCreated","data":{"teamId":"t1","notificationId":"n1"}}`.
/// A line containing `more` loads the next page of history.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Team whose notifications are followed.
    #[clap(long)]
    pub team: String,

    /// Base URL of the notifications API.
    #[clap(long)]
    pub base_url: Option<String>,

    /// Bearer token sent with every API request.
    #[clap(long)]
    pub api_token: Option<String>,

    /// Number of notifications per history page.
    #[clap(long)]
    pub page_size: Option<u32>,

    /// Timeout in seconds for API requests.
    #[clap(long)]
    pub request_timeout_sec: Option<u64>,

    /// Default log level, overridden by the LOG_LEVEL env var.
    #[clap(long, default_value = "info")]
    pub logging_level: LoggingLevel,

    /// Path to a TOML config file. Its values override the CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Extra history pages to load right after subscribing.
    #[clap(long, default_value_t = 0)]
    pub pages: u32,
}

fn print_snapshot(team: &str, snapshot: &Snapshot) {
    println!("[{}] {} notifications", team, snapshot.len());
    for notification in sorted_newest_first(snapshot) {
        let marker = if notification.is_unread() { "*" } else { " " };
        println!(
            "  {} {} {} {}",
            marker,
            notification.created_at.format("%Y-%m-%d %H:%M"),
            notification.id,
            notification.title
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        base_url: cli_args.base_url.clone(),
        api_token: cli_args.api_token.clone(),
        page_size: cli_args.page_size,
        request_timeout_sec: cli_args.request_timeout_sec,
        logging_level: cli_args.logging_level,
    };
    let config = SyncConfig::resolve(&cli_config, file_config)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from(config.logging_level).into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    info!("Using notifications API at {}", config.base_url);
    let transport = HttpNotificationTransport::new(
        &config.base_url,
        config.api_token.clone(),
        config.request_timeout_sec,
    )
    .context("Failed to create HTTP client")?;
    let sync = NotificationSync::new(Arc::new(transport), config.page_size);

    let team = cli_args.team.clone();
    let mut counts = sync.counts();
    let counts_team = team.clone();
    tokio::spawn(async move {
        while counts.changed().await.is_ok() {
            let unread = counts
                .borrow_and_update()
                .get(&counts_team)
                .copied()
                .unwrap_or(0);
            println!("[{}] unread: {}", counts_team, unread);
        }
    });

    let listener_team = team.clone();
    let listener: Listener = Arc::new(move |snapshot: Snapshot| {
        print_snapshot(&listener_team, &snapshot);
    });
    let subscription = sync.subscribe(&team, listener).await;

    for _ in 0..cli_args.pages {
        // Errors are already reported; keep tailing with what we have.
        if sync.load_more(&team).await.is_err() {
            break;
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "more" {
                    let _ = sync.load_more(&team).await;
                    continue;
                }
                match serde_json::from_str::<RealtimeEvent>(line) {
                    Ok(event) => sync.apply_realtime_event(&event).await,
                    Err(err) => warn!("Ignoring malformed event {:?}: {}", line, err),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    subscription.unsubscribe();
    Ok(())
}
