mod balance;
mod commands;
mod commentary;
mod controller;
mod elo;
mod error;
mod events;
mod json_block;
mod log_tail;
mod match_flow;
mod match_state;
mod phrases;
mod rcon;
mod records;
mod settings;
mod storage;
mod tactics;

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub use controller::{Controller, LineOutcome};
pub use error::AppError;
pub use settings::RuntimeSettings;

use log_tail::LogTail;
use rcon::{RconClient, SharedRcon};
use records::{PlayerRecords, RecordPaths};
use settings::{load_settings, DEFAULT_SETTINGS_FILE};

/// Live commentary and match control for a CS2 server, driven by its log.
#[derive(Parser, Debug)]
#[command(name = "matchcaster", about = "CS2 server log commentator and match controller")]
struct Cli {
    /// YAML settings file. A missing file means compiled defaults.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Server log directory (overrides `log_dir` from the settings file).
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Runs until the match result is recorded. Only start-up failures are
/// returned; everything after the log is found is logged and survived.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing();

    let mut settings = load_settings(&cli.config)?;
    if let Some(log_dir) = cli.log_dir {
        settings.log_dir = log_dir;
    }
    tracing::info!(
        config_source = %settings.config_source,
        max_rounds = settings.max_rounds,
        taunt_chance = settings.taunt_chance,
        silence_seconds = settings.silence_seconds,
        idle_comment_seconds = settings.idle_comment_seconds,
        "matchcaster starting"
    );

    let records = PlayerRecords::load(RecordPaths::from(&settings))?;
    let rcon = SharedRcon::new(RconClient::new(
        settings.rcon_address(),
        settings.rcon_password.clone(),
        Duration::from_millis(settings.rcon_timeout_millis),
    ));
    let mut controller = Controller::new(
        settings.clone(),
        records,
        Box::new(rcon.clone()),
        Box::new(rcon),
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(AppError::Runtime)?;
    runtime.block_on(follow_server_log(&settings, &mut controller))
}

async fn follow_server_log(
    settings: &RuntimeSettings,
    controller: &mut Controller,
) -> Result<(), AppError> {
    let poll_interval = Duration::from_millis(settings.poll_interval_millis);
    let mut tail = LogTail::new(settings.log_dir.clone(), poll_interval);
    tail.wait_for_log(Duration::from_secs(settings.log_wait_seconds))
        .await?;

    loop {
        match tail.next_line().await {
            Ok(Some(line)) => {
                if controller.handle_line(&line) == LineOutcome::MatchFinished {
                    tracing::info!("Match recorded, shutting down");
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(error = %error, "Failed to read server log");
                tokio::time::sleep(poll_interval).await;
            }
        }
        controller.tick();
    }
}
