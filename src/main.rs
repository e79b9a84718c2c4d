//! # GroupAlarm CLI
//!
//! Host stand-in for the connector: one-shot status reads, a polling watch
//! loop, credential validation and status updates.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use groupalarm::{
    config::{AppConfig, ConfigLoader},
    connector::{AlarmAttributes, AlarmState, GroupAlarmConnector, UserLookup},
    models::UserProfile,
    scheduler::PollScheduler,
    setup, telemetry,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// GroupAlarm alarm and feedback status connector
#[derive(Parser)]
#[command(name = "groupalarm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one update and print the derived alarm state as JSON
    Status,

    /// Poll on the configured interval and print every published snapshot
    Watch,

    /// Check the configured access token and print the account it belongs to
    Validate,

    /// Push the user's availability status
    SetState {
        /// Status id as defined in the GroupAlarm organization
        state_id: i64,
    },
}

#[derive(Serialize)]
struct StatusReport {
    available: bool,
    state: AlarmState,
    latest_update: Option<DateTime<Utc>>,
    user: Option<UserProfile>,
    last_alarm: Option<AlarmAttributes>,
}

impl StatusReport {
    fn from_connector(connector: &GroupAlarmConnector) -> Self {
        Self {
            available: connector.available(),
            state: connector.alarm_state(),
            latest_update: connector.latest_update(),
            user: match connector.user() {
                UserLookup::Known(user) => Some(user),
                UserLookup::Unknown => None,
            },
            last_alarm: connector.last_alarm_attributes(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing tracing")?;

    info!(profile = %config.profile, "Loaded GroupAlarm configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }
    if config.access_token.is_none() {
        warn!("GROUPALARM_ACCESS_TOKEN is not set; every update will fail");
    }

    let connector = Arc::new(
        GroupAlarmConnector::from_config(&config).context("building GroupAlarm connector")?,
    );

    match cli.command {
        Commands::Status => status(&connector).await,
        Commands::Watch => watch(connector, &config).await,
        Commands::Validate => validate(&connector).await,
        Commands::SetState { state_id } => {
            connector.set_state(state_id).await;
            Ok(())
        }
    }
}

async fn status(connector: &GroupAlarmConnector) -> Result<()> {
    connector.update().await;
    print_report(connector)?;
    if !connector.success() {
        bail!("GroupAlarm update failed");
    }
    Ok(())
}

async fn validate(connector: &GroupAlarmConnector) -> Result<()> {
    let account = setup::validate_credentials(connector).await?;
    println!("{}", serde_json::to_string_pretty(&account)?);
    Ok(())
}

async fn watch(connector: Arc<GroupAlarmConnector>, config: &AppConfig) -> Result<()> {
    let connector = setup::connect(connector).await?;
    print_report(&connector)?;

    let mut snapshots = connector.subscribe();
    let scheduler = PollScheduler::new(connector.clone(), config.scan_interval());
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(scheduler.run(shutdown.clone()));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, stopping");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                print_report(&connector)?;
            }
        }
    }

    shutdown.cancel();
    task.await.context("joining poll scheduler")?;
    Ok(())
}

fn print_report(connector: &GroupAlarmConnector) -> Result<()> {
    let report = StatusReport::from_connector(connector);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
