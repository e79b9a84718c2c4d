//! # Poll Scheduler
//!
//! Background task that drives [`GroupAlarmConnector::update`] once at start
//! and then on a fixed interval, with on-demand refreshes and cooperative
//! shutdown. Readers are
//! notified through [`GroupAlarmConnector::subscribe`] whenever a cycle
//! publishes a new snapshot.

use std::sync::Arc;
use std::time::Duration;

use metrics::histogram;
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::connector::GroupAlarmConnector;

/// Fixed-interval driver for a connector.
pub struct PollScheduler {
    connector: Arc<GroupAlarmConnector>,
    interval: Duration,
    refresh: Arc<Notify>,
}

/// Requests an update outside the regular interval.
#[derive(Clone)]
pub struct RefreshHandle {
    refresh: Arc<Notify>,
}

impl RefreshHandle {
    /// Wake the scheduler for an immediate update. Requests made while an
    /// update is running collapse into one follow-up cycle.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }
}

impl PollScheduler {
    pub fn new(connector: Arc<GroupAlarmConnector>, interval: Duration) -> Self {
        Self {
            connector,
            interval,
            refresh: Arc::new(Notify::new()),
        }
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle {
            refresh: self.refresh.clone(),
        }
    }

    /// Run the poll loop until the provided shutdown token fires.
    #[instrument(skip_all, fields(interval_secs = self.interval.as_secs()))]
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Starting GroupAlarm poll scheduler");

        // The first tick completes immediately and performs the initial refresh.
        // On-demand refreshes do not reset the schedule.
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("GroupAlarm poll scheduler shutdown requested");
                    break;
                }
                _ = self.refresh.notified() => {
                    debug!("On-demand refresh requested");
                    self.tick().await;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        info!("GroupAlarm poll scheduler stopped");
    }

    async fn tick(&self) {
        let tick_started = Instant::now();
        self.connector.update().await;
        histogram!("groupalarm_scheduler_tick_duration_ms")
            .record(tick_started.elapsed().as_secs_f64() * 1_000.0);

        if !self.connector.success() {
            warn!("GroupAlarm update failed; entities unavailable until the next successful cycle");
        }
    }
}
