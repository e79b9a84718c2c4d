//! # GroupAlarm Connector
//!
//! Fetches the alarm list and user profile, publishes them as one immutable
//! [`ConnectorState`] snapshot per cycle and answers read-only queries over the
//! latest snapshot.
//!
//! `update()` and `set_state()` never return errors: failures are logged and
//! surface to the host only through [`GroupAlarmConnector::success`].

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use lru::LruCache;
use metrics::{counter, histogram};
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::api::{AlarmApi, AlarmScope, GroupAlarmClient};
use crate::config::AppConfig;
use crate::error::ConnectorError;
use crate::models::{Feedback, RemoteId};

pub mod state;

pub use state::{
    AlarmAttributes, AlarmState, ConnectorState, FeedbackLookup, UserLookup, alarm_state_at,
};

/// Default number of organization names kept in memory.
const DEFAULT_ORGANIZATION_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(32).unwrap();

/// Tuning knobs for [`GroupAlarmConnector`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectorOptions {
    pub scope: AlarmScope,
    pub organization_cache_size: NonZeroUsize,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            scope: AlarmScope::OwnAlarms,
            organization_cache_size: DEFAULT_ORGANIZATION_CACHE_SIZE,
        }
    }
}

impl ConnectorOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            scope: AlarmScope::from_only_own(config.only_own_alarms),
            organization_cache_size: NonZeroUsize::new(config.organization_cache_size)
                .unwrap_or(DEFAULT_ORGANIZATION_CACHE_SIZE),
        }
    }
}

pub struct GroupAlarmConnector {
    api: Arc<dyn AlarmApi>,
    scope: AlarmScope,
    state: watch::Sender<Arc<ConnectorState>>,
    organizations: Mutex<LruCache<RemoteId, String>>,
    /// Serializes update cycles so snapshots are published in order.
    update_lock: Mutex<()>,
}

impl GroupAlarmConnector {
    pub fn new(api: Arc<dyn AlarmApi>, options: ConnectorOptions) -> Self {
        let (state, _) = watch::channel(Arc::new(ConnectorState::default()));
        Self {
            api,
            scope: options.scope,
            state,
            organizations: Mutex::new(LruCache::new(options.organization_cache_size)),
            update_lock: Mutex::new(()),
        }
    }

    /// Build a connector talking HTTP to the configured GroupAlarm endpoints.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConnectorError> {
        let client = GroupAlarmClient::from_config(config)?;
        Ok(Self::new(
            Arc::new(client),
            ConnectorOptions::from_config(config),
        ))
    }

    /// Run one update cycle: fetch alarms and user, then publish a new snapshot.
    #[instrument(skip_all, fields(scope = self.scope.path()))]
    pub async fn update(&self) {
        let _cycle = self.update_lock.lock().await;
        let started = Instant::now();
        let timestamp = Utc::now();
        let previous = self.snapshot();

        if !self.api.has_credential() {
            error!("No update possible: GroupAlarm access token is missing");
            counter!("groupalarm_updates_total", "outcome" => "missing_credential").increment(1);
            self.publish(previous.failed());
            return;
        }

        let (alarms, user) = tokio::join!(self.api.alarms(self.scope), self.api.user());

        let next = match (alarms, user) {
            (Ok(alarms), Ok(user)) => {
                let organization_name = match alarms.latest() {
                    Some(alarm) => self.organization_name(&alarm.organization_id).await,
                    None => None,
                };
                counter!("groupalarm_updates_total", "outcome" => "success").increment(1);
                ConnectorState {
                    success: true,
                    latest_update: Some(timestamp),
                    alarms: Some(alarms),
                    user: Some(user),
                    organization_name,
                }
            }
            (alarms, user) => {
                if let Err(err) = &alarms {
                    log_fetch_failure("alarms", err);
                }
                if let Err(err) = &user {
                    log_fetch_failure("user", err);
                }
                counter!("groupalarm_updates_total", "outcome" => "failure").increment(1);
                previous.failed()
            }
        };

        histogram!("groupalarm_update_duration_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
        debug!(
            success = next.success,
            latest_update = ?next.latest_update,
            "Values updated"
        );

        self.publish(next);
    }

    /// Push the user's availability status. Best effort, never retried.
    #[instrument(skip(self))]
    pub async fn set_state(&self, state_id: i64) {
        if !self.api.has_credential() {
            error!("State can not be set: GroupAlarm access token is missing");
            return;
        }

        match self.api.set_status(state_id).await {
            Ok(()) => {
                counter!("groupalarm_set_state_total", "outcome" => "success").increment(1);
                info!("GroupAlarm status updated");
            }
            Err(err) => {
                counter!("groupalarm_set_state_total", "outcome" => "failure").increment(1);
                error!(error = %err, kind = err.kind(), "Error while setting the state");
            }
        }
    }

    /// Resolve an organization's display name, consulting the cache first.
    ///
    /// Failures are logged and yield `None`; they are not cached.
    pub async fn organization_name(&self, id: &RemoteId) -> Option<String> {
        if let Some(name) = self.organizations.lock().await.get(id) {
            return Some(name.clone());
        }

        match self.api.organization(id).await {
            Ok(organization) => {
                self.organizations
                    .lock()
                    .await
                    .put(id.clone(), organization.name.clone());
                Some(organization.name)
            }
            Err(err) => {
                warn!(
                    organization_id = %id,
                    error = %err,
                    kind = err.kind(),
                    "Failed to resolve organization name"
                );
                None
            }
        }
    }

    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<ConnectorState> {
        self.state.borrow().clone()
    }

    /// Receiver woken whenever a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConnectorState>> {
        self.state.subscribe()
    }

    fn publish(&self, next: ConnectorState) {
        self.state.send_replace(Arc::new(next));
    }

    pub fn success(&self) -> bool {
        self.snapshot().success
    }

    pub fn latest_update(&self) -> Option<DateTime<Utc>> {
        self.snapshot().latest_update
    }

    pub fn available(&self) -> bool {
        self.snapshot().available()
    }

    pub fn alarm_state(&self) -> AlarmState {
        alarm_state_at(&self.snapshot(), Utc::now())
    }

    pub fn last_alarm_attributes(&self) -> Option<AlarmAttributes> {
        state::last_alarm_attributes(&self.snapshot())
    }

    pub fn user(&self) -> UserLookup {
        state::user(&self.snapshot())
    }

    /// Look up the caller's entry in `feedback` using the last fetched profile.
    pub fn user_feedback(&self, feedback: &[Feedback]) -> FeedbackLookup {
        state::user_feedback(self.snapshot().user.as_ref(), feedback)
    }

    pub fn alarm_start(&self) -> Option<DateTime<Utc>> {
        self.snapshot().latest_alarm().map(|alarm| alarm.start_date)
    }

    pub fn alarm_end(&self) -> Option<DateTime<Utc>> {
        self.snapshot().latest_alarm().and_then(|alarm| alarm.end_date)
    }

    pub fn alarm_event(&self) -> Option<String> {
        self.snapshot()
            .latest_alarm()
            .and_then(|alarm| alarm.event_name().map(str::to_string))
    }

    pub fn alarm_message(&self) -> Option<String> {
        self.snapshot()
            .latest_alarm()
            .and_then(|alarm| alarm.message.clone())
    }

    pub fn alarm_organization(&self) -> Option<String> {
        let snapshot = self.snapshot();
        snapshot.latest_alarm()?;
        snapshot.organization_name.clone()
    }

    pub fn user_alarmed(&self) -> Option<bool> {
        self.last_alarm_attributes()
            .map(|attributes| attributes.alarmed)
    }

    pub fn alarm_feedback(&self) -> Option<String> {
        self.last_alarm_attributes()
            .and_then(|attributes| attributes.feedback)
    }
}

fn log_fetch_failure(endpoint: &'static str, err: &ConnectorError) {
    if err.is_transport() {
        error!(endpoint, error = %err, kind = err.kind(), "GroupAlarm request failed");
    } else {
        error!(endpoint, error = %err, kind = err.kind(), "GroupAlarm response rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Alarm, AlarmList, FeedbackState, Organization, UserProfile};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory API with call counters.
    #[derive(Default)]
    struct FakeApi {
        credential: bool,
        fail_alarms: bool,
        fail_organization: bool,
        alarms: Vec<Alarm>,
        alarm_calls: AtomicUsize,
        user_calls: AtomicUsize,
        organization_calls: AtomicUsize,
        status_calls: AtomicUsize,
    }

    impl FakeApi {
        fn with_alarms(alarms: Vec<Alarm>) -> Self {
            Self {
                credential: true,
                alarms,
                ..Self::default()
            }
        }

        fn total_calls(&self) -> usize {
            self.alarm_calls.load(Ordering::SeqCst)
                + self.user_calls.load(Ordering::SeqCst)
                + self.organization_calls.load(Ordering::SeqCst)
                + self.status_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AlarmApi for FakeApi {
        fn has_credential(&self) -> bool {
            self.credential
        }

        async fn alarms(&self, _scope: AlarmScope) -> Result<AlarmList, ConnectorError> {
            self.alarm_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_alarms {
                return Err(ConnectorError::http_status(503, None));
            }
            Ok(AlarmList {
                alarms: self.alarms.clone(),
            })
        }

        async fn user(&self) -> Result<UserProfile, ConnectorError> {
            self.user_calls.fetch_add(1, Ordering::SeqCst);
            Ok(UserProfile {
                id: RemoteId::from("me"),
                email: "me@example.org".to_string(),
                name: "Jane".to_string(),
                surname: "Doe".to_string(),
            })
        }

        async fn organization(&self, id: &RemoteId) -> Result<Organization, ConnectorError> {
            self.organization_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_organization {
                return Err(ConnectorError::http_status(404, None));
            }
            Ok(Organization {
                id: id.clone(),
                name: format!("Org {}", id),
            })
        }

        async fn set_status(&self, _state_id: i64) -> Result<(), ConnectorError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn running_alarm(state: &str) -> Alarm {
        let now = Utc::now();
        Alarm {
            id: RemoteId::from(1),
            event: None,
            message: Some("Flood".to_string()),
            start_date: now - Duration::minutes(5),
            end_date: Some(now + Duration::hours(1)),
            organization_id: RemoteId::from("org1"),
            feedback: vec![Feedback {
                user_id: RemoteId::from("me"),
                state: FeedbackState::from(state.to_string()),
                feedback: Some("Coming".to_string()),
            }],
        }
    }

    fn connector(api: Arc<FakeApi>) -> GroupAlarmConnector {
        GroupAlarmConnector::new(api, ConnectorOptions::default())
    }

    #[tokio::test]
    async fn starts_empty_and_unknown() {
        let connector = connector(Arc::new(FakeApi::with_alarms(vec![])));

        assert!(!connector.success());
        assert!(!connector.available());
        assert_eq!(connector.latest_update(), None);
        assert_eq!(connector.alarm_state(), AlarmState::Unknown);
        assert_eq!(connector.user(), UserLookup::Unknown);
        assert!(connector.last_alarm_attributes().is_none());
        assert_eq!(connector.user_alarmed(), None);
    }

    #[tokio::test]
    async fn missing_credential_makes_no_calls() {
        let api = Arc::new(FakeApi::default());
        let connector = connector(api.clone());

        connector.update().await;
        connector.set_state(5).await;

        assert!(!connector.success());
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn successful_update_publishes_snapshot() {
        let api = Arc::new(FakeApi::with_alarms(vec![running_alarm("POSITIVE")]));
        let connector = connector(api.clone());

        connector.update().await;

        assert!(connector.success());
        assert!(connector.available());
        assert_eq!(connector.alarm_state(), AlarmState::Active);
        assert_eq!(connector.alarm_organization().as_deref(), Some("Org org1"));
        assert_eq!(connector.user_alarmed(), Some(true));
        assert_eq!(connector.alarm_feedback().as_deref(), Some("Coming"));
        assert_eq!(connector.alarm_message().as_deref(), Some("Flood"));
        assert!(connector.alarm_start().is_some());
        assert!(connector.alarm_end().is_some());
        assert_eq!(api.alarm_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.user_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn accessors_are_idempotent_between_updates() {
        let api = Arc::new(FakeApi::with_alarms(vec![running_alarm("WAITING")]));
        let connector = connector(api);
        connector.update().await;

        assert_eq!(connector.last_alarm_attributes(), connector.last_alarm_attributes());
        assert_eq!(connector.user(), connector.user());
        assert_eq!(connector.alarm_state(), connector.alarm_state());
        assert_eq!(connector.alarm_feedback(), None);
    }

    #[tokio::test]
    async fn failed_update_keeps_previous_data() {
        let api = Arc::new(FakeApi::with_alarms(vec![running_alarm("WAITING")]));
        let connector = connector(api);
        connector.update().await;
        let first = connector.snapshot();

        let failing = Arc::new(FakeApi {
            fail_alarms: true,
            ..FakeApi::with_alarms(vec![])
        });
        // Reuse the published state with a failing transport.
        let connector = GroupAlarmConnector {
            api: failing.clone(),
            ..connector
        };
        connector.update().await;

        let second = connector.snapshot();
        assert!(!second.success);
        assert_eq!(second.latest_update, first.latest_update);
        assert_eq!(second.alarms, first.alarms);
        assert_eq!(failing.user_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn organization_names_are_cached() {
        let api = Arc::new(FakeApi::with_alarms(vec![running_alarm("WAITING")]));
        let connector = connector(api.clone());

        connector.update().await;
        connector.update().await;

        assert_eq!(api.organization_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            connector
                .organization_name(&RemoteId::from("org2"))
                .await
                .as_deref(),
            Some("Org org2")
        );
        assert_eq!(api.organization_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn organization_failure_degrades_to_none() {
        let api = Arc::new(FakeApi {
            fail_organization: true,
            ..FakeApi::with_alarms(vec![running_alarm("WAITING")])
        });
        let connector = connector(api.clone());

        connector.update().await;
        connector.update().await;

        assert!(connector.success());
        assert_eq!(connector.alarm_organization(), None);
        // Failures are retried on the next cycle.
        assert_eq!(api.organization_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn subscribers_see_each_published_snapshot() {
        let api = Arc::new(FakeApi::with_alarms(vec![]));
        let connector = connector(api);
        let mut receiver = connector.subscribe();

        connector.update().await;

        assert!(receiver.has_changed().unwrap());
        let snapshot = receiver.borrow_and_update().clone();
        assert!(snapshot.success);
        assert_eq!(snapshot.alarms.as_ref().map(AlarmList::is_empty), Some(true));
        assert_eq!(connector.alarm_organization(), None);
    }

    #[tokio::test]
    async fn set_state_calls_api_once() {
        let api = Arc::new(FakeApi::with_alarms(vec![]));
        let connector = connector(api.clone());

        connector.set_state(5).await;

        assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.alarm_calls.load(Ordering::SeqCst), 0);
    }
}
