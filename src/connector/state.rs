//! Connector state snapshot and the pure queries derived from it.
//!
//! Every function here is total: missing or partial data maps to an explicit
//! unknown result instead of an error.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Alarm, AlarmList, Feedback, RemoteId, UserProfile};

/// Data published by one update cycle.
///
/// Snapshots are immutable once published; a new cycle builds a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectorState {
    pub success: bool,
    pub latest_update: Option<DateTime<Utc>>,
    pub alarms: Option<AlarmList>,
    pub user: Option<UserProfile>,
    /// Organization name of the latest alarm, resolved during the cycle.
    pub organization_name: Option<String>,
}

impl ConnectorState {
    /// Copy of this snapshot with `success` cleared; fetched data stays stale.
    pub fn failed(&self) -> Self {
        Self {
            success: false,
            ..self.clone()
        }
    }

    pub fn latest_alarm(&self) -> Option<&Alarm> {
        self.alarms.as_ref().and_then(AlarmList::latest)
    }

    /// Available means the last cycle succeeded and at least one ever did.
    pub fn available(&self) -> bool {
        self.success && self.latest_update.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmState {
    Active,
    Inactive,
    Unknown,
}

impl std::fmt::Display for AlarmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlarmState::Active => f.write_str("active"),
            AlarmState::Inactive => f.write_str("inactive"),
            AlarmState::Unknown => f.write_str("unknown"),
        }
    }
}

/// The caller's own entry in an alarm's feedback list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackLookup {
    /// Terminal response, with its optional free-text payload.
    Found(Option<String>),
    /// The caller was alarmed but has not responded yet.
    Pending,
    /// No feedback entry belongs to the caller.
    NotAlarmed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserLookup {
    Known(UserProfile),
    Unknown,
}

/// Attributes of the current/last alarm as exposed to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmAttributes {
    pub id: RemoteId,
    pub event: Option<String>,
    pub message: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub organization: Option<String>,
    pub alarmed: bool,
    pub feedback: Option<String>,
}

/// Active iff `start <= now < end`. An alarm without an end is open ended.
pub fn alarm_state_at(state: &ConnectorState, now: DateTime<Utc>) -> AlarmState {
    let Some(alarm) = state.latest_alarm() else {
        return AlarmState::Unknown;
    };

    let started = alarm.start_date <= now;
    let not_ended = alarm.end_date.is_none_or(|end| now < end);

    if started && not_ended {
        AlarmState::Active
    } else {
        AlarmState::Inactive
    }
}

/// Find the caller's feedback entry. An unknown caller is never alarmed.
pub fn user_feedback(user: Option<&UserProfile>, feedback: &[Feedback]) -> FeedbackLookup {
    let Some(user) = user else {
        return FeedbackLookup::NotAlarmed;
    };

    match feedback.iter().find(|entry| entry.user_id == user.id) {
        Some(entry) if entry.state.is_waiting() => FeedbackLookup::Pending,
        Some(entry) => FeedbackLookup::Found(entry.feedback.clone()),
        None => FeedbackLookup::NotAlarmed,
    }
}

pub fn user(state: &ConnectorState) -> UserLookup {
    match &state.user {
        Some(user) => UserLookup::Known(user.clone()),
        None => UserLookup::Unknown,
    }
}

pub fn last_alarm_attributes(state: &ConnectorState) -> Option<AlarmAttributes> {
    let alarm = state.latest_alarm()?;

    let (alarmed, feedback) = match user_feedback(state.user.as_ref(), &alarm.feedback) {
        FeedbackLookup::Found(payload) => (true, payload),
        FeedbackLookup::Pending => (true, None),
        FeedbackLookup::NotAlarmed => (false, None),
    };

    Some(AlarmAttributes {
        id: alarm.id.clone(),
        event: alarm.event_name().map(str::to_string),
        message: alarm.message.clone(),
        start_date: alarm.start_date,
        end_date: alarm.end_date,
        organization: state.organization_name.clone(),
        alarmed,
        feedback,
    })
}
