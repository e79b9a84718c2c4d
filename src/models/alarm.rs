use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RemoteId;

/// Wire tag of a feedback entry that has not been answered yet.
pub const WAITING: &str = "WAITING";

/// Body of `GET /alarms/alarmed` and `GET /alarms/user`.
///
/// Order is the service's recency order: index 0 is the current/last alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmList {
    pub alarms: Vec<Alarm>,
}

impl AlarmList {
    /// The current (or most recent) alarm, if any.
    pub fn latest(&self) -> Option<&Alarm> {
        self.alarms.first()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: RemoteId,
    #[serde(default)]
    pub event: Option<AlarmEvent>,
    #[serde(default)]
    pub message: Option<String>,
    pub start_date: DateTime<Utc>,
    /// Missing while the alarm has not been closed.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "organizationID")]
    pub organization_id: RemoteId,
    #[serde(default)]
    pub feedback: Vec<Feedback>,
}

impl Alarm {
    pub fn event_name(&self) -> Option<&str> {
        self.event.as_ref().map(|event| event.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmEvent {
    #[serde(default)]
    pub id: Option<RemoteId>,
    pub name: String,
}

/// One alarmed user's response to an alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "userID")]
    pub user_id: RemoteId,
    pub state: FeedbackState,
    /// Free-text payload; only meaningful once `state` is terminal.
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeedbackState {
    Waiting,
    /// Any terminal response tag reported by the service.
    Responded(String),
}

impl FeedbackState {
    pub fn is_waiting(&self) -> bool {
        matches!(self, FeedbackState::Waiting)
    }
}

impl From<String> for FeedbackState {
    fn from(value: String) -> Self {
        if value == WAITING {
            FeedbackState::Waiting
        } else {
            FeedbackState::Responded(value)
        }
    }
}

impl From<FeedbackState> for String {
    fn from(state: FeedbackState) -> Self {
        match state {
            FeedbackState::Waiting => WAITING.to_string(),
            FeedbackState::Responded(tag) => tag,
        }
    }
}
