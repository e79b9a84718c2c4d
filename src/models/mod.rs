//! # Data Models
//!
//! Typed views of the GroupAlarm REST API (v1) response bodies.
//!
//! The remote service emits numeric identifiers, but older payloads and test
//! fixtures use strings; [`RemoteId`] accepts both and compares textually.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod alarm;
pub mod organization;
pub mod user;

pub use alarm::{Alarm, AlarmEvent, AlarmList, Feedback, FeedbackState};
pub use organization::Organization;
pub use user::UserProfile;

/// Identifier of a remote entity (alarm, user, organization).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct RemoteId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl From<RawId> for RemoteId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Number(n) => Self(n.to_string()),
            RawId::Text(s) => Self(s),
        }
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

impl RemoteId {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RemoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for RemoteId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
