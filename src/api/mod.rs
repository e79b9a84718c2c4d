//! GroupAlarm API access
//!
//! The [`AlarmApi`] trait is the seam between the connector and the remote
//! service. [`GroupAlarmClient`] implements it over HTTP; tests substitute
//! their own implementations.

use std::fmt;

use async_trait::async_trait;

use crate::error::ConnectorError;
use crate::models::{AlarmList, Organization, RemoteId, UserProfile};

pub mod client;

pub use client::{ClientOptions, GroupAlarmClient, TOKEN_HEADER};

/// Which alarm list endpoint to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmScope {
    /// Alarms the user was alarmed for (`/alarms/alarmed`).
    OwnAlarms,
    /// All alarms visible to the user (`/alarms/user`).
    AllAlarms,
}

impl AlarmScope {
    pub fn from_only_own(only_own_alarms: bool) -> Self {
        if only_own_alarms {
            AlarmScope::OwnAlarms
        } else {
            AlarmScope::AllAlarms
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            AlarmScope::OwnAlarms => "alarms/alarmed",
            AlarmScope::AllAlarms => "alarms/user",
        }
    }
}

/// Personal access token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for an empty or whitespace-only token.
    pub fn new<S: Into<String>>(token: S) -> Option<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

#[async_trait]
pub trait AlarmApi: Send + Sync {
    /// Whether a credential is configured. Without one every call fails with
    /// [`ConnectorError::MissingCredential`] before touching the network.
    fn has_credential(&self) -> bool;

    /// Fetch the alarm list for the authenticated user.
    async fn alarms(&self, scope: AlarmScope) -> Result<AlarmList, ConnectorError>;

    /// Fetch the profile owning the credential.
    async fn user(&self) -> Result<UserProfile, ConnectorError>;

    /// Resolve an organization by id.
    async fn organization(&self, id: &RemoteId) -> Result<Organization, ConnectorError>;

    /// Push the user's availability status.
    async fn set_status(&self, state_id: i64) -> Result<(), ConnectorError>;
}
