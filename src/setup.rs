//! Account setup helpers used by the host layer.
//!
//! [`validate_credentials`] backs the configuration step: it proves a token
//! works and derives the unique account id. [`connect`] performs the initial
//! update before a scheduler takes over.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::connector::{GroupAlarmConnector, UserLookup};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot connect to GroupAlarm with the provided access token")]
    CannotConnect,
    #[error("GroupAlarm is not ready: the initial update failed")]
    NotReady,
    #[error("GroupAlarm returned no user profile")]
    MissingUser,
}

/// Identity of a configured account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    /// Unique id of the account (the user's email).
    pub unique_id: String,
    pub title: String,
}

/// Run one update with the connector's credential and return the account it
/// belongs to.
pub async fn validate_credentials(
    connector: &GroupAlarmConnector,
) -> Result<AccountInfo, SetupError> {
    connector.update().await;
    if !connector.success() {
        warn!("GroupAlarm credential validation failed");
        return Err(SetupError::CannotConnect);
    }

    match connector.user() {
        UserLookup::Known(user) => {
            let title = match user.display_name() {
                name if name.is_empty() => user.email.clone(),
                name => name,
            };
            info!(account = %user.email, "GroupAlarm credential validated");
            Ok(AccountInfo {
                unique_id: user.email,
                title,
            })
        }
        UserLookup::Unknown => Err(SetupError::MissingUser),
    }
}

/// Perform the initial update; fail with [`SetupError::NotReady`] when it is
/// unsuccessful so the host can retry setup later.
pub async fn connect(
    connector: Arc<GroupAlarmConnector>,
) -> Result<Arc<GroupAlarmConnector>, SetupError> {
    connector.update().await;
    if !connector.success() {
        return Err(SetupError::NotReady);
    }
    Ok(connector)
}
