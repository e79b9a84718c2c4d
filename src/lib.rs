//! # GroupAlarm Connector Library
//!
//! Polls the GroupAlarm service for the user's current/last alarm and feedback
//! status and exposes derived state (active/inactive/unknown, organization,
//! timestamps, own feedback) through read-only accessors.

pub mod api;
pub mod config;
pub mod connector;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod setup;
pub mod telemetry;

pub use connector::GroupAlarmConnector;
pub use error::ConnectorError;
