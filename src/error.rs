//! # Error Handling
//!
//! Error taxonomy for talking to the GroupAlarm API. These errors never reach
//! the host layer directly: the connector turns them into a failed update
//! (`success == false`) or a log line.

use thiserror::Error;

/// Maximum number of characters of an upstream body kept in an error.
const BODY_SNIPPET_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// No usable access token is configured; no request was attempted.
    #[error("access token is missing; set GROUPALARM_ACCESS_TOKEN")]
    MissingCredential,

    /// Network failure or timeout from the HTTP client.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP error {status}: {}", .body.as_deref().unwrap_or("No body"))]
    HttpStatus { status: u16, body: Option<String> },

    /// The body could not be parsed into the expected shape.
    #[error("malformed response from {endpoint}: {details}")]
    MalformedResponse { endpoint: String, details: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ConnectorError {
    /// Build an [`ConnectorError::HttpStatus`] with the body truncated for logging.
    pub fn http_status(status: u16, body: Option<String>) -> Self {
        let body = body.filter(|b| !b.is_empty()).map(|b| {
            if b.chars().count() > BODY_SNIPPET_LIMIT {
                let truncated: String = b.chars().take(BODY_SNIPPET_LIMIT).collect();
                format!("{}...", truncated)
            } else {
                b
            }
        });
        ConnectorError::HttpStatus { status, body }
    }

    /// True when the failure came from the transport layer rather than from
    /// the content of a response.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ConnectorError::Transport(_) | ConnectorError::HttpStatus { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnectorError::Transport(err) if err.is_timeout())
    }

    /// Short label used for metrics and structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectorError::MissingCredential => "missing_credential",
            ConnectorError::Transport(err) if err.is_timeout() => "timeout",
            ConnectorError::Transport(_) => "transport",
            ConnectorError::HttpStatus { .. } => "http_status",
            ConnectorError::MalformedResponse { .. } => "malformed_response",
            ConnectorError::InvalidUrl(_) => "invalid_url",
        }
    }
}
