//! Shared fixtures for the wiremock-backed integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use groupalarm::api::{AlarmScope, ClientOptions, Credential, GroupAlarmClient};
use groupalarm::config::AuthMode;
use groupalarm::connector::{ConnectorOptions, GroupAlarmConnector};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

pub const TOKEN: &str = "test-personal-access-token";

/// Client options pointing at the mock server.
pub fn client_options(server: &MockServer, timeout: Duration) -> ClientOptions {
    ClientOptions {
        api_base: format!("{}/api/v1", server.uri()),
        status_url: format!("{}/api/v1/user/status", server.uri()),
        auth_mode: AuthMode::Header,
        timeout,
    }
}

/// Connector with the default scope and a 2 second request timeout.
pub fn connector_for(server: &MockServer, token: Option<&str>) -> Arc<GroupAlarmConnector> {
    connector_with(
        client_options(server, Duration::from_secs(2)),
        token,
        AlarmScope::OwnAlarms,
    )
}

pub fn connector_with(
    options: ClientOptions,
    token: Option<&str>,
    scope: AlarmScope,
) -> Arc<GroupAlarmConnector> {
    let client = GroupAlarmClient::new(options, token.and_then(Credential::new))
        .expect("client builds");
    Arc::new(GroupAlarmConnector::new(
        Arc::new(client),
        ConnectorOptions {
            scope,
            ..ConnectorOptions::default()
        },
    ))
}

pub fn alarm_json(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    feedback: Vec<Value>,
) -> Value {
    json!({
        "id": 1,
        "event": { "id": 3, "name": "Fire alarm" },
        "message": "Building 3, second floor",
        "startDate": start.to_rfc3339(),
        "endDate": end.map(|end| end.to_rfc3339()),
        "organizationID": "org1",
        "feedback": feedback,
    })
}

pub fn user_json(id: &str) -> Value {
    json!({
        "id": id,
        "email": "jane.doe@example.org",
        "name": "Jane",
        "surname": "Doe"
    })
}

pub async fn mount_alarms(server: &MockServer, endpoint: &str, alarms: Vec<Value>) {
    let total = alarms.len();
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/{}", endpoint)))
        .and(header("Personal-Access-Token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alarms": alarms,
            "totalAlarms": total,
        })))
        .mount(server)
        .await;
}

pub async fn mount_user(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/user"))
        .and(header("Personal-Access-Token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(id)))
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub async fn mount_organization(server: &MockServer, id: &str, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/organization/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "name": name,
        })))
        .mount(server)
        .await;
}
