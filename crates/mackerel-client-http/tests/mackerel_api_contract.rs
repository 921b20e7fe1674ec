//! Architectural Contract Test: Mackerel API Client
//!
//! This test verifies the HTTP client against a mock Mackerel API.
//!
//! Constraints verified:
//! - Every call sends the API key in `X-Api-Key` and hits the v0 endpoint
//! - 404 surfaces as not-found, other failures as API errors
//! - Remote error messages are carried verbatim
//! - Each client call makes exactly one request (no retries)
//! - Names and ids stay inside their own path segment
//!
//! If this test fails, lifecycle code cannot trust the client's errors.

use mackerel_client_http::HttpClient;
use mackerel_provider_core::error::ClientError;
use mackerel_provider_core::traits::{
    ClientConfig, MackerelClient, NotificationGroup, NotificationGroupMonitor, ServiceParam,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-api-key";

fn client(server: &MockServer) -> HttpClient {
    HttpClient::new(&ClientConfig::new(API_KEY).with_api_base(server.uri())).unwrap()
}

#[tokio::test]
async fn find_services_sends_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v0/services"))
        .and(header("X-Api-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "services": [
                { "name": "web", "memo": "frontend", "roles": ["app", "db"] },
                { "name": "batch", "memo": "", "roles": [] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let services = client(&server).find_services().await.unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0].name, "web");
    assert_eq!(services[0].roles, vec!["app", "db"]);
}

#[tokio::test]
async fn find_service_missing_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v0/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "services": [] })))
        .mount(&server)
        .await;

    let err = client(&server).find_service("web").await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

#[tokio::test]
async fn create_service_posts_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/services"))
        .and(body_json(json!({ "name": "web", "memo": "frontend" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "web", "memo": "frontend", "roles": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let param = ServiceParam {
        name: "web".to_string(),
        memo: "frontend".to_string(),
    };
    let service = client(&server).create_service(&param).await.unwrap();
    assert_eq!(service.memo, "frontend");
}

#[tokio::test]
async fn delete_of_missing_object_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v0/services/web"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "message": "Service not found" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).delete_service("web").await.unwrap_err();
    assert_eq!(err, ClientError::NotFound("Service not found".to_string()));
}

#[tokio::test]
async fn path_segments_are_percent_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v0/services/web/roles/app%2F..%2Fdb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "app/../db", "memo": "" })))
        .expect(1)
        .mount(&server)
        .await;

    let role = client(&server).delete_role("web", "app/../db").await.unwrap();
    assert_eq!(role.name, "app/../db");
}

#[tokio::test]
async fn api_error_message_is_verbatim_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/services/web/roles"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "Role with the same name already exists." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let role = mackerel_provider_core::traits::Role {
        name: "app".to_string(),
        memo: String::new(),
    };
    let err = client(&server).create_role("web", &role).await.unwrap_err();
    assert_eq!(err, ClientError::api(400, "Role with the same name already exists."));
}

#[tokio::test]
async fn notification_group_update_uses_put() {
    let server = MockServer::start().await;
    let group = NotificationGroup {
        name: "ops".to_string(),
        notification_level: "critical".to_string(),
        monitors: vec![NotificationGroupMonitor {
            id: "2f6bd8XnzK9".to_string(),
            skip_default: true,
        }],
        ..Default::default()
    };
    Mock::given(method("PUT"))
        .and(path("/api/v0/notification-groups/ng1"))
        .and(body_json(json!({
            "name": "ops",
            "notificationLevel": "critical",
            "childNotificationGroupIds": [],
            "childChannelIds": [],
            "monitors": [{ "id": "2f6bd8XnzK9", "skipDefault": true }],
            "services": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ng1",
            "name": "ops",
            "notificationLevel": "critical",
            "childNotificationGroupIds": [],
            "childChannelIds": [],
            "monitors": [{ "id": "2f6bd8XnzK9", "skipDefault": true }],
            "services": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let updated = client(&server).update_notification_group("ng1", &group).await.unwrap();
    assert_eq!(updated.id, "ng1");
    assert!(updated.monitors[0].skip_default);
}

#[tokio::test]
async fn channels_and_metric_names_decode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v0/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "channels": [
                { "id": "ch1", "name": "ops", "type": "email", "emails": ["ops@example.com"], "userIds": [], "events": ["alert"] },
                { "id": "ch2", "name": "line", "type": "line" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v0/services/web/metric-names"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "names": ["custom.app.requests", "custom.app.errors"]
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let channel = client.find_channel("ch1").await.unwrap();
    assert_eq!(channel.kind, "email");
    assert_eq!(channel.emails, Some(vec!["ops@example.com".to_string()]));
    assert_eq!(client.find_channel("ch2").await.unwrap().url, None);

    let names = client.list_service_metric_names("web").await.unwrap();
    assert_eq!(names.len(), 2);
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v0/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server).find_channels().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)), "{err:?}");
}
