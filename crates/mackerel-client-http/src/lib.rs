// # Mackerel HTTP Client
//
// This crate provides the HTTP implementation of `MackerelClient` on top of
// the Mackerel REST API v0.
//
// ## Behavior
//
// - One HTTP request per client call; no retries, no caching
// - HTTP timeout configured (30 seconds)
// - 404 maps to `ClientError::NotFound`, so lifecycle code can treat
//   "already gone" as success where it should
// - Every other non-success status maps to `ClientError::Api`, carrying the
//   remote `{"error":{"message":...}}` text verbatim
//
// ## Security Requirements
//
// - The API key is sent in the `X-Api-Key` header only
// - The API key NEVER appears in logs or Debug output
//
// ## API Reference
//
// - Mackerel API: https://mackerel.io/api-docs/
// - Services: `/api/v0/services`, `/api/v0/services/:name`
// - Roles: `/api/v0/services/:name/roles`, `/api/v0/services/:name/roles/:role`
// - Notification groups: `/api/v0/notification-groups`, `/api/v0/notification-groups/:id`
// - Channels: `/api/v0/channels`, `/api/v0/channels/:id`
// - Metric names: `/api/v0/services/:name/metric-names`
//
// Names and ids are percent-encoded as single path segments.

use async_trait::async_trait;
use mackerel_provider_core::error::{ClientError, Error, Result};
use mackerel_provider_core::traits::{
    Channel, ClientConfig, ClientFactory, MackerelClient, NotificationGroup, Role, Service, ServiceParam,
};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const API_KEY_HEADER: &str = "X-Api-Key";

const USER_AGENT: &str = concat!("terraform-provider-mackerel/", env!("CARGO_PKG_VERSION"));

type ClientResult<T> = std::result::Result<T, ClientError>;

/// Mackerel API client
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct HttpClient {
    /// Mackerel API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// API base, always ending with `/`
    base: Url,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("api_key", &"<REDACTED>")
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl HttpClient {
    /// Create a client for the configured API base
    ///
    /// # Returns
    ///
    /// - `Ok(HttpClient)`: Ready to use
    /// - `Err(Error::Configuration)`: Empty API key or invalid base URL
    /// - `Err(Error::Setup)`: The HTTP client could not be built
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::configuration(None, "Mackerel API key cannot be empty"));
        }

        let mut base = config.api_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|e| Error::configuration(None, format!("invalid API base {:?}: {}", config.api_base, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::configuration(
                None,
                format!("invalid API base {:?}: not a hierarchical URL", config.api_base),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::setup(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base,
            client,
        })
    }

    /// URL of an API v0 endpoint; every segment is percent-encoded
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::Transport(format!("API base {} cannot carry a path", self.base)))?;
            path.pop_if_empty().extend(["api", "v0"]).extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ClientResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        tracing::debug!("Mackerel API request: {} {}", method, url.path());
        Ok(self
            .client
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Content-Type", "application/json"))
    }

    /// Send a request and decode the success body
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("HTTP request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            let message = remote_message(&body);
            return Err(match status.as_u16() {
                404 => ClientError::NotFound(message),
                code => ClientError::api(code, message),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("Failed to parse response: {}", e)))
    }
}

/// Extract the remote error message from an error body
fn remote_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorDetail {
        Object { message: String },
        Text(String),
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: ErrorDetail::Object { message } | ErrorDetail::Text(message),
        }) => message,
        Err(_) => body.trim().to_string(),
    }
}

#[derive(Deserialize)]
struct ServicesResponse {
    services: Vec<Service>,
}

#[derive(Deserialize)]
struct RolesResponse {
    roles: Vec<Role>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationGroupsResponse {
    notification_groups: Vec<NotificationGroup>,
}

#[derive(Deserialize)]
struct ChannelsResponse {
    channels: Vec<Channel>,
}

#[derive(Deserialize)]
struct MetricNamesResponse {
    names: Vec<String>,
}

#[async_trait]
impl MackerelClient for HttpClient {
    async fn find_services(&self) -> ClientResult<Vec<Service>> {
        let response: ServicesResponse = self.execute(self.request(Method::GET, &["services"])?).await?;
        Ok(response.services)
    }

    async fn create_service(&self, param: &ServiceParam) -> ClientResult<Service> {
        self.execute(self.request(Method::POST, &["services"])?.json(param))
            .await
    }

    async fn delete_service(&self, name: &str) -> ClientResult<Service> {
        self.execute(self.request(Method::DELETE, &["services", name])?)
            .await
    }

    async fn find_roles(&self, service: &str) -> ClientResult<Vec<Role>> {
        let response: RolesResponse = self
            .execute(self.request(Method::GET, &["services", service, "roles"])?)
            .await?;
        Ok(response.roles)
    }

    async fn create_role(&self, service: &str, role: &Role) -> ClientResult<Role> {
        self.execute(
            self.request(Method::POST, &["services", service, "roles"])?
                .json(role),
        )
        .await
    }

    async fn delete_role(&self, service: &str, role: &str) -> ClientResult<Role> {
        self.execute(self.request(Method::DELETE, &["services", service, "roles", role])?)
            .await
    }

    async fn find_notification_groups(&self) -> ClientResult<Vec<NotificationGroup>> {
        let response: NotificationGroupsResponse = self
            .execute(self.request(Method::GET, &["notification-groups"])?)
            .await?;
        Ok(response.notification_groups)
    }

    async fn create_notification_group(&self, group: &NotificationGroup) -> ClientResult<NotificationGroup> {
        self.execute(self.request(Method::POST, &["notification-groups"])?.json(group))
            .await
    }

    async fn update_notification_group(&self, id: &str, group: &NotificationGroup) -> ClientResult<NotificationGroup> {
        self.execute(
            self.request(Method::PUT, &["notification-groups", id])?
                .json(group),
        )
        .await
    }

    async fn delete_notification_group(&self, id: &str) -> ClientResult<NotificationGroup> {
        self.execute(self.request(Method::DELETE, &["notification-groups", id])?)
            .await
    }

    async fn find_channels(&self) -> ClientResult<Vec<Channel>> {
        let response: ChannelsResponse = self.execute(self.request(Method::GET, &["channels"])?).await?;
        Ok(response.channels)
    }

    async fn create_channel(&self, channel: &Channel) -> ClientResult<Channel> {
        self.execute(self.request(Method::POST, &["channels"])?.json(channel))
            .await
    }

    async fn delete_channel(&self, id: &str) -> ClientResult<Channel> {
        self.execute(self.request(Method::DELETE, &["channels", id])?)
            .await
    }

    async fn list_service_metric_names(&self, service: &str) -> ClientResult<Vec<String>> {
        let response: MetricNamesResponse = self
            .execute(self.request(Method::GET, &["services", service, "metric-names"])?)
            .await?;
        Ok(response.names)
    }
}

/// Factory for creating HTTP clients
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn connect(&self, config: &ClientConfig) -> Result<Arc<dyn MackerelClient>> {
        let client = HttpClient::new(config)?;
        tracing::info!("Connecting to Mackerel API at {}", client.base);
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_creation() {
        let client = HttpClientFactory.connect(&ClientConfig::new("test_key"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_factory_missing_key() {
        let client = HttpClientFactory.connect(&ClientConfig::new(""));
        assert!(client.is_err());
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        let config = ClientConfig::new("key").with_api_base("not a url");
        assert!(HttpClient::new(&config).is_err());
    }

    #[test]
    fn test_base_gets_trailing_slash() {
        let config = ClientConfig::new("key").with_api_base("http://localhost:8080/mackerel");
        let client = HttpClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(&["services"]).unwrap().as_str(),
            "http://localhost:8080/mackerel/api/v0/services"
        );
    }

    #[test]
    fn test_endpoint_segments_are_escaped() {
        let client = HttpClient::new(&ClientConfig::new("key").with_api_base("https://api.mackerelio.com/")).unwrap();
        assert_eq!(
            client.endpoint(&["services", "web/../x", "roles", "app?all#top"]).unwrap().as_str(),
            "https://api.mackerelio.com/api/v0/services/web%2F..%2Fx/roles/app%3Fall%23top"
        );
    }

    #[test]
    fn test_opaque_base_is_rejected() {
        let config = ClientConfig::new("key").with_api_base("mailto:ops@example.com");
        assert!(HttpClient::new(&config).is_err());
    }

    #[test]
    fn test_remote_message_extraction() {
        assert_eq!(remote_message(r#"{"error":{"message":"Service not found"}}"#), "Service not found");
        assert_eq!(remote_message(r#"{"error":"Forbidden"}"#), "Forbidden");
        assert_eq!(remote_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_api_key_not_exposed_in_debug() {
        let client = HttpClient::new(&ClientConfig::new("secret_key_12345")).unwrap();

        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("HttpClient"));
    }
}
