use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::json::JsonValue;

use super::error::ApiError;
use super::resource::{decode_resource, Resource, ResourceKind};
use super::types::{Baseline, Consumption, PhysioAge, Readiness, WeeklyReport};

/// Where a fetch gets its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
  /// Serve the built-in sample, no I/O
  Mock,
  /// Call the backend over HTTP
  Live,
}

/// Motivue backend client with a mock/live switch.
///
/// Cloning is cheap and clones share the same mode flag, so flipping it on one
/// handle affects every other handle.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: String,
  bearer_token: Option<String>,
  use_mock: Arc<AtomicBool>,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: config.base_url.clone(),
      bearer_token: config.bearer_token.clone(),
      use_mock: Arc::new(AtomicBool::new(config.use_mock)),
    })
  }

  pub fn use_mock(&self) -> bool {
    self.use_mock.load(Ordering::SeqCst)
  }

  pub fn set_use_mock(&self, use_mock: bool) {
    self.use_mock.store(use_mock, Ordering::SeqCst);
  }

  /// Read the mode flag once. Callers batching several fetches should hold on
  /// to the result rather than re-reading the flag per fetch.
  pub fn mode(&self) -> FetchMode {
    if self.use_mock() {
      FetchMode::Mock
    } else {
      FetchMode::Live
    }
  }

  /// Today's readiness computed from HealthKit data
  pub async fn fetch_readiness(&self, mode: FetchMode) -> Result<Readiness, ApiError> {
    self.fetch(mode, "", None).await
  }

  /// Training consumption for the sessions described in `payload`
  pub async fn post_consumption(
    &self,
    mode: FetchMode,
    payload: Option<&JsonValue>,
  ) -> Result<Consumption, ApiError> {
    self.fetch(mode, "", payload).await
  }

  /// Run the weekly report pipeline
  pub async fn run_weekly_report(
    &self,
    mode: FetchMode,
    payload: Option<&JsonValue>,
  ) -> Result<WeeklyReport, ApiError> {
    self.fetch(mode, "", payload).await
  }

  /// Rolling baselines for one user
  pub async fn fetch_baseline(&self, mode: FetchMode, user_id: &str) -> Result<Baseline, ApiError> {
    self.fetch(mode, user_id, None).await
  }

  /// Physiological age from biometric time series in `payload`
  pub async fn fetch_physio_age(
    &self,
    mode: FetchMode,
    payload: Option<&JsonValue>,
  ) -> Result<PhysioAge, ApiError> {
    self.fetch(mode, "", payload).await
  }

  /// Fetch any resource kind. `user_id` is only used by path templates that
  /// need it.
  pub async fn fetch<R: Resource>(
    &self,
    mode: FetchMode,
    user_id: &str,
    payload: Option<&JsonValue>,
  ) -> Result<R, ApiError> {
    match mode {
      FetchMode::Mock => Ok(R::sample()),
      FetchMode::Live => {
        let url = self.endpoint(R::KIND, user_id)?;
        self.request(R::KIND.method(), url, payload).await
      }
    }
  }

  /// Compose base URL + the kind's fixed path. Segments are appended to any
  /// path already on the base, and percent-encoded.
  fn endpoint(&self, kind: ResourceKind, user_id: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(&self.base_url)
      .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", self.base_url, e)))?;

    let segments = kind.path_segments(user_id);
    if segments.iter().any(|s| s.is_empty()) {
      return Err(ApiError::InvalidEndpoint(format!(
        "empty path segment for {}",
        kind
      )));
    }

    url
      .path_segments_mut()
      .map_err(|_| ApiError::InvalidEndpoint(format!("{} cannot be a base URL", self.base_url)))?
      .pop_if_empty()
      .extend(segments);

    Ok(url)
  }

  async fn request<R: Resource>(
    &self,
    method: Method,
    url: Url,
    body: Option<&JsonValue>,
  ) -> Result<R, ApiError> {
    debug!(kind = %R::KIND, %method, %url, "requesting resource");

    let mut req = self.http.request(method, url);
    if let Some(token) = &self.bearer_token {
      req = req.bearer_auth(token);
    }
    if let Some(body) = body {
      req = req.json(body);
    }

    let response = req.send().await.map_err(ApiError::Transport)?;

    let status = response.status();
    if !status.is_success() {
      return Err(ApiError::HttpStatus(status.as_u16()));
    }

    let bytes = response.bytes().await.map_err(ApiError::Transport)?;
    decode_resource(&bytes).map_err(ApiError::Decode)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::mock;
  use mockito::Matcher;

  fn live_client(base_url: &str, token: Option<&str>) -> ApiClient {
    let config = ApiConfig {
      base_url: base_url.to_string(),
      bearer_token: token.map(String::from),
      use_mock: false,
      ..Default::default()
    };
    ApiClient::new(&config).unwrap()
  }

  #[tokio::test]
  async fn test_mock_mode_does_no_io() {
    // Unroutable base: any network attempt would fail
    let client = live_client("http://127.0.0.1:1", None);
    let readiness = client.fetch_readiness(FetchMode::Mock).await.unwrap();
    assert_eq!(readiness, mock::readiness());

    let baseline = client.fetch_baseline(FetchMode::Mock, "anyone").await.unwrap();
    assert_eq!(baseline, mock::baseline());
  }

  #[tokio::test]
  async fn test_get_with_bearer_token() {
    let mut server = mockito::Server::new_async().await;
    let m = server
      .mock("GET", "/readiness/from-healthkit")
      .match_header("authorization", "Bearer tok-123")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"user_id": "u9", "final_readiness_score": 71, "final_diagnosis": "FOR"}"#)
      .create_async()
      .await;

    let client = live_client(&server.url(), Some("tok-123"));
    let readiness = client.fetch_readiness(FetchMode::Live).await.unwrap();

    m.assert_async().await;
    assert_eq!(readiness.user_id.as_deref(), Some("u9"));
    assert_eq!(readiness.final_score, Some(71));
    assert_eq!(readiness.diagnosis.as_deref(), Some("FOR"));
    assert_eq!(readiness.metrics, None);
  }

  #[tokio::test]
  async fn test_no_auth_header_without_token() {
    let mut server = mockito::Server::new_async().await;
    let m = server
      .mock("GET", "/baseline/athlete_001")
      .match_header("authorization", Matcher::Missing)
      .with_status(200)
      .with_body(r#"{"user_id": "athlete_001", "hrv_baseline_mu": 60.5}"#)
      .create_async()
      .await;

    let client = live_client(&server.url(), None);
    let baseline = client
      .fetch_baseline(FetchMode::Live, "athlete_001")
      .await
      .unwrap();

    m.assert_async().await;
    assert_eq!(baseline.hrv_baseline_mu, Some(60.5));
  }

  #[tokio::test]
  async fn test_post_sends_json_body() {
    let mut server = mockito::Server::new_async().await;
    let m = server
      .mock("POST", "/readiness/consumption")
      .match_header("content-type", "application/json")
      .match_body(Matcher::PartialJson(serde_json::json!({
        "user_id": "athlete_001",
        "date": "2025-09-18"
      })))
      .with_status(200)
      .with_body(r#"{"consumption_score": 12.0, "breakdown": []}"#)
      .create_async()
      .await;

    let client = live_client(&server.url(), None);
    let payload = mock::consumption_payload();
    let consumption = client
      .post_consumption(FetchMode::Live, Some(&payload))
      .await
      .unwrap();

    m.assert_async().await;
    assert_eq!(consumption.load_score, Some(12.0));
    assert_eq!(consumption.breakdown, Some(Vec::new()));
  }

  #[tokio::test]
  async fn test_base_path_prefix_is_kept() {
    let mut server = mockito::Server::new_async().await;
    let m = server
      .mock("POST", "/api/physio-age")
      .with_status(200)
      .with_body(r#"{"physiological_age": 31, "status": "ok"}"#)
      .create_async()
      .await;

    let client = live_client(&format!("{}/api/", server.url()), None);
    let physio = client.fetch_physio_age(FetchMode::Live, None).await.unwrap();

    m.assert_async().await;
    assert_eq!(physio.age, Some(31));
  }

  #[tokio::test]
  async fn test_user_id_is_percent_encoded() {
    let mut server = mockito::Server::new_async().await;
    let m = server
      .mock("GET", "/baseline/a%20b%2Fc")
      .with_status(200)
      .with_body("{}")
      .create_async()
      .await;

    let client = live_client(&server.url(), None);
    client.fetch_baseline(FetchMode::Live, "a b/c").await.unwrap();

    m.assert_async().await;
  }

  #[tokio::test]
  async fn test_non_success_status() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/weekly-report/run")
      .with_status(404)
      .create_async()
      .await;

    let client = live_client(&server.url(), None);
    let err = client
      .run_weekly_report(FetchMode::Live, None)
      .await
      .unwrap_err();

    assert!(matches!(err, ApiError::HttpStatus(404)));
    assert_eq!(err.kind_label(), "http_status");
  }

  #[tokio::test]
  async fn test_non_object_body_is_decode_failure() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/readiness/from-healthkit")
      .with_status(200)
      .with_body("[1, 2, 3]")
      .create_async()
      .await;

    let client = live_client(&server.url(), None);
    let err = client.fetch_readiness(FetchMode::Live).await.unwrap_err();

    assert!(matches!(err, ApiError::Decode(_)));
  }

  #[tokio::test]
  async fn test_unreachable_host_is_transport_failure() {
    let client = live_client("http://127.0.0.1:1", None);
    let err = client.fetch_readiness(FetchMode::Live).await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
  }

  #[tokio::test]
  async fn test_malformed_base_is_invalid_endpoint() {
    let client = live_client("not a url", None);
    let err = client.fetch_readiness(FetchMode::Live).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidEndpoint(_)));

    let client = live_client("mailto:someone@example.com", None);
    let err = client.fetch_readiness(FetchMode::Live).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidEndpoint(_)));
  }

  #[tokio::test]
  async fn test_empty_user_id_is_invalid_endpoint() {
    let client = live_client("http://127.0.0.1:8000", None);
    let err = client.fetch_baseline(FetchMode::Live, "").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidEndpoint(_)));
  }

  #[test]
  fn test_mode_flag_shared_between_clones() {
    let client = live_client("http://127.0.0.1:8000", None);
    let other = client.clone();
    assert_eq!(client.mode(), FetchMode::Live);

    other.set_use_mock(true);
    assert_eq!(client.mode(), FetchMode::Mock);
  }
}
