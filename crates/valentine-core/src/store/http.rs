//! HTTP/JSON client for a hosted snapshot store.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{StoreError, StoreResult, VersionedStore};
use crate::models::{CreatedSave, RemoteSnapshot, Valentine};
use crate::util::{compact_error_body, is_http_url, normalize_text_option};

const HTTP_TIMEOUT_SECS: u64 = 120;

/// [`VersionedStore`] backed by the Valentine API service.
#[derive(Clone)]
pub struct HttpStore {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpStore")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl HttpStore {
    /// Builds a client for an explicit API base URL.
    pub fn new(base_url: impl Into<String>) -> StoreResult<Self> {
        let base_url = normalize_base_url(&base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|error| {
                StoreError::InvalidConfiguration(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self {
            base_url,
            access_token: None,
            client,
        })
    }

    /// Attach the identity provider's access token sent as a bearer token.
    #[must_use]
    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = normalize_text_option(access_token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    fn snapshot_url(&self, save_id: &str) -> String {
        format!(
            "{}/v1/valentines/{}",
            self.base_url,
            urlencoding::encode(save_id)
        )
    }

    fn global_latest_url(&self) -> String {
        format!("{}/v1/global-latest", self.base_url)
    }

    fn prepare(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> StoreResult<T> {
        self.send_optional_json(request, operation)
            .await?
            .ok_or_else(|| StoreError::Api(format!("{operation} target does not exist")))
    }

    /// Sends a request, mapping HTTP 404 to `None`.
    async fn send_optional_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> StoreResult<Option<T>> {
        tracing::debug!("Store request: {}", operation);
        let response = self.prepare(request).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED {
            return Err(StoreError::MethodUnavailable(operation));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api(parse_api_error(status, &body)));
        }

        let payload = response.json::<T>().await.map_err(|error| {
            StoreError::InvalidPayload(format!("failed to parse {operation} response: {error}"))
        })?;
        Ok(Some(payload))
    }
}

impl VersionedStore for HttpStore {
    async fn create(&self, valentine: &Valentine) -> StoreResult<CreatedSave> {
        let request = self
            .client
            .post(format!("{}/v1/valentines", self.base_url))
            .json(&ValentineBody { valentine });
        self.send_json(request, "create").await
    }

    async fn update(
        &self,
        save_id: &str,
        expected_version: u64,
        valentine: &Valentine,
        write_token: &str,
    ) -> StoreResult<u64> {
        let request = self.client.put(self.snapshot_url(save_id)).json(&UpdateBody {
            expected_version,
            write_token,
            valentine,
        });
        let payload: VersionBody = self.send_json(request, "update").await?;
        Ok(payload.version)
    }

    async fn fetch(&self, save_id: &str) -> StoreResult<Option<RemoteSnapshot>> {
        let request = self.client.get(self.snapshot_url(save_id));
        self.send_optional_json(request, "fetch").await
    }

    async fn fetch_version(&self, save_id: &str) -> StoreResult<u64> {
        let request = self
            .client
            .get(format!("{}/version", self.snapshot_url(save_id)));
        let payload = self
            .send_optional_json::<VersionBody>(request, "fetch_version")
            .await?
            .ok_or_else(|| StoreError::Api(format!("Snapshot {save_id} does not exist")))?;
        Ok(payload.version)
    }

    async fn save_global_latest(&self, valentine: &Valentine) -> StoreResult<u64> {
        let request = self
            .client
            .put(self.global_latest_url())
            .json(&ValentineBody { valentine });
        let payload: VersionBody = self.send_json(request, "save_global_latest").await?;
        Ok(payload.version)
    }

    async fn fetch_global_latest(&self) -> StoreResult<Option<RemoteSnapshot>> {
        let request = self.client.get(self.global_latest_url());
        self.send_optional_json(request, "fetch_global_latest").await
    }

    async fn fetch_global_latest_version(&self) -> StoreResult<u64> {
        let request = self
            .client
            .get(format!("{}/version", self.global_latest_url()));
        let payload = self
            .send_optional_json::<VersionBody>(request, "fetch_global_latest_version")
            .await?
            .ok_or_else(|| StoreError::Api("No global latest snapshot has been saved".to_string()))?;
        Ok(payload.version)
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::Unreachable(error.to_string())
        } else {
            Self::InvalidPayload(error.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct ValentineBody<'a> {
    valentine: &'a Valentine,
}

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    expected_version: u64,
    write_token: &'a str,
    valentine: &'a Valentine,
}

#[derive(Debug, Deserialize)]
struct VersionBody {
    version: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_error_body(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: &str) -> StoreResult<String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(StoreError::InvalidConfiguration(
            "API base URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(&base) {
        return Err(StoreError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    use super::*;

    /// Serves one canned response and reports the request line it received.
    async fn spawn_one_shot_server(
        status_line: &str,
        body: &str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let address = listener.local_addr().expect("local address");
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let (request_tx, request_rx) = oneshot::channel();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request_buffer = vec![0_u8; 16 * 1024];
                let read = socket.read(&mut request_buffer).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&request_buffer[..read]).to_string();
                let request_line = request.lines().next().unwrap_or_default().to_string();
                let _ = request_tx.send(request_line);
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (format!("http://{address}"), request_rx)
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("example.com").is_err());
    }

    #[test]
    fn normalize_base_url_trims_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://api.example.com/").unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn debug_redacts_access_token() {
        let store = HttpStore::new("https://api.example.com")
            .unwrap()
            .with_access_token(Some("secret".to_string()));
        let debug = format!("{store:?}");
        assert!(!debug.contains("secret"));
        assert!(store.is_authenticated());
    }

    #[test]
    fn parse_api_error_prefers_message_field() {
        assert_eq!(
            parse_api_error(StatusCode::CONFLICT, r#"{"error":"Version conflict"}"#),
            "Version conflict (409)"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, "  "), "HTTP 502");
    }

    #[tokio::test]
    async fn create_posts_and_parses_identity() {
        let (url, request) =
            spawn_one_shot_server("200 OK", r#"{"save_id":"abc","write_token":"tok"}"#).await;
        let store = HttpStore::new(url).unwrap();

        let created = store.create(&Valentine::new("hi", None)).await.unwrap();

        assert_eq!(created.save_id, "abc");
        assert_eq!(created.write_token, "tok");
        assert!(request.await.unwrap().starts_with("POST /v1/valentines "));
    }

    #[tokio::test]
    async fn update_surfaces_backend_rejection_verbatim() {
        let (url, request) = spawn_one_shot_server(
            "409 Conflict",
            r#"{"error":"Version conflict: expected 1 but found 2"}"#,
        )
        .await;
        let store = HttpStore::new(url).unwrap();

        let error = store
            .update("abc", 1, &Valentine::new("hi", None), "tok")
            .await
            .unwrap_err();

        assert!(matches!(error, StoreError::Api(ref message) if message.contains("Version conflict")));
        assert!(request.await.unwrap().starts_with("PUT /v1/valentines/abc "));
    }

    #[tokio::test]
    async fn fetch_maps_not_found_to_none() {
        let (url, _request) = spawn_one_shot_server("404 Not Found", "{}").await;
        let store = HttpStore::new(url).unwrap();

        assert!(store.fetch("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fetch_version_uses_lightweight_route() {
        let (url, request) = spawn_one_shot_server("200 OK", r#"{"version":7}"#).await;
        let store = HttpStore::new(url).unwrap();

        assert_eq!(store.fetch_version("abc").await.unwrap(), 7);
        assert!(request
            .await
            .unwrap()
            .starts_with("GET /v1/valentines/abc/version "));
    }

    #[tokio::test]
    async fn fetch_global_latest_parses_snapshot() {
        let body = r##"{"valentine":{"color":"#ff1493","text":"hi","binary_blob":"AQID"},"version":4,"last_update_timestamp":1700000000000000000}"##;
        let (url, _request) = spawn_one_shot_server("200 OK", body).await;
        let store = HttpStore::new(url).unwrap();

        let snapshot = store.fetch_global_latest().await.unwrap().unwrap();

        assert_eq!(snapshot.version, 4);
        assert_eq!(snapshot.valentine.binary_blob, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn missing_route_reports_method_unavailable() {
        let (url, _request) = spawn_one_shot_server("405 Method Not Allowed", "").await;
        let store = HttpStore::new(url).unwrap();

        let error = store.fetch_global_latest_version().await.unwrap_err();

        assert!(matches!(
            error,
            StoreError::MethodUnavailable("fetch_global_latest_version")
        ));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);
        let store = HttpStore::new(format!("http://{address}")).unwrap();

        let error = store.fetch("abc").await.unwrap_err();

        assert!(matches!(error, StoreError::Unreachable(_)));
    }
}
