//! reqwest transport for the kintone REST API
//!
//! Sends `X-Cybozu-Authorization` (password authentication) on every call,
//! plus HTTP basic auth when the domain sits behind it. Non-200 answers are
//! decoded into [`RemoteApiError`] when the body carries kintone's error
//! shape and into [`TransportError::HttpStatus`] otherwise.

use super::transport::{Endpoint, Transport};
use crate::config::{secret_string, KintoneConfig, SecretString};
use crate::domain::{Query, RemoteApiError, Result, SyncError, TransportError};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// URLs longer than this are sent as a GET with a JSON body
const MAX_URL_LENGTH: usize = 4000;

const AUTH_HEADER: &str = "X-Cybozu-Authorization";
const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Error bodies are cut to this many bytes in messages
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for one kintone domain
///
/// # Example
///
/// ```no_run
/// use kinsync::adapters::kintone::KintoneClient;
/// use kinsync::config::{secret_string, KintoneConfig};
///
/// # fn example() -> kinsync::domain::Result<()> {
/// let config = KintoneConfig {
///     base_url: None,
///     subdomain: Some("example".to_string()),
///     username: "sync-user".to_string(),
///     password: secret_string("pass".to_string()),
///     basic_auth_user: None,
///     basic_auth_password: None,
///     timeout_seconds: 610,
/// };
///
/// let client = KintoneClient::new(&config)?;
/// # Ok(())
/// # }
/// ```
pub struct KintoneClient {
    endpoint_base: Url,
    http: Client,
    auth_token: SecretString,
    basic_auth: Option<(String, SecretString)>,
}

impl KintoneClient {
    /// Builds a client from the `[kintone]` configuration section
    pub fn new(config: &KintoneConfig) -> Result<Self> {
        let endpoint_base = Url::parse(&config.endpoint_base()).map_err(|e| {
            SyncError::Configuration(format!(
                "Invalid kintone endpoint '{}': {e}",
                config.endpoint_base()
            ))
        })?;

        let http = ClientBuilder::new()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SyncError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        let credentials = format!(
            "{}:{}",
            config.username,
            config.password.expose_secret().as_str()
        );
        let auth_token = secret_string(general_purpose::STANDARD.encode(credentials.as_bytes()));

        let basic_auth = match (&config.basic_auth_user, &config.basic_auth_password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };

        tracing::debug!(
            endpoint = %endpoint_base,
            basic_auth = basic_auth.is_some(),
            timeout_seconds = config.timeout_seconds,
            "Created kintone client"
        );

        Ok(Self {
            endpoint_base,
            http,
            auth_token,
            basic_auth,
        })
    }

    fn url(&self, endpoint: Endpoint) -> Result<Url> {
        self.endpoint_base.join(endpoint.path()).map_err(|e| {
            TransportError::InvalidRequest(format!("Invalid URL for {endpoint}: {e}")).into()
        })
    }

    fn json_request(&self, method: Method, url: Url, body: &Value) -> Result<RequestBuilder> {
        let body = serde_json::to_vec(body)?;
        Ok(self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body))
    }

    async fn send_json(&self, method: Method, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        let url = self.url(endpoint)?;
        tracing::trace!(method = %method, endpoint = %endpoint, "Sending request");
        let request = self.json_request(method, url, body)?;
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>> {
        let mut request = request.header(AUTH_HEADER, self.auth_token.expose_secret().as_str());
        if let Some((user, password)) = &self.basic_auth {
            request = request.basic_auth(user, Some(password.expose_secret().as_str()));
        }

        let response = request.send().await.map_err(map_send_error)?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::InvalidResponse(format!("Failed to read body: {e}")))?;

        if status != StatusCode::OK {
            return Err(decode_error(status, &body));
        }

        Ok(body.to_vec())
    }
}

fn map_send_error(err: reqwest::Error) -> SyncError {
    let message = err.to_string();
    let err = if err.is_timeout() {
        TransportError::Timeout(message)
    } else if err.is_builder() {
        TransportError::InvalidRequest(message)
    } else {
        TransportError::ConnectionFailed(message)
    };
    err.into()
}

/// Maps a non-200 answer to the most specific error its body allows
fn decode_error(status: StatusCode, body: &[u8]) -> SyncError {
    match serde_json::from_slice::<RemoteApiError>(body) {
        Ok(mut err) if !err.code.is_empty() || !err.message.is_empty() => {
            err.status = status.as_u16();
            SyncError::RemoteApi(err)
        }
        _ => {
            let text = String::from_utf8_lossy(body);
            let message: String = text.chars().take(MAX_ERROR_BODY).collect();
            TransportError::HttpStatus {
                status: status.as_u16(),
                message,
            }
            .into()
        }
    }
}

#[async_trait]
impl Transport for KintoneClient {
    async fn get(&self, endpoint: Endpoint, query: &Query) -> Result<Vec<u8>> {
        let mut url = self.url(endpoint)?;
        url.query_pairs_mut().extend_pairs(query.to_params());

        if url.as_str().len() > MAX_URL_LENGTH {
            tracing::debug!(
                endpoint = %endpoint,
                url_length = url.as_str().len(),
                "Query too long for a URL, sending it as a request body"
            );
            return self.get_with_body(endpoint, &query.to_body()).await;
        }

        tracing::trace!(endpoint = %endpoint, query = %query.query_string(), "Sending GET");
        self.send(self.http.get(url)).await
    }

    async fn get_with_body(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.send_json(Method::GET, endpoint, body).await
    }

    async fn post(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.send_json(Method::POST, endpoint, body).await
    }

    async fn put(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.send_json(Method::PUT, endpoint, body).await
    }

    async fn delete(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.send_json(Method::DELETE, endpoint, body).await
    }
}
