//! Base HTTP client bound to the API URL.
//!
//! Requests and responses are plain values so the refresh layer can replay a
//! request and tests can script responses without a server.

use super::Error;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

/// Default request timeout applied by [`HttpTransport`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    #[must_use]
    pub const fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    #[must_use]
    pub fn with_body(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Decode the body.
    ///
    /// # Errors
    /// Returns `Error::Parse` when the body is missing or has the wrong shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let body = self
            .body
            .clone()
            .ok_or_else(|| Error::Parse("empty response body".to_string()))?;
        serde_json::from_value(body)
            .map_err(|err| Error::Parse(format!("Failed to decode response: {err}")))
    }

    /// Server-provided error text: `{"message": ...}` or a plain-text body.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        let message = match self.body.as_ref()? {
            Value::String(text) => text.as_str(),
            body => body.get("message")?.as_str()?,
        };
        let message = message.trim();
        (!message.is_empty()).then(|| message.chars().take(MAX_ERROR_CHARS).collect())
    }

    /// Turn a non-2xx response into `Error::Http`.
    ///
    /// # Errors
    /// Returns `Error::Http` for any non-2xx status.
    pub fn error_for_status(self) -> Result<Self, Error> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Http {
                status: self.status,
                message: self.message().unwrap_or_else(|| "Request failed.".to_string()),
            })
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Non-2xx statuses are responses, not errors.
    ///
    /// # Errors
    /// Returns `Error::Network` or `Error::Timeout` when no response arrives.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        (**self).send(request).await
    }
}

/// reqwest-backed transport with a cookie jar, so the refresh cookie set at
/// login is sent back to the refresh endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// # Errors
    /// Returns `Error::Config` for an invalid base URL or client setup failure.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|err| Error::Config(format!("Invalid API URL {base_url}: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API URL must be http or https: {base_url}"
            )));
        }

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|err| Error::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim().trim_start_matches('/'))
    }
}

fn map_request_error(err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout("Request timed out. Please try again.".to_string())
    } else {
        Error::Network(format!("Unable to reach the server: {err}"))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let url = self.url(&request.path);
        debug!(method = %request.method, %url, "sending request");

        let mut builder = self.client.request(request.method, &url);
        if let Some(token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body {
            builder = builder.json(&body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| map_request_error(&err))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| map_request_error(&err))?;

        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        };

        Ok(ApiResponse { status, body })
    }
}
