//! Transport
//!
//! [`Transport`] is the seam between sessions and the network. [`HttpTransport`]
//! implements it on a pooled `reqwest` client; the pool is safe to share between
//! any number of in-flight requests.

use super::{negotiate, Body, Request};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("restspec/", env!("CARGO_PKG_VERSION"));

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Performs one HTTP request and decodes the body.
///
/// Implementations must fail with [`Error::Status`] on any non-2xx response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: Request) -> Result<Body>;

    /// Release the underlying connections. Later requests fail.
    async fn close(&self) {}
}

/// Builder for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    user_agent: String,
    timeout: Option<Duration>,
    headers: Vec<(String, String)>,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            headers: Vec::new(),
        }
    }
}

impl HttpTransportBuilder {
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Per-request timeout. None by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Header sent with every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Configuration(format!("header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Configuration(format!("header value for '{}': {}", name, e)))?;
            headers.append(name, value);
        }

        let mut builder = Client::builder()
            .user_agent(self.user_agent)
            .default_headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(HttpTransport {
            client: RwLock::new(Some(builder.build()?)),
        })
    }
}

/// `reqwest`-backed transport
pub struct HttpTransport {
    client: RwLock<Option<Client>>,
}

impl HttpTransport {
    /// Create a transport with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: Request) -> Result<Body> {
        let client = self
            .client
            .read()
            .await
            .clone()
            .ok_or(Error::SessionClosed)?;

        tracing::debug!("{} {}", request.method, request.url);

        let Request {
            method,
            url,
            query,
            json,
            file,
        } = request;

        let mut builder = client.request(method.clone(), url.clone());

        if !query.is_empty() {
            builder = builder.query(&query);
        }

        match (file, json) {
            (Some(_), Some(_)) => {
                return Err(Error::Configuration(
                    "a request carries either a file or a JSON body, not both".to_string(),
                ))
            },
            (Some(file), None) => {
                let mut part = Part::bytes(file.bytes).file_name(file.file_name);
                if let Some(mime) = file.mime {
                    part = part.mime_str(&mime)?;
                }
                builder = builder.multipart(Form::new().part("file", part));
            },
            (None, Some(json)) => builder = builder.json(&json),
            (None, None) => {},
        }

        let response = builder.send().await?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        if !status.is_success() {
            let body = sanitize_for_log(&String::from_utf8_lossy(&bytes));
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} {} - {} - {}", method, final_url, status, body);
            return Err(Error::Status {
                method: method.to_string(),
                url: final_url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        negotiate::decode_body(content_type.as_deref(), &final_url, status.as_u16(), bytes)
    }

    async fn close(&self) {
        if self.client.write().await.take().is_some() {
            tracing::debug!("HTTP transport closed");
        }
    }
}
