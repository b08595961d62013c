//! HTTP layer
//!
//! This module owns everything between an API handle and the wire: request
//! values, response decoding and the session that ties a base URL to a
//! transport.
//!
//! # Module Structure
//!
//! - [`negotiate`] - Content-type driven body decoding
//! - [`transport`] - The [`Transport`] seam and its `reqwest` implementation
//! - [`session`] - [`Session`], the entry point for callers

pub mod negotiate;
pub mod session;
pub mod transport;

pub use negotiate::ContentFamily;
pub use session::Session;
pub use transport::{HttpTransport, HttpTransportBuilder, Transport};

use crate::error::{Error, Result};
use reqwest::Method;
use serde_json::Value;
use url::Url;

/// A file uploaded as the multipart field `file`
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl FilePayload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// One outgoing HTTP call
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub json: Option<Value>,
    pub file: Option<FilePayload>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            query: Vec::new(),
            json: None,
            file: None,
        }
    }
}

/// A response body the negotiation could not decode or treat as text
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub url: Url,
    pub bytes: Vec<u8>,
}

/// Decoded response body
#[derive(Debug, Clone)]
pub enum Body {
    /// JSON, XML or YAML, decoded into a JSON value
    Data(Value),
    Text(String),
    Raw(RawResponse),
}

impl Body {
    /// Take the decoded value, failing on text or raw bodies
    pub fn into_data(self) -> Result<Value> {
        match self {
            Self::Data(value) => Ok(value),
            Self::Text(_) => Err(Error::UnexpectedShape {
                expected: "structured data",
                actual: "text".to_string(),
            }),
            Self::Raw(raw) => Err(Error::UnexpectedShape {
                expected: "structured data",
                actual: raw
                    .content_type
                    .unwrap_or_else(|| "untyped body".to_string()),
            }),
        }
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(value) => Some(value),
            _ => None,
        }
    }
}

/// Short description of a JSON value's shape, for error messages
pub(crate) fn shape_of(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}
