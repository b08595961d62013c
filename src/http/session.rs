//! Session
//!
//! A [`Session`] combines a base URL, a transport and (optionally) a parsed
//! spec. It is created once, cloned freely (clones share the same transport),
//! and closed explicitly.

use super::negotiate::ContentFamily;
use super::transport::{HttpTransport, Transport};
use super::{shape_of, Body, Request};
use crate::api::Api;
use crate::error::{Error, Result};
use crate::spec::{load_spec, Spec};
use reqwest::Method;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use url::Url;

struct SessionInner {
    base_url: Url,
    transport: Arc<dyn Transport>,
    spec: Option<Arc<dyn Spec>>,
}

/// Shared connection context for a base URL
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Session for a literal base URL, without a spec
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        Ok(Self::with_transport(base_url, None, Arc::new(HttpTransport::new()?)))
    }

    /// Session whose base URL and endpoints come from a spec
    pub fn from_spec(spec: Arc<dyn Spec>) -> Result<Self> {
        Ok(Self::from_spec_with(spec, Arc::new(HttpTransport::new()?)))
    }

    pub fn from_spec_with(spec: Arc<dyn Spec>, transport: Arc<dyn Transport>) -> Self {
        let base_url = spec.api_url().clone();
        Self::with_transport(base_url, Some(spec), transport)
    }

    /// Fully explicit constructor
    pub fn with_transport(
        base_url: Url,
        spec: Option<Arc<dyn Spec>>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        tracing::info!("Session opened for {}", base_url);
        Self {
            inner: Arc::new(SessionInner {
                base_url,
                transport,
                spec,
            }),
        }
    }

    /// Fetch a remote description document and build a session from it
    pub async fn from_url(spec_url: &str) -> Result<Self> {
        Self::from_url_with(spec_url, Arc::new(HttpTransport::new()?)).await
    }

    /// Like [`Session::from_url`], reusing `transport` for the fetch and for
    /// every later request
    pub async fn from_url_with(spec_url: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        let url = Url::parse(spec_url)?;
        tracing::info!("Loading spec from {}", url);

        let document = match transport.request(Request::new(Method::GET, url.clone())).await? {
            Body::Data(document) => document,
            Body::Text(text) => serde_yaml::from_str(&text)
                .map_err(|e| Error::decode("yaml", &url, e))?,
            Body::Raw(raw) => {
                return Err(Error::UnexpectedShape {
                    expected: "spec document",
                    actual: raw.content_type.unwrap_or_else(|| "untyped body".to_string()),
                })
            },
        };

        if !document.is_object() {
            return Err(Error::UnexpectedShape {
                expected: "spec document",
                actual: shape_of(&document),
            });
        }

        let spec = load_spec(document, Some(&url))?;
        Ok(Self::from_spec_with(spec, transport))
    }

    /// Read a local description file. The format follows the extension and
    /// defaults to YAML.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading spec from {}", path.display());

        let bytes = tokio::fs::read(path).await?;
        let family = ContentFamily::from_path(&path.to_string_lossy()).unwrap_or(ContentFamily::Yaml);
        let source = Url::from_file_path(path)
            .or_else(|_| Url::parse("file:///"))?;
        let document = family.decode(&bytes, &source)?;

        let spec = load_spec(document, None)?;
        Self::from_spec(spec)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn spec(&self) -> Option<&Arc<dyn Spec>> {
        self.inner.spec.as_ref()
    }

    /// Perform one request through the transport
    pub async fn request(&self, request: Request) -> Result<Body> {
        self.inner.transport.request(request).await
    }

    /// Release the transport. Every clone of this session is closed with it.
    pub async fn close(&self) {
        self.inner.transport.close().await;
        tracing::info!("Session closed for {}", self.inner.base_url);
    }

    /// Handle for a spec endpoint
    pub fn endpoint(&self, name: &str) -> Result<Api> {
        let spec = self
            .spec()
            .ok_or_else(|| Error::NoSuchEndpoint(name.to_string()))?;
        let endpoint = spec.endpoint(name)?;
        Ok(Api::for_endpoint(self.clone(), Arc::new(endpoint.clone())))
    }

    /// Handle for a literal path below the base URL
    pub fn api(&self, path: &str) -> Api {
        Api::for_path(self.clone(), path)
    }

    /// Names of every endpoint in the spec, empty without one
    pub fn endpoint_names(&self) -> Vec<String> {
        self.spec()
            .map(|spec| spec.endpoints().keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session({})", self.inner.base_url)
    }
}
