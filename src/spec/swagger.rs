//! Swagger 2.0 description documents

use super::{parse_endpoints, parse_models, schema_ref_name, Endpoint, Model, Spec};
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Base used when a document neither declares a host nor has a source URL
pub(crate) const DEFAULT_BASE: &str = "http://localhost";

/// Spec backed by a Swagger 2.0 document (`host`, `basePath`, `schemes`,
/// `paths`, `definitions`)
#[derive(Debug)]
pub struct SwaggerSpec {
    api_url: Url,
    endpoints: BTreeMap<String, Endpoint>,
    models: BTreeMap<String, Model>,
    document: Value,
}

impl SwaggerSpec {
    pub fn new(document: Value, source: Option<&Url>) -> Result<Self> {
        let api_url = derive_api_url(&document, source)?;
        let models = parse_models(document.get("definitions"))?;
        let endpoints = parse_endpoints(document.get("paths"), &models, operation_model_ref);

        tracing::debug!(
            "Loaded swagger spec: {} endpoints, {} models, base {}",
            endpoints.len(),
            models.len(),
            api_url
        );

        Ok(Self {
            api_url,
            endpoints,
            models,
            document,
        })
    }

    /// The raw description document
    pub fn document(&self) -> &Value {
        &self.document
    }
}

impl Spec for SwaggerSpec {
    fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn endpoints(&self) -> &BTreeMap<String, Endpoint> {
        &self.endpoints
    }

    fn models(&self) -> &BTreeMap<String, Model> {
        &self.models
    }
}

/// Combine declared `host`/`basePath`/`schemes` with the source URL.
///
/// Each missing part comes from the source URL. A missing `basePath` means the
/// directory of the source URL, never the document itself. The source scheme is kept when
/// `schemes` is absent or lists it, otherwise the first declared scheme wins.
fn derive_api_url(document: &Value, source: Option<&Url>) -> Result<Url> {
    let fallback = match source {
        Some(url) => url.clone(),
        None => Url::parse(DEFAULT_BASE)?,
    };

    let host = match document.get("host").and_then(Value::as_str) {
        Some(host) => host.to_string(),
        None => {
            let host = fallback.host_str().unwrap_or("localhost");
            match fallback.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            }
        },
    };

    // Without basePath, endpoints sit in the directory the document came from
    let source_dir = fallback.join("./")?;
    let path = document
        .get("basePath")
        .and_then(Value::as_str)
        .unwrap_or_else(|| source_dir.path());

    let schemes: Vec<&str> = document
        .get("schemes")
        .and_then(Value::as_array)
        .map(|s| s.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let scheme = if schemes.is_empty() || schemes.contains(&fallback.scheme()) {
        fallback.scheme()
    } else {
        schemes[0]
    };

    let separator = if path.starts_with('/') { "" } else { "/" };
    Url::parse(&format!("{}://{}{}{}", scheme, host, separator, path))
        .map_err(|e| Error::Configuration(format!("invalid API base URL: {}", e)))
}

/// Model referenced by a success response or a body parameter
fn operation_model_ref(op: &Value) -> Option<String> {
    let responses = op.get("responses");
    let from_response = ["200", "201", "default"].iter().find_map(|code| {
        responses
            .and_then(|r| r.get(*code))
            .and_then(|r| r.get("schema"))
            .and_then(schema_ref_name)
    });

    from_response.or_else(|| {
        op.get("parameters")?
            .as_array()?
            .iter()
            .filter(|p| p.get("in").and_then(Value::as_str) == Some("body"))
            .find_map(|p| p.get("schema").and_then(schema_ref_name))
    })
}
