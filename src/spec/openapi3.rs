//! OpenAPI 3.x description documents

use super::swagger::DEFAULT_BASE;
use super::{parse_endpoints, parse_models, schema_ref_name, Endpoint, Model, Spec};
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Spec backed by an OpenAPI 3 document (`servers`, `paths`,
/// `components.schemas`)
#[derive(Debug)]
pub struct OpenApi3Spec {
    api_url: Url,
    endpoints: BTreeMap<String, Endpoint>,
    models: BTreeMap<String, Model>,
}

impl OpenApi3Spec {
    pub fn new(document: Value, source: Option<&Url>) -> Result<Self> {
        let api_url = server_url(&document, source)?;
        let models = parse_models(document.pointer("/components/schemas"))?;
        let endpoints = parse_endpoints(document.get("paths"), &models, operation_model_ref);

        tracing::debug!(
            "Loaded OpenAPI 3 spec: {} endpoints, {} models, base {}",
            endpoints.len(),
            models.len(),
            api_url
        );

        Ok(Self {
            api_url,
            endpoints,
            models,
        })
    }
}

impl Spec for OpenApi3Spec {
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

/// First declared server, resolved against the source URL when relative.
/// Without servers, the directory of the source URL.
fn server_url(document: &Value, source: Option<&Url>) -> Result<Url> {
    let fallback = match source {
        Some(url) => url.clone(),
        None => Url::parse(DEFAULT_BASE)?,
    };

    let declared = document
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
        .and_then(|server| server.get("url"))
        .and_then(Value::as_str);

    match declared {
        Some(server) => fallback
            .join(server)
            .map_err(|e| Error::Configuration(format!("invalid server URL '{}': {}", server, e))),
        None => Ok(fallback.join("./")?),
    }
}

/// Model referenced by a success response or the request body
fn operation_model_ref(op: &Value) -> Option<String> {
    fn first_content_ref(content: Option<&Value>) -> Option<String> {
        content?
            .as_object()?
            .values()
            .find_map(|media| media.get("schema").and_then(schema_ref_name))
    }

    let responses = op.get("responses");
    ["200", "201", "default"]
        .iter()
        .find_map(|code| {
            first_content_ref(responses.and_then(|r| r.get(*code)).and_then(|r| r.get("content")))
        })
        .or_else(|| first_content_ref(op.pointer("/requestBody/content")))
}
