//! Spec model
//!
//! A [`Spec`] turns a declarative API description into addressable endpoints
//! and operations. It is pure data: parsed once, then shared read-only by every
//! session built from it.
//!
//! # Module Structure
//!
//! - [`model`] - Data models and field typing
//! - [`swagger`] - Swagger 2.0 documents
//! - [`openapi3`] - OpenAPI 3.x documents
//!
//! New description dialects are added as further [`Spec`] implementations and
//! picked up by [`load_spec`].

pub mod model;
pub mod openapi3;
pub mod swagger;

pub use model::{Field, FieldType, Model};
pub use openapi3::OpenApi3Spec;
pub use swagger::SwaggerSpec;

use crate::error::{Error, Result};
use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// HTTP methods that may appear as keys of a path item
const PATH_ITEM_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A parsed API description
pub trait Spec: fmt::Debug + Send + Sync {
    /// Base URL every endpoint path is resolved against
    fn api_url(&self) -> &Url;

    /// Endpoints keyed by their path
    fn endpoints(&self) -> &BTreeMap<String, Endpoint>;

    /// Named data models
    fn models(&self) -> &BTreeMap<String, Model>;

    /// Look up an endpoint by path. A missing leading `/` is tolerated.
    fn endpoint(&self, name: &str) -> Result<&Endpoint> {
        let endpoints = self.endpoints();
        endpoints
            .get(name)
            .or_else(|| endpoints.get(&format!("/{}", name.trim_start_matches('/'))))
            .ok_or_else(|| Error::NoSuchEndpoint(name.to_string()))
    }
}

/// Parse a description document, choosing the dialect from its version marker.
///
/// `source` is where the document came from; it supplies the fallback scheme,
/// host and path for the API base URL.
pub fn load_spec(document: Value, source: Option<&Url>) -> Result<Arc<dyn Spec>> {
    let is_openapi3 = document
        .get("openapi")
        .and_then(Value::as_str)
        .is_some_and(|v| v.starts_with('3'));

    if is_openapi3 {
        Ok(Arc::new(OpenApi3Spec::new(document, source)?))
    } else {
        Ok(Arc::new(SwaggerSpec::new(document, source)?))
    }
}

/// One HTTP method plus path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// `operationId`, or the lowercase method name when none is declared
    pub id: String,
    pub method: Method,
    /// Path template, e.g. `/pets/{petId}`
    pub path: String,
    pub summary: Option<String>,
}

impl Operation {
    /// Names of the `{placeholders}` in the path template, in order
    pub fn path_params(&self) -> Vec<&str> {
        let mut params = Vec::new();
        let mut rest = self.path.as_str();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            params.push(&rest[start + 1..start + len]);
            rest = &rest[start + len + 1..];
        }
        params
    }
}

/// A named, addressable path exposing a set of operations
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub path: String,
    pub operations: BTreeMap<String, Operation>,
    /// Model referenced by the operations; empty when none is
    pub model: Model,
}

impl Endpoint {
    /// Resolve an operation by name
    pub fn resolve(&self, name: &str) -> Result<&Operation> {
        self.operations
            .get(name)
            .ok_or_else(|| Error::NoSuchOperation(name.to_string()))
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

/// Build an endpoint from a path item object.
///
/// `model_ref` returns the model name an operation's body or success response
/// refers to; the first hit becomes the endpoint model. Endpoints without one
/// get an empty model.
pub(crate) fn parse_endpoint(
    path: &str,
    item: &Value,
    models: &BTreeMap<String, Model>,
    model_ref: impl Fn(&Value) -> Option<String>,
) -> Endpoint {
    let mut operations = BTreeMap::new();
    let mut model: Option<Model> = None;

    if let Some(item) = item.as_object() {
        for (key, op) in item {
            let lower = key.to_ascii_lowercase();
            if !PATH_ITEM_METHODS.contains(&lower.as_str()) {
                continue;
            }
            let Ok(method) = Method::from_bytes(lower.to_ascii_uppercase().as_bytes()) else {
                continue;
            };

            let id = op
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| lower.clone());

            if model.is_none() {
                model = model_ref(op).and_then(|name| models.get(&name).cloned());
            }

            if operations.contains_key(&id) {
                tracing::warn!("Duplicate operation '{}' on {}, keeping the first", id, path);
                continue;
            }

            operations.insert(
                id.clone(),
                Operation {
                    id,
                    method,
                    path: path.to_string(),
                    summary: op.get("summary").and_then(Value::as_str).map(str::to_string),
                },
            );
        }
    }

    Endpoint {
        path: path.to_string(),
        operations,
        model: model.unwrap_or_default(),
    }
}

/// Parse every entry of a schema map into a model
pub(crate) fn parse_models(definitions: Option<&Value>) -> Result<BTreeMap<String, Model>> {
    let mut models = BTreeMap::new();
    if let Some(definitions) = definitions.and_then(Value::as_object) {
        for (name, schema) in definitions {
            models.insert(name.clone(), Model::from_schema(name, schema)?);
        }
    }
    Ok(models)
}

/// Model name a schema points at, directly or through array `items`
pub(crate) fn schema_ref_name(schema: &Value) -> Option<String> {
    let reference = schema
        .get("$ref")
        .or_else(|| schema.get("items").and_then(|items| items.get("$ref")))?
        .as_str()?;
    reference.rsplit('/').next().map(str::to_string)
}

/// Parse every path item into an endpoint
pub(crate) fn parse_endpoints(
    paths: Option<&Value>,
    models: &BTreeMap<String, Model>,
    model_ref: impl Fn(&Value) -> Option<String> + Copy,
) -> BTreeMap<String, Endpoint> {
    paths
        .and_then(Value::as_object)
        .map(|paths| {
            paths
                .iter()
                .map(|(path, item)| (path.clone(), parse_endpoint(path, item, models, model_ref)))
                .collect()
        })
        .unwrap_or_default()
}
