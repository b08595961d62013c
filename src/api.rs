//! API endpoint handles
//!
//! An [`Api`] is bound to one session and either a literal path or a spec
//! [`Endpoint`]. It builds URLs, performs the four canonical verbs and turns
//! declared operations into calls.
//!
//! # Example
//!
//! ```ignore
//! use restspec::{Call, Expect, Session};
//!
//! async fn example(session: &Session) -> restspec::Result<()> {
//!     let pets = session.endpoint("/pets")?;
//!     let available = pets
//!         .call_many("findPets", Call::new().query("status", "available"))
//!         .await?
//!         .all()
//!         .await?;
//!     Ok(())
//! }
//! ```

use crate::error::{Error, Result};
use crate::http::{shape_of, Body, FilePayload, Request, Session};
use crate::resource::{Collection, Fields, Resource, ResourceCollection};
use crate::spec::{Endpoint, Operation};
use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Arguments of one call: extra path fragments, template parameters, query
/// string and body
#[derive(Debug, Clone, Default)]
pub struct Call {
    pub fragments: Vec<String>,
    pub path_params: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub json: Option<Value>,
    pub file: Option<FilePayload>,
}

impl Call {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path fragment, resolved relative to the URL built so far
    pub fn path(mut self, fragment: impl Into<String>) -> Self {
        self.fragments.push(fragment.into());
        self
    }

    /// Fill a `{name}` placeholder of the path template
    pub fn param(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.path_params.insert(name.into(), value.to_string());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    /// Upload a file as the multipart field `file`. Cannot be combined with
    /// [`Call::json`]; such a call fails with a configuration error.
    pub fn file(mut self, file: FilePayload) -> Self {
        self.file = Some(file);
        self
    }
}

/// What the caller expects an operation to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    One,
    Many,
}

/// Wrapped result of a declared operation
#[derive(Debug)]
pub enum Outcome {
    Single(Resource),
    Many(ResourceCollection),
}

impl Outcome {
    pub fn into_single(self) -> Option<Resource> {
        match self {
            Self::Single(resource) => Some(resource),
            Self::Many(_) => None,
        }
    }

    pub fn into_many(self) -> Option<ResourceCollection> {
        match self {
            Self::Many(collection) => Some(collection),
            Self::Single(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Target {
    Path(String),
    Endpoint(Arc<Endpoint>),
}

/// Handle for one endpoint of a session
#[derive(Clone)]
pub struct Api {
    session: Session,
    target: Target,
}

impl Api {
    pub(crate) fn for_path(session: Session, path: &str) -> Self {
        Self {
            session,
            target: Target::Path(path.to_string()),
        }
    }

    pub(crate) fn for_endpoint(session: Session, endpoint: Arc<Endpoint>) -> Self {
        Self {
            session,
            target: Target::Endpoint(endpoint),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The spec endpoint, `None` for literal paths
    pub fn endpoint(&self) -> Option<&Endpoint> {
        match &self.target {
            Target::Endpoint(endpoint) => Some(endpoint),
            Target::Path(_) => None,
        }
    }

    /// Literal path or endpoint path template
    pub fn path(&self) -> &str {
        match &self.target {
            Target::Path(path) => path,
            Target::Endpoint(endpoint) => &endpoint.path,
        }
    }

    /// Base URL, then this handle's path, then `fragments`.
    ///
    /// Spec endpoint paths are relative to the base URL. Extra fragments are
    /// stripped of surrounding slashes.
    pub fn make_url<S: AsRef<str>>(&self, fragments: &[S]) -> Result<Url> {
        self.make_url_with(&BTreeMap::new(), fragments)
    }

    fn make_url_with<S: AsRef<str>>(
        &self,
        params: &BTreeMap<String, String>,
        fragments: &[S],
    ) -> Result<Url> {
        let own = match &self.target {
            Target::Path(path) => expand_template(path, params)?,
            Target::Endpoint(endpoint) => {
                expand_template(endpoint.path.trim_start_matches('/'), params)?
            },
        };

        let mut parts = Vec::with_capacity(fragments.len() + 1);
        parts.push(own);
        parts.extend(fragments.iter().map(|f| f.as_ref().trim_matches('/').to_string()));

        join_url(self.session.base_url(), &parts)
    }

    async fn send(&self, method: Method, call: Call) -> Result<Body> {
        let url = self.make_url_with(&call.path_params, &call.fragments)?;
        self.dispatch(method, url, call).await
    }

    async fn dispatch(&self, method: Method, url: Url, call: Call) -> Result<Body> {
        let mut request = Request::new(method, url);
        request.query = call.query;
        request.json = call.json;
        request.file = call.file;
        self.session.request(request).await
    }

    pub async fn get(&self, call: Call) -> Result<Body> {
        self.send(Method::GET, call).await
    }

    pub async fn put(&self, call: Call) -> Result<Body> {
        self.send(Method::PUT, call).await
    }

    pub async fn post(&self, call: Call) -> Result<Body> {
        self.send(Method::POST, call).await
    }

    pub async fn delete(&self, call: Call) -> Result<Body> {
        self.send(Method::DELETE, call).await
    }

    /// GET one record by id
    pub async fn get_by_id(&self, id: impl fmt::Display) -> Result<Resource> {
        let fragment = urlencoding::encode(&id.to_string()).into_owned();
        let value = self.get(Call::new().path(fragment)).await?.into_data()?;
        Resource::from_json(value, Some(self.clone()))
    }

    /// Every record the endpoint lists. The GET happens when the collection is
    /// first polled.
    pub fn list(&self) -> ResourceCollection {
        let api = self.clone();
        Collection::from_future(async move {
            let value = api.get(Call::new()).await?.into_data()?;
            api.wrap_many(value)
        })
    }

    /// Create one resource per mapping concurrently, yielding them as the
    /// creates complete
    pub fn create_multiple<I>(&self, items: I) -> ResourceCollection
    where
        I: IntoIterator<Item = Fields>,
    {
        let resources: Vec<Resource> = items
            .into_iter()
            .map(|fields| Resource::with_api(fields, self.clone()))
            .collect();
        Collection::from_items(resources).create()
    }

    /// Literal handle for a path nested below this one
    pub fn sub_api(&self, path: &str) -> Api {
        let nested = format!(
            "{}/{}",
            self.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Api::for_path(self.session.clone(), nested.trim_start_matches('/'))
    }

    /// Resolve a declared operation. Never touches the network.
    pub fn resolve(&self, name: &str) -> Result<&Operation> {
        match &self.target {
            Target::Endpoint(endpoint) => endpoint.resolve(name),
            Target::Path(_) => Err(Error::NoSuchOperation(name.to_string())),
        }
    }

    /// Perform a declared operation and return the decoded body
    pub async fn invoke(&self, name: &str, call: Call) -> Result<Body> {
        let operation = self.resolve(name)?;
        let method = operation.method.clone();
        let path = expand_template(operation.path.trim_start_matches('/'), &call.path_params)?;

        let mut parts = vec![path];
        parts.extend(call.fragments.iter().map(|f| f.trim_matches('/').to_string()));
        let url = join_url(self.session.base_url(), &parts)?;

        tracing::debug!("Operation {} -> {} {}", name, method, url);
        self.dispatch(method, url, call).await
    }

    /// Perform a declared operation and wrap the result as the caller expects
    pub async fn call(&self, name: &str, call: Call, expect: Expect) -> Result<Outcome> {
        let value = self.invoke(name, call).await?.into_data()?;
        match expect {
            Expect::One => Ok(Outcome::Single(Resource::from_json(value, Some(self.clone()))?)),
            Expect::Many => Ok(Outcome::Many(self.wrap_many(value)?)),
        }
    }

    pub async fn call_one(&self, name: &str, call: Call) -> Result<Resource> {
        let value = self.invoke(name, call).await?.into_data()?;
        Resource::from_json(value, Some(self.clone()))
    }

    pub async fn call_many(&self, name: &str, call: Call) -> Result<ResourceCollection> {
        let value = self.invoke(name, call).await?.into_data()?;
        self.wrap_many(value)
    }

    fn wrap_many(&self, value: Value) -> Result<ResourceCollection> {
        let Value::Array(items) = value else {
            return Err(Error::UnexpectedShape {
                expected: "array",
                actual: shape_of(&value),
            });
        };

        let resources = items
            .into_iter()
            .map(|item| Resource::from_json(item, Some(self.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Collection::from_items(resources))
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Api({})", self.path())
    }
}

/// Resolve each fragment relative to the URL built so far.
///
/// The URL so far is treated as a directory, so `v1/` + `pets` + `123` gives
/// `v1/pets/123`. A fragment with a scheme or a leading `/` replaces the path.
pub fn join_url<S: AsRef<str>>(base: &Url, fragments: &[S]) -> Result<Url> {
    let mut url = base.clone();

    for fragment in fragments {
        let fragment = fragment.as_ref();
        if fragment.is_empty() {
            continue;
        }
        if !url.path().ends_with('/') {
            let directory = format!("{}/", url.path());
            url.set_path(&directory);
        }
        url = url.join(fragment)?;
    }

    Ok(url)
}

/// Fill `{name}` placeholders with percent-encoded values
pub fn expand_template(template: &str, params: &BTreeMap<String, String>) -> Result<String> {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        let value = params
            .get(name)
            .ok_or_else(|| Error::MissingPathParam(name.to_string()))?;

        expanded.push_str(&rest[..start]);
        expanded.push_str(&urlencoding::encode(value));
        rest = &rest[start + len + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}
