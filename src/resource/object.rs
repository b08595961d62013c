//! Resource
//!
//! One remote record: a typed field mapping plus the [`Api`] handle used to
//! talk to the server about it. Every lifecycle call is one round trip that
//! merges the server's answer into the local fields.

use super::value::{fields_from_json, fields_to_json, FieldValue, Fields};
use crate::api::{Api, Call};
use crate::error::{Error, Result};
use crate::http::Body;
use crate::persist::{Persistence, TableDescriptor};
use crate::spec::Model;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Name of the distinguished identifier field
pub const ID_FIELD: &str = "id";

/// A remote record
#[derive(Clone, Default)]
pub struct Resource {
    fields: Fields,
    api: Option<Api>,
}

impl Resource {
    /// Unbound resource with initial fields
    pub fn new(fields: Fields) -> Self {
        Self { fields, api: None }
    }

    /// Resource bound to `api`
    pub fn with_api(fields: Fields, api: Api) -> Self {
        Self {
            fields,
            api: Some(api),
        }
    }

    /// Build from a decoded JSON object
    pub fn from_json(value: Value, api: Option<Api>) -> Result<Self> {
        Ok(Self {
            fields: fields_from_json(value)?,
            api,
        })
    }

    pub fn id(&self) -> Option<&FieldValue> {
        self.fields.get(ID_FIELD).filter(|id| !id.is_null())
    }

    pub fn set_id(&mut self, id: impl Into<FieldValue>) {
        self.fields.insert(ID_FIELD.to_string(), id.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Set a field, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }

    pub fn to_json(&self) -> Value {
        fields_to_json(&self.fields)
    }

    pub fn api(&self) -> Option<&Api> {
        self.api.as_ref()
    }

    pub fn bind(&mut self, api: Api) {
        self.api = Some(api);
    }

    /// Overwrite-merge a decoded object into the fields.
    ///
    /// The whole response is converted before any field changes, so a bad
    /// response leaves the resource untouched.
    pub fn merge(&mut self, value: Value) -> Result<()> {
        let incoming = fields_from_json(value)?;
        self.fields.extend(incoming);
        Ok(())
    }

    /// Coerce fields declared by `model` to their declared types.
    ///
    /// All-or-nothing: on error no field is changed.
    pub fn conform(&mut self, model: &Model) -> Result<()> {
        let mut conformed = self.fields.clone();
        for field in &model.fields {
            if let Some(value) = conformed.remove(&field.name) {
                let value = value
                    .coerce(field.field_type)
                    .map_err(|e| Error::Configuration(format!("{}: {}", field.name, e)))?;
                conformed.insert(field.name.clone(), value);
            }
        }
        self.fields = conformed;
        Ok(())
    }

    /// POST the fields to the endpoint and merge the response
    pub async fn create(&mut self) -> Result<()> {
        let body = self.bound()?.post(Call::new().json(self.to_json())).await?;
        self.merge_body(body)
    }

    /// GET by id and merge the response
    pub async fn load(&mut self) -> Result<()> {
        let id = self.id_fragment()?;
        let body = self.bound()?.get(Call::new().path(id)).await?;
        self.merge_body(body)
    }

    /// PUT the fields to the endpoint and merge the response
    pub async fn commit(&mut self) -> Result<()> {
        let body = self.bound()?.put(Call::new().json(self.to_json())).await?;
        self.merge_body(body)
    }

    /// DELETE by id. The local fields are kept.
    pub async fn delete(&self) -> Result<()> {
        let id = self.id_fragment()?;
        self.bound()?.delete(Call::new().path(id)).await?;
        Ok(())
    }

    /// Hand the fields to a persistence collaborator as one row.
    ///
    /// When the table carries a model, the row is conformed to it first.
    pub async fn to_sql(&self, sink: &dyn Persistence, table: &TableDescriptor) -> Result<()> {
        match &table.model {
            Some(model) => {
                let mut row = Resource::new(self.fields.clone());
                row.conform(model)?;
                sink.insert(table, row.fields()).await
            },
            None => sink.insert(table, &self.fields).await,
        }
    }

    fn bound(&self) -> Result<&Api> {
        self.api.as_ref().ok_or(Error::Unbound)
    }

    fn id_fragment(&self) -> Result<String> {
        let id = self.id().ok_or(Error::MissingId)?;
        Ok(urlencoding::encode(&id.to_path_fragment()).into_owned())
    }

    fn merge_body(&mut self, body: Body) -> Result<()> {
        match body {
            Body::Data(value) => self.merge(value),
            Body::Text(text) if text.trim().is_empty() => Ok(()),
            Body::Raw(raw) if raw.bytes.is_empty() => Ok(()),
            other => other.into_data().map(|_| ()),
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for Resource {}

impl Ord for Resource {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fields.cmp(&other.fields)
    }
}

impl PartialOrd for Resource {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Resource");
        debug.field("fields", &self.fields);
        if let Some(api) = &self.api {
            debug.field("api", &api.path());
        }
        debug.finish()
    }
}

impl From<Fields> for Resource {
    fn from(fields: Fields) -> Self {
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Field, FieldType};
    use serde_json::json;

    fn resource(value: Value) -> Resource {
        Resource::from_json(value, None).unwrap()
    }

    #[test]
    fn test_merge_overwrites_and_preserves() {
        let mut r = resource(json!({"id": 1, "name": "Rex", "local": "keep"}));
        r.merge(json!({"name": "Max", "status": "sold"})).unwrap();

        assert_eq!(r.get("name").and_then(FieldValue::as_str), Some("Max"));
        assert_eq!(r.get("status").and_then(FieldValue::as_str), Some("sold"));
        assert_eq!(r.get("local").and_then(FieldValue::as_str), Some("keep"));
        assert_eq!(r.id(), Some(&FieldValue::Integer(1)));
    }

    #[test]
    fn test_failed_merge_leaves_state() {
        let mut r = resource(json!({"id": 1}));
        let before = r.clone();
        assert!(r.merge(json!(["not", "an", "object"])).is_err());
        assert_eq!(r, before);
    }

    #[test]
    fn test_null_id_counts_as_missing() {
        let r = resource(json!({"id": null}));
        assert!(r.id().is_none());
    }

    #[tokio::test]
    async fn test_unbound_lifecycle_fails() {
        let mut r = resource(json!({"id": 1}));
        assert!(matches!(r.create().await, Err(Error::Unbound)));
        assert!(matches!(r.load().await, Err(Error::Unbound)));
    }

    #[tokio::test]
    async fn test_load_without_id_fails_before_io() {
        let mut r = resource(json!({"name": "x"}));
        assert!(matches!(r.load().await, Err(Error::MissingId)));
        assert!(matches!(r.delete().await, Err(Error::MissingId)));
    }

    #[test]
    fn test_conform_is_all_or_nothing() {
        let model = Model {
            name: "Pet".into(),
            fields: vec![
                Field::new("born", FieldType::Date),
                Field::new("age", FieldType::Integer),
            ],
        };

        let mut ok = resource(json!({"born": "2020-01-02", "age": 3, "extra": "x"}));
        ok.conform(&model).unwrap();
        assert!(matches!(ok.get("born"), Some(FieldValue::Date(_))));

        let mut bad = resource(json!({"born": "2020-01-02", "age": "three"}));
        let before = bad.clone();
        assert!(bad.conform(&model).is_err());
        assert_eq!(bad, before);
    }

    #[test]
    fn test_equality_ignores_api() {
        let a = resource(json!({"id": 1, "name": "a"}));
        let b = Resource::new(a.fields().clone());
        assert_eq!(a, b);
    }
}
