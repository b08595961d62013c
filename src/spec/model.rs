//! Data models declared by a spec
//!
//! A [`Model`] is the ordered list of typed fields describing one record shape.
//! It is what a persistence collaborator uses to lay out a table.

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;

/// Semantic type of a model field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Decimal,
    Boolean,
    Array,
    Object,
    DateTime,
    Date,
    Time,
}

impl FieldType {
    /// Resolve the type of a JSON-schema fragment.
    ///
    /// `string` is refined by its `format` (`date-time`, `date`, `time`), and a bare
    /// `$ref` is treated as an object. Anything else is a configuration error.
    pub fn from_schema(schema: &Value) -> Result<Self> {
        let declared = match schema.get("type").and_then(Value::as_str) {
            Some(declared) => declared,
            None if schema.get("$ref").is_some() => return Ok(Self::Object),
            None => {
                return Err(Error::Configuration(
                    "field declares no type".to_string(),
                ))
            },
        };

        match declared {
            "string" => Ok(match schema.get("format").and_then(Value::as_str) {
                Some("date-time") => Self::DateTime,
                Some("date") => Self::Date,
                Some("time") => Self::Time,
                _ => Self::String,
            }),
            "integer" => Ok(Self::Integer),
            "number" => Ok(Self::Decimal),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            other => Err(Error::Configuration(format!(
                "unsupported field type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
        };
        f.write_str(name)
    }
}

/// One named, typed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered sequence of fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Model {
    /// Build a model from a schema object with a `properties` map.
    ///
    /// Schemas without `properties` (enums, compositions) yield an empty model.
    pub fn from_schema(name: &str, schema: &Value) -> Result<Self> {
        let mut fields = Vec::new();

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (field_name, property) in properties {
                let field_type = FieldType::from_schema(property).map_err(|e| {
                    Error::Configuration(format!("{}.{}: {}", name, field_name, e))
                })?;
                fields.push(Field::new(field_name.clone(), field_type));
            }
        }

        Ok(Self {
            name: name.to_string(),
            fields,
        })
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
