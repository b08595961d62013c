//! Persistence collaborator boundary
//!
//! Table creation, type mapping and statement execution live outside this
//! crate. Resources only need somewhere to send one row per record.

use crate::error::{Error, Result};
use crate::resource::Fields;
use crate::spec::Model;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// What to do when the target table already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IfExists {
    #[default]
    Fail,
    Replace,
    Append,
}

impl FromStr for IfExists {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fail" => Ok(Self::Fail),
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            other => Err(Error::Configuration(format!(
                "'{}' is not valid for if_exists",
                other
            ))),
        }
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fail => "fail",
            Self::Replace => "replace",
            Self::Append => "append",
        })
    }
}

/// Named target table
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    pub name: String,
    pub schema: Option<String>,
    /// Rows are conformed to this model before insertion
    pub model: Option<Model>,
    pub if_exists: IfExists,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            model: None,
            if_exists: IfExists::default(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    pub fn if_exists(mut self, policy: IfExists) -> Self {
        self.if_exists = policy;
        self
    }

    /// `schema.name`, or just `name`
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

/// Receives one row per resource. No upsert semantics.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn insert(&self, table: &TableDescriptor, row: &Fields) -> Result<()>;
}
