//! Typed field values
//!
//! Resources store their fields as [`FieldValue`]s rather than raw JSON so they
//! can be checked against a [`Model`](crate::spec::Model) before they reach a
//! persistence collaborator.

use crate::error::{Error, Result};
use crate::spec::FieldType;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Field name to value mapping of a resource
pub type Fields = BTreeMap<String, FieldValue>;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A dynamically typed field value
#[derive(Debug, Clone)]
pub enum FieldValue {
    Null,
    String(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Array(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Decimal(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Semantic type of this value, `None` for null
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::Null => None,
            Self::String(_) => Some(FieldType::String),
            Self::Integer(_) => Some(FieldType::Integer),
            Self::Decimal(_) => Some(FieldType::Decimal),
            Self::Boolean(_) => Some(FieldType::Boolean),
            Self::Array(_) => Some(FieldType::Array),
            Self::Object(_) => Some(FieldType::Object),
            Self::DateTime(_) => Some(FieldType::DateTime),
            Self::Date(_) => Some(FieldType::Date),
            Self::Time(_) => Some(FieldType::Time),
        }
    }

    /// Convert into the given semantic type.
    ///
    /// Temporal types are parsed from strings, integers widen to decimals and
    /// null passes through untouched. Other mismatches are errors.
    pub fn coerce(self, target: FieldType) -> Result<Self> {
        if self.is_null() || self.field_type() == Some(target) {
            return Ok(self);
        }

        let coerced = match (&self, target) {
            (Self::Integer(n), FieldType::Decimal) => Some(Self::Decimal(*n as f64)),
            (Self::String(s), FieldType::DateTime) => {
                DateTime::parse_from_rfc3339(s).ok().map(Self::DateTime)
            },
            (Self::String(s), FieldType::Date) => {
                NaiveDate::parse_from_str(s, DATE_FORMAT).ok().map(Self::Date)
            },
            (Self::String(s), FieldType::Time) => s.parse::<NaiveTime>().ok().map(Self::Time),
            _ => None,
        };

        coerced.ok_or_else(|| {
            Error::Configuration(format!(
                "cannot use {} value as {}",
                self.field_type().map(|t| t.to_string()).unwrap_or_default(),
                target
            ))
        })
    }

    /// Text form used when the value is placed in a URL path
    pub fn to_path_fragment(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            other => match other.to_json() {
                Value::String(s) => s,
                json => json.to_string(),
            },
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Decimal(n) => Value::from(*n),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Self::DateTime(dt) => Value::String(dt.to_rfc3339()),
            Self::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            Self::Time(t) => Value::String(t.to_string()),
        }
    }

    /// Rank used to order values of different variants
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) | Self::Decimal(_) => 2,
            Self::String(_) => 3,
            Self::Date(_) => 4,
            Self::Time(_) => 5,
            Self::DateTime(_) => 6,
            Self::Array(_) => 7,
            Self::Object(_) => 8,
        }
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Integer(a), Self::Decimal(b)) => cmp_int_decimal(*a, *b),
            (Self::Decimal(a), Self::Integer(b)) => cmp_int_decimal(*b, *a).reverse(),
            (Self::Decimal(a), Self::Decimal(b)) => a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b)),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (Self::Array(a), Self::Array(b)) => a.cmp(b),
            (Self::Object(a), Self::Object(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Exact comparison of an integer with a decimal. NaN sorts by its sign,
/// outside every number.
fn cmp_int_decimal(int: i64, decimal: f64) -> Ordering {
    // 2^63, exactly representable
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if decimal.is_nan() {
        return 0.0f64.total_cmp(&decimal);
    }
    if decimal >= LIMIT {
        return Ordering::Less;
    }
    if decimal < -LIMIT {
        return Ordering::Greater;
    }

    let whole = decimal.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => whole.partial_cmp(&decimal).unwrap_or(Ordering::Equal),
        unequal => unequal,
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Decimal(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            },
        }
    }
}

impl From<&FieldValue> for Value {
    fn from(value: &FieldValue) -> Self {
        value.to_json()
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Integer(n.into())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Decimal(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::String(s) => serializer.serialize_str(s),
            Self::Integer(n) => serializer.serialize_i64(*n),
            Self::Decimal(n) => serializer.serialize_f64(*n),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            },
            Self::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            },
            Self::DateTime(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            Self::Date(d) => serializer.serialize_str(&d.format(DATE_FORMAT).to_string()),
            Self::Time(t) => serializer.serialize_str(&t.to_string()),
        }
    }
}

/// Convert a decoded object into fields. `null` is an empty mapping.
pub fn fields_from_json(value: Value) -> Result<Fields> {
    match value {
        Value::Null => Ok(Fields::new()),
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, FieldValue::from(v))).collect()),
        other => Err(Error::UnexpectedShape {
            expected: "object",
            actual: crate::http::shape_of(&other),
        }),
    }
}

/// Convert fields back into a JSON object
pub fn fields_to_json(fields: &Fields) -> Value {
    Value::Object(fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
}
