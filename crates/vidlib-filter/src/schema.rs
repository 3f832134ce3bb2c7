//! Record schema and the record access contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::datetime::DateParser;
use crate::error::{CollaboratorError, SchemaError};
use crate::types::DomainType;
use crate::value::{Instant, TagSet, Value};

/// Default name of the identity field.
pub const DEFAULT_HANDLE: &str = "handle";

fn default_handle() -> String {
    DEFAULT_HANDLE.to_string()
}

/// The typed, single-valued fields a record exposes, plus the name of its
/// integer identity field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Name of the integer identity field used for tag lookups.
    #[serde(default = "default_handle")]
    handle: String,

    /// Field name -> declared type.
    #[serde(default)]
    fields: BTreeMap<String, DomainType>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE)
    }
}

impl Schema {
    /// Creates an empty schema whose identity field is `handle`.
    ///
    /// The handle field itself still has to be declared with
    /// [`with_field`](Self::with_field).
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Declares a field.
    pub fn with_field(mut self, name: impl Into<String>, domain: DomainType) -> Self {
        self.fields.insert(name.into(), domain);
        self
    }

    /// The identity field name.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// The declared type of a field (case-sensitive).
    pub fn field_type(&self, name: &str) -> Option<DomainType> {
        self.fields.get(name).copied()
    }

    /// Iterates declared fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, DomainType)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Checks that the identity field is declared as an Integer.
    pub fn validate(&self) -> Result<(), SchemaError> {
        match self.field_type(&self.handle) {
            None => Err(SchemaError::MissingHandle {
                name: self.handle.clone(),
            }),
            Some(DomainType::Integer) => Ok(()),
            Some(actual) => Err(SchemaError::HandleNotInteger {
                name: self.handle.clone(),
                actual,
            }),
        }
    }
}

/// A field value as a record stores it.
///
/// Records may keep integers in a narrower representation; the engine widens
/// them to its 64-bit Integer type on read.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i32),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    TimeStamp(Instant),
    Tag(TagSet),
}

impl FieldValue {
    /// Converts into an engine value, widening narrow integers.
    pub fn into_value(self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s),
            FieldValue::Int(i) => Value::Integer(i64::from(i)),
            FieldValue::Integer(i) => Value::Integer(i),
            FieldValue::Double(d) => Value::Double(d),
            FieldValue::Boolean(b) => Value::Boolean(b),
            FieldValue::TimeStamp(t) => Value::TimeStamp(t),
            FieldValue::Tag(t) => Value::Tag(t),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => FieldValue::String(s),
            Value::Integer(i) => FieldValue::Integer(i),
            Value::Double(d) => FieldValue::Double(d),
            Value::Boolean(b) => FieldValue::Boolean(b),
            Value::TimeStamp(t) => FieldValue::TimeStamp(t),
            Value::Tag(t) => FieldValue::Tag(t),
        }
    }
}

/// By-name field access on a record instance.
pub trait Record {
    /// The value of `field`, or `None` if the record has none.
    fn field(&self, name: &str) -> Option<FieldValue>;
}

/// A [`Record`] backed by a map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapRecord {
    values: BTreeMap<String, FieldValue>,
}

impl MapRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Sets a field.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builds a record from a JSON object, converting each declared field
    /// according to its schema type. Undeclared keys and `null`s are skipped.
    pub fn from_json(
        object: &serde_json::Map<String, serde_json::Value>,
        schema: &Schema,
        dates: &dyn DateParser,
    ) -> Result<Self, CollaboratorError> {
        use serde_json::Value as Json;

        let mut record = Self::new();
        for (name, domain) in schema.fields() {
            let Some(json) = object.get(name) else {
                continue;
            };
            let value = match (domain, json) {
                (_, Json::Null) => continue,
                (DomainType::String, Json::String(s)) => FieldValue::String(s.clone()),
                (DomainType::Integer, Json::Number(n)) if n.is_i64() => {
                    FieldValue::Integer(n.as_i64().unwrap_or_default())
                }
                (DomainType::Double, Json::Number(n)) => match n.as_f64() {
                    Some(d) => FieldValue::Double(d),
                    None => return Err(CollaboratorError::mismatch(name, domain, n.to_string())),
                },
                (DomainType::Boolean, Json::Bool(b)) => FieldValue::Boolean(*b),
                (DomainType::TimeStamp, Json::String(s)) => {
                    FieldValue::TimeStamp(Instant::parse(s, dates)?)
                }
                (DomainType::Tag, Json::Array(items)) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Json::String(s) => values.push(s.clone()),
                            other => {
                                return Err(CollaboratorError::mismatch(
                                    name,
                                    domain,
                                    other.to_string(),
                                ))
                            }
                        }
                    }
                    FieldValue::Tag(TagSet::new(values))
                }
                (_, other) => {
                    return Err(CollaboratorError::mismatch(name, domain, other.to_string()))
                }
            };
            record.insert(name, value);
        }
        Ok(record)
    }
}

impl Record for MapRecord {
    fn field(&self, name: &str) -> Option<FieldValue> {
        self.values.get(name).cloned()
    }
}

macro_rules! field_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value.into())
                }
            }
        )*
    };
}

field_value_from! {
    &str => String,
    String => String,
    i32 => Int,
    i64 => Integer,
    f64 => Double,
    bool => Boolean,
    Instant => TimeStamp,
    TagSet => Tag,
}
