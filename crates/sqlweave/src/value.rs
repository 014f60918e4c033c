//! Wire values and bind values.
//!
//! [`WireValue`] is the closed set of shapes a driver hands back and accepts
//! as arguments. [`Value`] is what callers pass to the builder: wire values
//! plus the richer kinds (JSON, UUID, arrays, expandable lists, named
//! parameters and self-rendering SQL) that are lowered to wire values per
//! dialect when bound.

use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::render::SqlWriter;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A driver-level value.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Time(DateTime<FixedOffset>),
}

impl WireValue {
    /// Short name of the wire case, used in coercion messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Bool(_) => "bool",
            WireValue::Int(_) => "int",
            WireValue::Float(_) => "float",
            WireValue::Text(_) => "text",
            WireValue::Bytes(_) => "bytes",
            WireValue::Time(_) => "time",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }
}

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        WireValue::Text(v.to_string())
    }
}

impl From<String> for WireValue {
    fn from(v: String) -> Self {
        WireValue::Text(v)
    }
}

impl From<i64> for WireValue {
    fn from(v: i64) -> Self {
        WireValue::Int(v)
    }
}

impl From<i32> for WireValue {
    fn from(v: i32) -> Self {
        WireValue::Int(i64::from(v))
    }
}

impl From<f64> for WireValue {
    fn from(v: f64) -> Self {
        WireValue::Float(v)
    }
}

impl From<bool> for WireValue {
    fn from(v: bool) -> Self {
        WireValue::Bool(v)
    }
}

impl From<Vec<u8>> for WireValue {
    fn from(v: Vec<u8>) -> Self {
        WireValue::Bytes(v)
    }
}

impl From<DateTime<Utc>> for WireValue {
    fn from(v: DateTime<Utc>) -> Self {
        WireValue::Time(v.fixed_offset())
    }
}

/// A homogeneous array bound as a single argument.
///
/// Postgres receives a native array literal, every other dialect a JSON array.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Strings(Vec<String>),
    Int64(Vec<i64>),
    Int32(Vec<i32>),
    Int16(Vec<i16>),
    Float64(Vec<f64>),
    Float32(Vec<f32>),
    Bools(Vec<bool>),
}

impl ArrayValue {
    fn encode(&self, dialect: Dialect) -> SqlResult<WireValue> {
        if dialect == Dialect::Postgres {
            return Ok(WireValue::Text(self.pg_literal()));
        }
        let json = match self {
            ArrayValue::Strings(v) => serde_json::to_string(v)?,
            ArrayValue::Int64(v) => serde_json::to_string(v)?,
            ArrayValue::Int32(v) => serde_json::to_string(v)?,
            ArrayValue::Int16(v) => serde_json::to_string(v)?,
            ArrayValue::Float64(v) => serde_json::to_string(v)?,
            ArrayValue::Float32(v) => serde_json::to_string(v)?,
            ArrayValue::Bools(v) => serde_json::to_string(v)?,
        };
        Ok(WireValue::Text(json))
    }

    fn pg_literal(&self) -> String {
        fn join<T>(items: &[T], f: impl Fn(&T) -> String) -> String {
            let parts: Vec<String> = items.iter().map(f).collect();
            format!("{{{}}}", parts.join(","))
        }
        fn float(v: f64) -> String {
            if v.is_nan() {
                "NaN".to_string()
            } else if v.is_infinite() {
                if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
            } else {
                v.to_string()
            }
        }
        match self {
            ArrayValue::Strings(v) => join(v, |s| {
                let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{escaped}\"")
            }),
            ArrayValue::Int64(v) => join(v, |n| n.to_string()),
            ArrayValue::Int32(v) => join(v, |n| n.to_string()),
            ArrayValue::Int16(v) => join(v, |n| n.to_string()),
            ArrayValue::Float64(v) => join(v, |n| float(*n)),
            ArrayValue::Float32(v) => join(v, |n| float(f64::from(*n))),
            ArrayValue::Bools(v) => join(v, |b| if *b { "t" } else { "f" }.to_string()),
        }
    }
}

macro_rules! impl_array_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for ArrayValue {
                fn from(v: Vec<$ty>) -> Self {
                    ArrayValue::$variant(v)
                }
            }
        )*
    };
}

impl_array_from!(
    String => Strings,
    i64 => Int64,
    i32 => Int32,
    i16 => Int16,
    f64 => Float64,
    f32 => Float32,
    bool => Bools,
);

impl From<Vec<&str>> for ArrayValue {
    fn from(v: Vec<&str>) -> Self {
        ArrayValue::Strings(v.into_iter().map(str::to_string).collect())
    }
}

/// A closed set of named values stored by name (or by index on the wire).
///
/// `variants()` is the ordered name list; an empty name marks an unused slot.
pub trait Enumeration: Sized {
    /// Type name used in error messages.
    const TYPE_NAME: &'static str;

    fn variants() -> &'static [&'static str];

    fn index(&self) -> usize;

    fn from_index(index: usize) -> Option<Self>;

    /// The declared name, or `None` when the index has no name.
    fn name(&self) -> Option<&'static str> {
        Self::variants()
            .get(self.index())
            .copied()
            .filter(|name| !name.is_empty())
    }

    fn from_name(name: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        Self::variants()
            .iter()
            .position(|candidate| *candidate == name)
            .and_then(Self::from_index)
    }
}

pub(crate) fn invalid_enum<E: Enumeration>(shown: &str) -> String {
    let valid: Vec<&str> = E::variants()
        .iter()
        .copied()
        .filter(|name| !name.is_empty())
        .collect();
    format!(
        "{shown:?} is not a valid {} (valid values: {})",
        E::TYPE_NAME,
        valid.join(", ")
    )
}

/// A named bind value.
///
/// SQLite and SQL Server keep the name in the statement (`$name`, `@name`)
/// and bind once; Postgres refers back to the first position; MySQL and the
/// generic dialect repeat the value per occurrence.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub(crate) name: String,
    pub(crate) value: Box<Value>,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Create a named parameter.
pub fn param(name: impl Into<String>, value: impl Into<Value>) -> Parameter {
    Parameter {
        name: name.into(),
        value: Box::new(value.into()),
    }
}

/// A value handed to the renderer.
#[derive(Clone)]
pub enum Value {
    /// Bound as-is.
    Wire(WireValue),
    /// Serialized to JSON text when bound.
    Json(serde_json::Value),
    /// Text on Postgres, 16 raw bytes elsewhere.
    Uuid(Uuid),
    /// Native array literal on Postgres, JSON elsewhere.
    Array(ArrayValue),
    /// Expanded element by element, comma separated.
    List(Vec<Value>),
    /// A named parameter.
    Named(Parameter),
    /// Renders itself.
    Sql(Arc<dyn SqlWriter>),
}

impl Value {
    pub fn null() -> Self {
        Value::Wire(WireValue::Null)
    }

    /// An expandable list, e.g. for `IN ({})`.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// An array bound as one argument.
    pub fn array(items: impl Into<ArrayValue>) -> Self {
        Value::Array(items.into())
    }

    /// JSON-encode any serializable value.
    pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> SqlResult<Self> {
        Ok(Value::Json(serde_json::to_value(value)?))
    }

    /// Wrap anything that renders itself.
    pub fn sql(writer: impl SqlWriter + 'static) -> Self {
        Value::Sql(Arc::new(writer))
    }

    /// Lower to the wire value bound for `dialect`.
    pub(crate) fn to_wire(&self, dialect: Dialect) -> SqlResult<WireValue> {
        match self {
            Value::Wire(v) => Ok(v.clone()),
            Value::Json(v) => Ok(WireValue::Text(serde_json::to_string(v)?)),
            Value::Uuid(u) => Ok(if dialect == Dialect::Postgres {
                WireValue::Text(u.hyphenated().to_string())
            } else {
                WireValue::Bytes(u.as_bytes().to_vec())
            }),
            Value::Array(a) => a.encode(dialect),
            Value::List(_) | Value::Named(_) | Value::Sql(_) => Err(SqlError::render(
                "value cannot be bound as a single argument",
            )),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Wire(v) => f.debug_tuple("Wire").field(v).finish(),
            Value::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Value::Uuid(v) => f.debug_tuple("Uuid").field(v).finish(),
            Value::Array(v) => f.debug_tuple("Array").field(v).finish(),
            Value::List(v) => f.debug_tuple("List").field(v).finish(),
            Value::Named(p) => f.debug_tuple("Named").field(p).finish(),
            Value::Sql(w) => f.debug_tuple("Sql").field(w).finish(),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => |$v:ident| $conv:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    Value::Wire($conv)
                }
            }
        )*
    };
}

impl_value_from!(
    bool => |v| WireValue::Bool(v),
    i8 => |v| WireValue::Int(i64::from(v)),
    i16 => |v| WireValue::Int(i64::from(v)),
    i32 => |v| WireValue::Int(i64::from(v)),
    i64 => |v| WireValue::Int(v),
    u8 => |v| WireValue::Int(i64::from(v)),
    u16 => |v| WireValue::Int(i64::from(v)),
    u32 => |v| WireValue::Int(i64::from(v)),
    f32 => |v| WireValue::Float(f64::from(v)),
    f64 => |v| WireValue::Float(v),
    &str => |v| WireValue::Text(v.to_string()),
    String => |v| WireValue::Text(v),
    &[u8] => |v| WireValue::Bytes(v.to_vec()),
    Vec<u8> => |v| WireValue::Bytes(v),
    DateTime<Utc> => |v| WireValue::Time(v.fixed_offset()),
    DateTime<FixedOffset> => |v| WireValue::Time(v),
    NaiveDateTime => |v| WireValue::Time(v.and_utc().fixed_offset()),
    WireValue => |v| v,
);

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<ArrayValue> for Value {
    fn from(v: ArrayValue) -> Self {
        Value::Array(v)
    }
}

impl From<Parameter> for Value {
    fn from(p: Parameter) -> Self {
        Value::Named(p)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or_else(Value::null, Into::into)
    }
}
