//! Conversions from [`WireValue`] to typed values.
//!
//! Every function here is total over the non-null wire cases and reports a
//! plain message on failure; the row attaches the column label.

use crate::dialect::Dialect;
use crate::row::pg_array::parse_elements;
use crate::value::{Enumeration, WireValue, invalid_enum};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

pub(crate) type Coerced<T> = Result<T, String>;

fn text(value: &WireValue) -> Option<&str> {
    match value {
        WireValue::Text(s) => Some(s),
        WireValue::Bytes(b) => std::str::from_utf8(b).ok(),
        _ => None,
    }
}

fn mismatch(value: &WireValue, target: &str) -> String {
    format!("cannot convert {} to {target}", value.kind_name())
}

// ==================== Numbers ====================

/// A numeric destination type.
pub trait Numeric: Sized + Copy + Default {
    const NAME: &'static str;

    fn from_i64(v: i64) -> Option<Self>;

    fn from_f64(v: f64) -> Option<Self>;

    fn parse(s: &str) -> Option<Self>;
}

macro_rules! impl_numeric_int {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                const NAME: &'static str = stringify!($ty);

                fn from_i64(v: i64) -> Option<Self> {
                    <$ty>::try_from(v).ok()
                }

                fn from_f64(v: f64) -> Option<Self> {
                    if v.fract() != 0.0 || !v.is_finite() {
                        return None;
                    }
                    // MAX + 1 is a power of two, exact even where MAX is not
                    if v < <$ty>::MIN as f64 || v >= <$ty>::MAX as f64 + 1.0 {
                        return None;
                    }
                    Some(v as $ty)
                }

                fn parse(s: &str) -> Option<Self> {
                    s.parse::<$ty>()
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().and_then(Self::from_f64))
                }
            }
        )*
    };
}

impl_numeric_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Numeric for f64 {
    const NAME: &'static str = "f64";

    fn from_i64(v: i64) -> Option<Self> {
        Some(v as f64)
    }

    fn from_f64(v: f64) -> Option<Self> {
        Some(v)
    }

    fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

impl Numeric for f32 {
    const NAME: &'static str = "f32";

    fn from_i64(v: i64) -> Option<Self> {
        Some(v as f32)
    }

    fn from_f64(v: f64) -> Option<Self> {
        Some(v as f32)
    }

    fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

pub(crate) fn number<T: Numeric>(value: &WireValue) -> Coerced<T> {
    let converted = match value {
        WireValue::Int(n) => T::from_i64(*n),
        WireValue::Float(f) => T::from_f64(*f),
        WireValue::Text(_) | WireValue::Bytes(_) => {
            let Some(s) = text(value) else {
                return Err(mismatch(value, T::NAME));
            };
            let parsed = T::parse(s.trim());
            if parsed.is_none() {
                return Err(format!("{s:?} is not a valid {}", T::NAME));
            }
            parsed
        }
        _ => return Err(mismatch(value, T::NAME)),
    };
    converted.ok_or_else(|| format!("{value:?} is out of range for {}", T::NAME))
}

// ==================== Scalars ====================

pub(crate) fn bytes(value: &WireValue) -> Coerced<Vec<u8>> {
    match value {
        WireValue::Bytes(b) => Ok(b.clone()),
        WireValue::Text(s) => Ok(s.clone().into_bytes()),
        _ => Err(mismatch(value, "bytes")),
    }
}

pub(crate) fn boolean(value: &WireValue) -> Coerced<bool> {
    match value {
        WireValue::Bool(b) => Ok(*b),
        WireValue::Int(0) => Ok(false),
        WireValue::Int(1) => Ok(true),
        WireValue::Text(_) | WireValue::Bytes(_) => match text(value) {
            Some("1" | "t" | "true" | "TRUE") => Ok(true),
            Some("0" | "f" | "false" | "FALSE") => Ok(false),
            Some(s) => Err(format!("{s:?} is not a valid bool")),
            None => Err(mismatch(value, "bool")),
        },
        _ => Err(mismatch(value, "bool")),
    }
}

pub(crate) fn string(value: &WireValue) -> Coerced<String> {
    match value {
        WireValue::Text(s) => Ok(s.clone()),
        WireValue::Bytes(b) => String::from_utf8(b.clone()).map_err(|e| e.to_string()),
        WireValue::Int(n) => Ok(n.to_string()),
        WireValue::Float(f) => Ok(f.to_string()),
        WireValue::Bool(b) => Ok(b.to_string()),
        WireValue::Time(t) => Ok(t.to_rfc3339()),
        WireValue::Null => Err(mismatch(value, "string")),
    }
}

// ==================== Time ====================

const ZONED_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse the timestamp layouts SQLite and text-protocol drivers produce.
/// Values without an offset are taken as UTC.
pub(crate) fn parse_time(s: &str) -> Coerced<DateTime<Utc>> {
    let s = s.trim();
    let s = s.strip_suffix('Z').unwrap_or(s);
    for format in ZONED_FORMATS {
        if let Ok(t) = DateTime::parse_from_str(s, format) {
            return Ok(t.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(t.and_utc());
        }
    }
    if let Some(t) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(t.and_utc());
    }
    Err(format!("{s:?} is not a recognized timestamp"))
}

pub(crate) fn time(value: &WireValue) -> Coerced<DateTime<Utc>> {
    match value {
        WireValue::Time(t) => Ok(t.with_timezone(&Utc)),
        WireValue::Text(_) | WireValue::Bytes(_) => match text(value) {
            Some(s) => parse_time(s),
            None => Err(mismatch(value, "time")),
        },
        _ => Err(mismatch(value, "time")),
    }
}

// ==================== JSON / UUID / enum ====================

pub(crate) fn json_as<T: DeserializeOwned>(value: &WireValue) -> Coerced<T> {
    match value {
        WireValue::Text(s) => serde_json::from_str(s).map_err(|e| format!("unmarshaling json {s:?}: {e}")),
        WireValue::Bytes(b) => serde_json::from_slice(b).map_err(|e| format!("unmarshaling json: {e}")),
        _ => Err(mismatch(value, "json")),
    }
}

pub(crate) fn uuid(value: &WireValue) -> Coerced<Uuid> {
    match value {
        WireValue::Bytes(b) if b.len() == 16 => Uuid::from_slice(b).map_err(|e| e.to_string()),
        WireValue::Text(_) | WireValue::Bytes(_) => match text(value) {
            Some(s) => Uuid::parse_str(s.trim()).map_err(|e| format!("{s:?} is not a valid uuid: {e}")),
            None => Err(mismatch(value, "uuid")),
        },
        _ => Err(mismatch(value, "uuid")),
    }
}

pub(crate) fn enumeration<E: Enumeration>(value: &WireValue) -> Coerced<E> {
    match value {
        WireValue::Int(n) => usize::try_from(*n)
            .ok()
            .and_then(E::from_index)
            .filter(|e| e.name().is_some())
            .ok_or_else(|| invalid_enum::<E>(&n.to_string())),
        WireValue::Text(_) | WireValue::Bytes(_) => {
            let name = text(value).unwrap_or_default();
            E::from_name(name).ok_or_else(|| invalid_enum::<E>(name))
        }
        other => Err(invalid_enum::<E>(other.kind_name())),
    }
}

// ==================== Arrays ====================

/// Element types readable from an array column.
pub trait ArrayElement: DeserializeOwned + Sized {
    /// Parse one unquoted element of a Postgres array literal.
    fn parse_pg(element: &str) -> Coerced<Self>;
}

impl ArrayElement for String {
    fn parse_pg(element: &str) -> Coerced<Self> {
        Ok(element.to_string())
    }
}

impl ArrayElement for bool {
    fn parse_pg(element: &str) -> Coerced<Self> {
        match element {
            "t" | "true" | "TRUE" => Ok(true),
            "f" | "false" | "FALSE" => Ok(false),
            other => Err(format!("{other:?} is not a valid bool")),
        }
    }
}

macro_rules! impl_array_element {
    ($($ty:ty),*) => {
        $(
            impl ArrayElement for $ty {
                fn parse_pg(element: &str) -> Coerced<Self> {
                    element
                        .parse()
                        .map_err(|_| format!("{element:?} is not a valid {}", stringify!($ty)))
                }
            }
        )*
    };
}

impl_array_element!(i16, i32, i64, f32, f64);

/// Native array literal on Postgres, JSON everywhere else.
pub(crate) fn array<T: ArrayElement>(dialect: Dialect, value: &WireValue) -> Coerced<Vec<T>> {
    if dialect != Dialect::Postgres {
        return json_as(value);
    }
    let Some(s) = text(value) else {
        return Err(mismatch(value, "array"));
    };
    parse_elements(s)?
        .iter()
        .map(|element| T::parse_pg(element))
        .collect()
}
