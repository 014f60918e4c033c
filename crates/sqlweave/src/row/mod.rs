//! Read-side mapping of result rows.
//!
//! A row mapper is a closure over `&mut Row`. It is called once against a
//! *plan* row before the statement runs: every accessor records the column it
//! reads and returns an empty value. The recorded [`ScanPlan`] becomes the
//! statement's result fields and is turned into a [`Scanner`], which builds
//! one *live* row per fetched record. Live rows must be read in the order the
//! plan recorded.
//!
//! Statements that cannot take result fields (raw queries, SELECTs with an
//! explicit projection) produce *static* rows instead: a snapshot addressed by
//! column name, readable in any order and any number of times.
//!
//! ```ignore
//! let actor = |row: &mut Row| -> SqlResult<Actor> {
//!     Ok(Actor {
//!         id: row.int64(&a.number("actor_id"))?,
//!         name: row.string(&a.string("first_name"))?,
//!     })
//! };
//! ```

mod coerce;
mod pg_array;

pub use coerce::{ArrayElement, Numeric};

use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::field::{Expression, Field, FieldKind, expr};
use crate::value::{Enumeration, WireValue};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// What an accessor asked for, recorded during the dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    Value,
    Bytes,
    Bool,
    Number,
    String,
    Time,
    Json,
    Uuid,
    Enum,
    Array,
}

impl ScanKind {
    pub fn name(self) -> &'static str {
        match self {
            ScanKind::Value => "value",
            ScanKind::Bytes => "bytes",
            ScanKind::Bool => "bool",
            ScanKind::Number => "number",
            ScanKind::String => "string",
            ScanKind::Time => "time",
            ScanKind::Json => "json",
            ScanKind::Uuid => "uuid",
            ScanKind::Enum => "enum",
            ScanKind::Array => "array",
        }
    }

    fn field_kind(self) -> Option<FieldKind> {
        match self {
            ScanKind::Value | ScanKind::String => None,
            ScanKind::Bytes => Some(FieldKind::Binary),
            ScanKind::Bool => Some(FieldKind::Boolean),
            ScanKind::Number => Some(FieldKind::Number),
            ScanKind::Time => Some(FieldKind::Time),
            ScanKind::Json => Some(FieldKind::Json),
            ScanKind::Uuid => Some(FieldKind::Uuid),
            ScanKind::Enum => Some(FieldKind::Enum),
            ScanKind::Array => Some(FieldKind::Array),
        }
    }
}

/// The column an accessor reads: a column name, a field, or an expression
/// such as `exprf("COALESCE({}, 0)", [field])`.
///
/// Static rows address expressions by their template text.
#[derive(Debug, Clone, Copy)]
pub enum ColumnRef<'a> {
    Name(&'a str),
    Field(&'a Field),
    Expr(&'a Expression),
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(name: &'a str) -> Self {
        ColumnRef::Name(name)
    }
}

impl<'a> From<&'a String> for ColumnRef<'a> {
    fn from(name: &'a String) -> Self {
        ColumnRef::Name(name)
    }
}

impl<'a> From<&'a Field> for ColumnRef<'a> {
    fn from(field: &'a Field) -> Self {
        ColumnRef::Field(field)
    }
}

impl<'a> From<&'a Expression> for ColumnRef<'a> {
    fn from(e: &'a Expression) -> Self {
        ColumnRef::Expr(e)
    }
}

/// Fields and kinds recorded by a dry run, in read order.
#[derive(Debug, Clone, Default)]
pub struct ScanPlan {
    fields: Vec<Field>,
    kinds: Vec<ScanKind>,
}

impl ScanPlan {
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn kinds(&self) -> &[ScanKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Freeze the plan. Consumes it, so a plan drives exactly one scan.
    pub fn into_scanner(self, dialect: Dialect) -> Scanner {
        let labels: Vec<String> = self
            .fields
            .iter()
            .map(|f| f.alias().unwrap_or(f.name()).to_string())
            .collect();
        Scanner {
            dialect,
            kinds: self.kinds.into(),
            labels: labels.into(),
        }
    }
}

/// Builds live rows for one statement.
#[derive(Debug, Clone)]
pub struct Scanner {
    dialect: Dialect,
    kinds: Arc<[ScanKind]>,
    labels: Arc<[String]>,
}

impl Scanner {
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// A live row over one fetched record.
    pub fn row(&self, values: Vec<WireValue>) -> SqlResult<Row> {
        if values.len() != self.kinds.len() {
            return Err(SqlError::mode(format!(
                "fetched {} values but the row mapper reads {}",
                values.len(),
                self.kinds.len()
            )));
        }
        Ok(Row {
            dialect: self.dialect,
            state: State::Live {
                kinds: Arc::clone(&self.kinds),
                labels: Arc::clone(&self.labels),
                values,
                cursor: 0,
            },
        })
    }
}

/// Column names of a static result set.
#[derive(Debug, Clone)]
pub struct StaticColumns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl StaticColumns {
    /// Index `names`; on duplicates the first column wins.
    pub fn new(names: Vec<String>) -> Arc<Self> {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Arc::new(Self { names, index })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[derive(Debug)]
enum State {
    Plan(ScanPlan),
    Live {
        kinds: Arc<[ScanKind]>,
        labels: Arc<[String]>,
        values: Vec<WireValue>,
        cursor: usize,
    },
    Static {
        columns: Arc<StaticColumns>,
        values: Vec<WireValue>,
    },
}

/// One result row handed to a row mapper.
#[derive(Debug)]
pub struct Row {
    dialect: Dialect,
    state: State,
}

impl Row {
    /// A dry-run row that records what the mapper reads.
    pub fn plan(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: State::Plan(ScanPlan::default()),
        }
    }

    /// The recorded plan; empty for rows that are not plan rows.
    pub fn into_plan(self) -> ScanPlan {
        match self.state {
            State::Plan(plan) => plan,
            _ => ScanPlan::default(),
        }
    }

    /// A static row over one fetched record.
    pub fn new_static(dialect: Dialect, columns: Arc<StaticColumns>, values: Vec<WireValue>) -> SqlResult<Self> {
        if values.len() != columns.names.len() {
            return Err(SqlError::mode(format!(
                "fetched {} values for {} columns",
                values.len(),
                columns.names.len()
            )));
        }
        Ok(Self {
            dialect,
            state: State::Static { columns, values },
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn is_plan(&self) -> bool {
        matches!(self.state, State::Plan(_))
    }

    pub fn is_static(&self) -> bool {
        matches!(self.state, State::Static { .. })
    }

    /// Column names of a static row, labels of a live row.
    pub fn columns(&self) -> Vec<&str> {
        match &self.state {
            State::Plan(_) => Vec::new(),
            State::Live { labels, .. } => labels.iter().map(String::as_str).collect(),
            State::Static { columns, .. } => columns.names.iter().map(String::as_str).collect(),
        }
    }

    /// The raw values of a static row.
    pub fn values(&self) -> SqlResult<&[WireValue]> {
        match &self.state {
            State::Static { values, .. } => Ok(values),
            _ => Err(SqlError::mode("values can only be read from static rows")),
        }
    }

    /// Wire case of each value of a static row; the planned read kinds of a
    /// live row.
    pub fn column_types(&self) -> Vec<&'static str> {
        match &self.state {
            State::Plan(_) => Vec::new(),
            State::Live { kinds, .. } => kinds.iter().map(|k| k.name()).collect(),
            State::Static { values, .. } => values.iter().map(WireValue::kind_name).collect(),
        }
    }

    /// Locate the next value for `column`, or record it on a plan row.
    fn fetch(&mut self, column: ColumnRef<'_>, kind: ScanKind, accessor: &str) -> SqlResult<Option<(String, WireValue)>> {
        match &mut self.state {
            State::Plan(plan) => {
                let field = match column {
                    ColumnRef::Name(name) => Field::from(expr(name)),
                    ColumnRef::Expr(e) => Field::from(e.clone()),
                    ColumnRef::Field(field) => {
                        if let Some(expected) = kind.field_kind() {
                            if !field.accepts(expected) {
                                return Err(SqlError::coercion(
                                    field.name(),
                                    format!("{accessor} cannot read a {} field", field.kind().map_or("expression", FieldKind::name)),
                                ));
                            }
                        }
                        field.clone()
                    }
                };
                plan.fields.push(field);
                plan.kinds.push(kind);
                Ok(None)
            }
            State::Live {
                kinds,
                labels,
                values,
                cursor,
            } => {
                let position = *cursor;
                let Some(&planned) = kinds.get(position) else {
                    return Err(SqlError::mode(format!(
                        "{accessor} called more times than during the dry run ({} reads)",
                        kinds.len()
                    )));
                };
                if planned != kind {
                    return Err(SqlError::mode(format!(
                        "{accessor} called out of order: read {} was a {} read during the dry run",
                        position + 1,
                        planned.name()
                    )));
                }
                *cursor += 1;
                let value = std::mem::replace(&mut values[position], WireValue::Null);
                Ok(Some((labels[position].clone(), value)))
            }
            State::Static { columns, values } => {
                let name = match column {
                    ColumnRef::Name(name) => name,
                    ColumnRef::Expr(e) => e.format(),
                    ColumnRef::Field(_) => {
                        return Err(SqlError::mode(format!(
                            "cannot call {accessor} with a field for static queries, use the column name"
                        )));
                    }
                };
                let Some(&index) = columns.index.get(name) else {
                    return Err(SqlError::coercion(
                        name,
                        format!(
                            "column does not exist (available columns: {})",
                            columns.names.join(", ")
                        ),
                    ));
                };
                Ok(Some((name.to_string(), values[index].clone())))
            }
        }
    }

    fn get<T>(
        &mut self,
        column: ColumnRef<'_>,
        kind: ScanKind,
        accessor: &str,
        convert: impl FnOnce(Dialect, &WireValue) -> Result<T, String>,
    ) -> SqlResult<Option<T>> {
        let dialect = self.dialect;
        match self.fetch(column, kind, accessor)? {
            None => Ok(None),
            Some((_, WireValue::Null)) => Ok(None),
            Some((label, value)) => convert(dialect, &value)
                .map(Some)
                .map_err(|message| SqlError::coercion(label, message)),
        }
    }

    // ==================== Accessors ====================

    /// The value as fetched; `Null` during the dry run.
    pub fn value<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<WireValue> {
        Ok(self
            .get(column.into(), ScanKind::Value, "value", |_, v| Ok(v.clone()))?
            .unwrap_or(WireValue::Null))
    }

    pub fn null_bytes<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<Vec<u8>>> {
        self.get(column.into(), ScanKind::Bytes, "bytes", |_, v| coerce::bytes(v))
    }

    pub fn bytes<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Vec<u8>> {
        Ok(self.null_bytes(column)?.unwrap_or_default())
    }

    pub fn null_bool<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<bool>> {
        self.get(column.into(), ScanKind::Bool, "bool", |_, v| coerce::boolean(v))
    }

    pub fn bool<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<bool> {
        Ok(self.null_bool(column)?.unwrap_or_default())
    }

    /// Any numeric type; text values are parsed.
    pub fn null_number<'a, T: Numeric>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<T>> {
        self.get(column.into(), ScanKind::Number, "number", |_, v| coerce::number::<T>(v))
    }

    pub fn number<'a, T: Numeric>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<T> {
        Ok(self.null_number(column)?.unwrap_or_default())
    }

    pub fn null_int64<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<i64>> {
        self.null_number(column)
    }

    pub fn int64<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<i64> {
        self.number(column)
    }

    pub fn null_float64<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<f64>> {
        self.null_number(column)
    }

    pub fn float64<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<f64> {
        self.number(column)
    }

    pub fn null_string<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<String>> {
        self.get(column.into(), ScanKind::String, "string", |_, v| coerce::string(v))
    }

    pub fn string<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<String> {
        Ok(self.null_string(column)?.unwrap_or_default())
    }

    /// Native timestamps, or text in one of the common timestamp layouts.
    pub fn null_time<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<DateTime<Utc>>> {
        self.get(column.into(), ScanKind::Time, "time", |_, v| coerce::time(v))
    }

    pub fn time<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<DateTime<Utc>> {
        Ok(self.null_time(column)?.unwrap_or_default())
    }

    /// A JSON object.
    pub fn null_json<'a>(
        &mut self,
        column: impl Into<ColumnRef<'a>>,
    ) -> SqlResult<Option<serde_json::Map<String, serde_json::Value>>> {
        self.null_json_as(column)
    }

    pub fn json<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<serde_json::Map<String, serde_json::Value>> {
        Ok(self.null_json(column)?.unwrap_or_default())
    }

    /// Deserialize a JSON column into `T`.
    pub fn null_json_as<'a, T: DeserializeOwned>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<T>> {
        self.get(column.into(), ScanKind::Json, "json", |_, v| coerce::json_as(v))
    }

    pub fn json_as<'a, T: DeserializeOwned + Default>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<T> {
        Ok(self.null_json_as(column)?.unwrap_or_default())
    }

    /// The JSON document as fetched, without parsing it.
    pub fn null_json_bytes<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<Vec<u8>>> {
        self.get(column.into(), ScanKind::Json, "json bytes", |_, v| coerce::bytes(v))
    }

    pub fn json_bytes<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Vec<u8>> {
        Ok(self.null_json_bytes(column)?.unwrap_or_default())
    }

    /// 16 raw bytes or the textual form.
    pub fn null_uuid<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<Uuid>> {
        self.get(column.into(), ScanKind::Uuid, "uuid", |_, v| coerce::uuid(v))
    }

    pub fn uuid<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Uuid> {
        Ok(self.null_uuid(column)?.unwrap_or_default())
    }

    /// An enumeration stored by name, or by index.
    pub fn null_enum<'a, E: Enumeration>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<E>> {
        self.get(column.into(), ScanKind::Enum, "enum", |_, v| coerce::enumeration::<E>(v))
    }

    pub fn enum_value<'a, E: Enumeration + Default>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<E> {
        Ok(self.null_enum(column)?.unwrap_or_default())
    }

    /// A native array on Postgres, a JSON array elsewhere.
    pub fn null_array<'a, T: ArrayElement>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Option<Vec<T>>> {
        self.get(column.into(), ScanKind::Array, "array", coerce::array::<T>)
    }

    pub fn array<'a, T: ArrayElement>(&mut self, column: impl Into<ColumnRef<'a>>) -> SqlResult<Vec<T>> {
        Ok(self.null_array(column)?.unwrap_or_default())
    }
}
