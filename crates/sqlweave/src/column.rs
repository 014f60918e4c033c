//! Write-side mapping of fields to values.
//!
//! A [`ColumnMapper`] is called with a [`Column`] in one of two modes:
//!
//! - **update**: every `set` becomes one [`Assignment`]
//! - **insert**: the first row defines the column list; a repeat of the
//!   first field starts a new row
//!
//! After the first row ends, fields are appended to the current row without
//! checking them against the column list. Callers must use the same field set
//! for every row.

use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::field::{Field, FieldKind};
use crate::predicate::Assignment;
use crate::render::render;
use crate::value::{ArrayValue, Enumeration, Value, invalid_enum};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Callback that maps an input onto a [`Column`].
pub type ColumnMapper = Arc<dyn Fn(&mut Column) -> SqlResult<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Update,
    Insert,
}

/// Collects the values a mapper assigns to fields.
#[derive(Debug)]
pub struct Column {
    dialect: Dialect,
    mode: Mode,
    // UPDATE
    assignments: Vec<Assignment>,
    // INSERT
    first_field: Option<String>,
    row_ended: bool,
    columns: Vec<Field>,
    rows: Vec<Vec<Value>>,
}

impl Column {
    fn new(dialect: Dialect, mode: Mode) -> Self {
        Self {
            dialect,
            mode,
            assignments: Vec::new(),
            first_field: None,
            row_ended: false,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn for_update(dialect: Dialect) -> Self {
        Self::new(dialect, Mode::Update)
    }

    pub(crate) fn for_insert(dialect: Dialect) -> Self {
        Self::new(dialect, Mode::Insert)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn is_update(&self) -> bool {
        self.mode == Mode::Update
    }

    pub(crate) fn into_assignments(self) -> Vec<Assignment> {
        self.assignments
    }

    pub(crate) fn into_rows(self) -> (Vec<Field>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }

    /// Map `value` to `field`.
    pub fn set(&mut self, field: &Field, value: impl Into<Value>) -> SqlResult<()> {
        let value = value.into();
        if self.mode == Mode::Update {
            self.assignments.push(Assignment::set(field.clone(), value));
            return Ok(());
        }

        let name = render(self.dialect, field)?.sql;
        if name.is_empty() {
            return Err(SqlError::invalid("field name is empty"));
        }
        let Some(first) = &self.first_field else {
            self.first_field = Some(name);
            self.columns.push(field.clone());
            self.rows.push(vec![value]);
            return Ok(());
        };
        if *first == name {
            self.row_ended = true;
            self.rows.push(vec![value]);
            return Ok(());
        }
        if !self.row_ended {
            self.columns.push(field.clone());
        }
        let width = self.columns.len();
        if let Some(row) = self.rows.last_mut() {
            row.push(value);
            if row.len() > width {
                tracing::debug!(
                    target: "sqlweave.column",
                    field = %name,
                    row = self.rows.len(),
                    columns = width,
                    "insert row has more values than columns"
                );
            }
        }
        Ok(())
    }

    fn set_typed(&mut self, field: &Field, kind: FieldKind, value: Value) -> SqlResult<()> {
        if !field.accepts(kind) {
            let actual = field.kind().map_or("expression", FieldKind::name);
            return Err(SqlError::coercion(
                field.name(),
                format!("cannot set a {} value on a {actual} field", kind.name()),
            ));
        }
        self.set(field, value)
    }

    // ==================== Typed setters ====================

    pub fn set_bytes(&mut self, field: &Field, value: impl Into<Vec<u8>>) -> SqlResult<()> {
        let bytes: Vec<u8> = value.into();
        self.set_typed(field, FieldKind::Binary, bytes.into())
    }

    pub fn set_bool(&mut self, field: &Field, value: bool) -> SqlResult<()> {
        self.set_typed(field, FieldKind::Boolean, value.into())
    }

    pub fn set_i64(&mut self, field: &Field, value: i64) -> SqlResult<()> {
        self.set_typed(field, FieldKind::Number, value.into())
    }

    pub fn set_i32(&mut self, field: &Field, value: i32) -> SqlResult<()> {
        self.set_typed(field, FieldKind::Number, value.into())
    }

    pub fn set_f64(&mut self, field: &Field, value: f64) -> SqlResult<()> {
        self.set_typed(field, FieldKind::Number, value.into())
    }

    pub fn set_string(&mut self, field: &Field, value: impl Into<String>) -> SqlResult<()> {
        let text: String = value.into();
        self.set_typed(field, FieldKind::String, text.into())
    }

    pub fn set_time(&mut self, field: &Field, value: DateTime<Utc>) -> SqlResult<()> {
        self.set_typed(field, FieldKind::Time, value.into())
    }

    /// Serialize `value` as JSON.
    pub fn set_json<T: serde::Serialize + ?Sized>(&mut self, field: &Field, value: &T) -> SqlResult<()> {
        let value = Value::json(value)?;
        self.set_typed(field, FieldKind::Json, value)
    }

    pub fn set_uuid(&mut self, field: &Field, value: Uuid) -> SqlResult<()> {
        self.set_typed(field, FieldKind::Uuid, value.into())
    }

    /// A native array on Postgres, a JSON array elsewhere.
    pub fn set_array(&mut self, field: &Field, value: impl Into<ArrayValue>) -> SqlResult<()> {
        self.set_typed(field, FieldKind::Array, Value::Array(value.into()))
    }

    /// Stores the enum by name. Indices without a name are rejected.
    pub fn set_enum<E: Enumeration>(&mut self, field: &Field, value: &E) -> SqlResult<()> {
        let Some(name) = value.name() else {
            return Err(SqlError::coercion(
                field.name(),
                invalid_enum::<E>(&value.index().to_string()),
            ));
        };
        self.set_typed(field, FieldKind::Enum, name.into())
    }
}
