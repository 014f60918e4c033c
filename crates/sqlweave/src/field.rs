//! Fields: typed, renderable handles to columns and expressions.
//!
//! A [`Field`] never owns a value. Column fields carry the table qualifier
//! they were created from (`a.actor_id`), expression fields carry a template
//! rendered through [`Output::writef`].

use crate::error::SqlResult;
use crate::predicate::{Assignment, Predicate};
use crate::render::{Output, SqlWriter};
use crate::value::Value;

/// The capability tag of a column field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Number,
    String,
    Boolean,
    Time,
    Binary,
    Json,
    Uuid,
    Enum,
    Array,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Number => "number",
            FieldKind::String => "string",
            FieldKind::Boolean => "boolean",
            FieldKind::Time => "time",
            FieldKind::Binary => "binary",
            FieldKind::Json => "json",
            FieldKind::Uuid => "uuid",
            FieldKind::Enum => "enum",
            FieldKind::Array => "array",
        }
    }
}

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    fn to_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// NULLS ordering for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

impl NullsOrder {
    fn to_sql(self) -> &'static str {
        match self {
            NullsOrder::First => "NULLS FIRST",
            NullsOrder::Last => "NULLS LAST",
        }
    }
}

/// Projection alias and ordering applied to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Decor {
    alias: Option<String>,
    dir: Option<SortDir>,
    nulls: Option<NullsOrder>,
}

/// A reference to a table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnField {
    qualifier: Option<String>,
    name: String,
    decor: Decor,
}

impl ColumnField {
    pub fn new(qualifier: Option<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.filter(|q| !q.is_empty()),
            name: name.into(),
            decor: Decor::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

/// A SQL template plus its values, e.g. `exprf("COUNT({})", [field])`.
#[derive(Debug, Clone)]
pub struct Expression {
    format: String,
    values: Vec<Value>,
    decor: Decor,
}

impl Expression {
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl SqlWriter for Expression {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        out.writef(&self.format, &self.values)
    }
}

/// Create an expression without values.
pub fn expr(format: impl Into<String>) -> Expression {
    exprf(format, Vec::<Value>::new())
}

/// Create an expression with values substituted through the placeholder language.
pub fn exprf<I, V>(format: impl Into<String>, values: I) -> Expression
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Expression {
        format: format.into(),
        values: values.into_iter().map(Into::into).collect(),
        decor: Decor::default(),
    }
}

/// A typed column or an expression.
#[derive(Debug, Clone)]
pub enum Field {
    Number(ColumnField),
    String(ColumnField),
    Boolean(ColumnField),
    Time(ColumnField),
    Binary(ColumnField),
    Json(ColumnField),
    Uuid(ColumnField),
    Enum(ColumnField),
    Array(ColumnField),
    Expr(Expression),
}

impl Field {
    /// A column field of the given kind.
    pub fn column(kind: FieldKind, qualifier: Option<&str>, name: impl Into<String>) -> Self {
        let col = ColumnField::new(qualifier.map(str::to_string), name);
        match kind {
            FieldKind::Number => Field::Number(col),
            FieldKind::String => Field::String(col),
            FieldKind::Boolean => Field::Boolean(col),
            FieldKind::Time => Field::Time(col),
            FieldKind::Binary => Field::Binary(col),
            FieldKind::Json => Field::Json(col),
            FieldKind::Uuid => Field::Uuid(col),
            FieldKind::Enum => Field::Enum(col),
            FieldKind::Array => Field::Array(col),
        }
    }

    /// The column behind this field, if it is one.
    pub fn as_column(&self) -> Option<&ColumnField> {
        match self {
            Field::Number(c)
            | Field::String(c)
            | Field::Boolean(c)
            | Field::Time(c)
            | Field::Binary(c)
            | Field::Json(c)
            | Field::Uuid(c)
            | Field::Enum(c)
            | Field::Array(c) => Some(c),
            Field::Expr(_) => None,
        }
    }

    /// Kind of a column field; expressions have none.
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Field::Number(_) => Some(FieldKind::Number),
            Field::String(_) => Some(FieldKind::String),
            Field::Boolean(_) => Some(FieldKind::Boolean),
            Field::Time(_) => Some(FieldKind::Time),
            Field::Binary(_) => Some(FieldKind::Binary),
            Field::Json(_) => Some(FieldKind::Json),
            Field::Uuid(_) => Some(FieldKind::Uuid),
            Field::Enum(_) => Some(FieldKind::Enum),
            Field::Array(_) => Some(FieldKind::Array),
            Field::Expr(_) => None,
        }
    }

    /// Whether this field can be used where a `kind` field is expected.
    /// Expressions are untyped and always qualify.
    pub fn accepts(&self, kind: FieldKind) -> bool {
        self.kind().is_none_or(|k| k == kind)
    }

    /// Column name, or the template of an expression.
    pub fn name(&self) -> &str {
        match self {
            Field::Expr(e) => &e.format,
            _ => self.as_column().map_or("", |c| c.name.as_str()),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        self.decor().alias.as_deref()
    }

    fn decor(&self) -> &Decor {
        match self {
            Field::Number(c)
            | Field::String(c)
            | Field::Boolean(c)
            | Field::Time(c)
            | Field::Binary(c)
            | Field::Json(c)
            | Field::Uuid(c)
            | Field::Enum(c)
            | Field::Array(c) => &c.decor,
            Field::Expr(e) => &e.decor,
        }
    }

    fn decor_mut(&mut self) -> &mut Decor {
        match self {
            Field::Number(c)
            | Field::String(c)
            | Field::Boolean(c)
            | Field::Time(c)
            | Field::Binary(c)
            | Field::Json(c)
            | Field::Uuid(c)
            | Field::Enum(c)
            | Field::Array(c) => &mut c.decor,
            Field::Expr(e) => &mut e.decor,
        }
    }

    // ==================== Decoration ====================

    /// Alias used when the field is projected (`expr AS alias`).
    pub fn as_(mut self, alias: impl Into<String>) -> Self {
        self.decor_mut().alias = Some(alias.into());
        self
    }

    pub fn asc(mut self) -> Self {
        self.decor_mut().dir = Some(SortDir::Asc);
        self
    }

    pub fn desc(mut self) -> Self {
        self.decor_mut().dir = Some(SortDir::Desc);
        self
    }

    pub fn nulls_first(mut self) -> Self {
        self.decor_mut().nulls = Some(NullsOrder::First);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.decor_mut().nulls = Some(NullsOrder::Last);
        self
    }

    /// The same column as seen through the upsert pseudo-table `EXCLUDED`.
    pub fn excluded(&self) -> Field {
        let mut field = self.clone();
        if let Some(col) = field.column_mut() {
            col.qualifier = Some("EXCLUDED".to_string());
        }
        field
    }

    fn column_mut(&mut self) -> Option<&mut ColumnField> {
        match self {
            Field::Number(c)
            | Field::String(c)
            | Field::Boolean(c)
            | Field::Time(c)
            | Field::Binary(c)
            | Field::Json(c)
            | Field::Uuid(c)
            | Field::Enum(c)
            | Field::Array(c) => Some(c),
            Field::Expr(_) => None,
        }
    }

    // ==================== Rendering ====================

    /// Write the field without its table qualifier.
    pub fn write_unqualified(&self, out: &mut Output) -> SqlResult<()> {
        match self {
            Field::Expr(e) => e.write_sql(out),
            _ => {
                out.write_identifier(self.name());
                Ok(())
            }
        }
    }

    /// Write the field followed by `AS alias` when it has one.
    pub fn write_projection(&self, out: &mut Output) -> SqlResult<()> {
        self.write_sql(out)?;
        if let Some(alias) = self.alias() {
            out.push_str(" AS ");
            out.write_identifier(alias);
        }
        Ok(())
    }

    /// Write the field followed by its sort direction and NULLS ordering.
    pub fn write_ordering(&self, out: &mut Output) -> SqlResult<()> {
        self.write_sql(out)?;
        let decor = self.decor();
        if let Some(dir) = decor.dir {
            out.push(' ');
            out.push_str(dir.to_sql());
        }
        if let Some(nulls) = decor.nulls {
            out.push(' ');
            out.push_str(nulls.to_sql());
        }
        Ok(())
    }

    // ==================== Predicates ====================

    fn compare(&self, op: &'static str, value: impl Into<Value>) -> Predicate {
        Predicate::Compare {
            left: self.clone().into(),
            op,
            right: value.into(),
        }
    }

    pub fn eq(&self, value: impl Into<Value>) -> Predicate {
        self.compare("=", value)
    }

    pub fn ne(&self, value: impl Into<Value>) -> Predicate {
        self.compare("<>", value)
    }

    pub fn gt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(">", value)
    }

    pub fn gte(&self, value: impl Into<Value>) -> Predicate {
        self.compare(">=", value)
    }

    pub fn lt(&self, value: impl Into<Value>) -> Predicate {
        self.compare("<", value)
    }

    pub fn lte(&self, value: impl Into<Value>) -> Predicate {
        self.compare("<=", value)
    }

    pub fn like(&self, pattern: impl Into<Value>) -> Predicate {
        self.compare("LIKE", pattern)
    }

    pub fn not_like(&self, pattern: impl Into<Value>) -> Predicate {
        self.compare("NOT LIKE", pattern)
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull {
            operand: self.clone().into(),
            negated: false,
        }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNull {
            operand: self.clone().into(),
            negated: true,
        }
    }

    /// `field IN (...)`; an empty list is never true.
    pub fn in_list<I, V>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            operand: self.clone().into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in<I, V>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            operand: self.clone().into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Predicate {
        Predicate::Between {
            operand: self.clone().into(),
            low: low.into(),
            high: high.into(),
            negated: false,
        }
    }

    pub fn not_between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Predicate {
        Predicate::Between {
            operand: self.clone().into(),
            low: low.into(),
            high: high.into(),
            negated: true,
        }
    }

    // ==================== Assignments ====================

    /// `field = value` for UPDATE SET and upserts.
    pub fn set(&self, value: impl Into<Value>) -> Assignment {
        Assignment::set(self.clone(), value)
    }

    /// `field = EXCLUDED.field`.
    pub fn set_excluded(&self) -> Assignment {
        Assignment::set(self.clone(), self.excluded())
    }
}

impl SqlWriter for Field {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        match self {
            Field::Expr(e) => e.write_sql(out),
            _ => {
                if let Some(qualifier) = self.as_column().and_then(|c| c.qualifier.as_deref()) {
                    out.write_identifier(qualifier);
                    out.push('.');
                }
                out.write_identifier(self.name());
                Ok(())
            }
        }
    }
}

impl From<Field> for Value {
    fn from(field: Field) -> Self {
        Value::sql(field)
    }
}

impl From<&Field> for Value {
    fn from(field: &Field) -> Self {
        Value::sql(field.clone())
    }
}

impl From<Expression> for Value {
    fn from(e: Expression) -> Self {
        Value::sql(e)
    }
}

impl From<Expression> for Field {
    fn from(e: Expression) -> Self {
        Field::Expr(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::render::render;

    fn sql(dialect: Dialect, w: &dyn SqlWriter) -> String {
        render(dialect, w).unwrap().sql
    }

    #[test]
    fn qualified_and_quoted() {
        let f = Field::column(FieldKind::Number, Some("a"), "actor_id");
        assert_eq!(sql(Dialect::Postgres, &f), "a.actor_id");

        let f = Field::column(FieldKind::String, Some("order"), "Name");
        assert_eq!(sql(Dialect::MySql, &f), "`order`.`Name`");
        assert_eq!(sql(Dialect::SqlServer, &f), "[order].[Name]");
    }

    #[test]
    fn ordering_and_alias() {
        let f = Field::column(FieldKind::Time, Some("a"), "last_update")
            .desc()
            .nulls_last()
            .as_("lu");
        let mut out = Output::new(Dialect::Postgres);
        f.write_ordering(&mut out).unwrap();
        out.push_str(", ");
        f.write_projection(&mut out).unwrap();
        assert_eq!(out.sql(), "a.last_update DESC NULLS LAST, a.last_update AS lu");
    }

    #[test]
    fn expressions_accept_any_kind() {
        let e: Field = exprf("COUNT({})", [Field::column(FieldKind::Number, None, "id")]).into();
        assert!(e.accepts(FieldKind::Number));
        assert!(e.accepts(FieldKind::Json));
        assert_eq!(sql(Dialect::Sqlite, &e), "COUNT(id)");

        let n = Field::column(FieldKind::Number, None, "id");
        assert!(!n.accepts(FieldKind::String));
    }

    #[test]
    fn excluded_keeps_name() {
        let f = Field::column(FieldKind::String, Some("a"), "first_name");
        assert_eq!(sql(Dialect::Postgres, &f.excluded()), "EXCLUDED.first_name");
    }
}
