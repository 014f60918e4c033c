//! Table sources: named tables, derived tables, policy tables, joins and CTEs.

use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::field::{Expression, Field, FieldKind};
use crate::predicate::Predicate;
use crate::render::{Output, SqlWriter};
use std::fmt;
use std::sync::Arc;

/// A table that injects a row-level predicate into every statement using it.
///
/// The predicate is ANDed in front of the statement's own WHERE predicates.
/// Returning an error aborts rendering.
pub trait PolicyTable: SqlWriter {
    fn policy(&self, dialect: Dialect) -> SqlResult<Option<Predicate>>;
}

/// A renderable row source.
#[derive(Clone)]
pub enum Table {
    Named {
        schema: Option<String>,
        name: String,
        alias: Option<String>,
    },
    /// `(subquery) AS alias`
    Derived {
        query: Arc<dyn SqlWriter>,
        alias: String,
    },
    Expr(Expression),
    Policy(Arc<dyn PolicyTable>),
}

impl Table {
    pub fn named(name: impl Into<String>) -> Self {
        Table::Named {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Table::Named {
            schema: Some(schema.into()),
            name: name.into(),
            alias: None,
        }
    }

    pub fn derived(query: impl SqlWriter + 'static, alias: impl Into<String>) -> Self {
        Table::Derived {
            query: Arc::new(query),
            alias: alias.into(),
        }
    }

    pub fn expr(e: Expression) -> Self {
        Table::Expr(e)
    }

    pub fn policy(table: impl PolicyTable + 'static) -> Self {
        Table::Policy(Arc::new(table))
    }

    /// Set the alias of a named table. Other sources are returned unchanged.
    pub fn alias(self, alias: impl Into<String>) -> Self {
        match self {
            Table::Named { schema, name, .. } => Table::Named {
                schema,
                name,
                alias: Some(alias.into()).filter(|a| !a.is_empty()),
            },
            Table::Derived { query, .. } => Table::Derived {
                query,
                alias: alias.into(),
            },
            other => other,
        }
    }

    /// The name fields of this table are qualified with.
    pub fn qualifier(&self) -> Option<&str> {
        match self {
            Table::Named { name, alias, .. } => Some(alias.as_deref().unwrap_or(name)),
            Table::Derived { alias, .. } => Some(alias),
            Table::Expr(_) | Table::Policy(_) => None,
        }
    }

    /// The policy predicate of a policy table; `None` for every other source.
    pub fn policy_predicate(&self, dialect: Dialect) -> SqlResult<Option<Predicate>> {
        match self {
            Table::Policy(p) => p.policy(dialect),
            _ => Ok(None),
        }
    }

    // ==================== Fields ====================

    pub fn field(&self, kind: FieldKind, name: impl Into<String>) -> Field {
        Field::column(kind, self.qualifier(), name)
    }

    pub fn number(&self, name: impl Into<String>) -> Field {
        self.field(FieldKind::Number, name)
    }

    pub fn string(&self, name: impl Into<String>) -> Field {
        self.field(FieldKind::String, name)
    }

    pub fn boolean(&self, name: impl Into<String>) -> Field {
        self.field(FieldKind::Boolean, name)
    }

    pub fn time(&self, name: impl Into<String>) -> Field {
        self.field(FieldKind::Time, name)
    }

    pub fn binary(&self, name: impl Into<String>) -> Field {
        self.field(FieldKind::Binary, name)
    }

    pub fn json(&self, name: impl Into<String>) -> Field {
        self.field(FieldKind::Json, name)
    }

    pub fn uuid(&self, name: impl Into<String>) -> Field {
        self.field(FieldKind::Uuid, name)
    }

    pub fn enumeration(&self, name: impl Into<String>) -> Field {
        self.field(FieldKind::Enum, name)
    }

    pub fn array(&self, name: impl Into<String>) -> Field {
        self.field(FieldKind::Array, name)
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Named {
                schema,
                name,
                alias,
            } => f
                .debug_struct("Named")
                .field("schema", schema)
                .field("name", name)
                .field("alias", alias)
                .finish(),
            Table::Derived { query, alias } => f
                .debug_struct("Derived")
                .field("query", query)
                .field("alias", alias)
                .finish(),
            Table::Expr(e) => f.debug_tuple("Expr").field(e).finish(),
            Table::Policy(p) => f.debug_tuple("Policy").field(p).finish(),
        }
    }
}

impl SqlWriter for Table {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        match self {
            Table::Named {
                schema,
                name,
                alias,
            } => {
                if let Some(schema) = schema {
                    out.write_identifier(schema);
                    out.push('.');
                }
                out.write_identifier(name);
                if let Some(alias) = alias {
                    out.push_str(" AS ");
                    out.write_identifier(alias);
                }
                Ok(())
            }
            Table::Derived { query, alias } => {
                out.push('(');
                query.write_sql(out)?;
                out.push_str(") AS ");
                out.write_identifier(alias);
                Ok(())
            }
            Table::Expr(e) => e.write_sql(out),
            Table::Policy(p) => p.write_sql(out),
        }
    }
}

impl From<Expression> for Table {
    fn from(e: Expression) -> Self {
        Table::Expr(e)
    }
}

/// Join keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOperator {
    Join,
    LeftJoin,
    RightJoin,
    FullJoin,
    CrossJoin,
    /// Written verbatim, e.g. `,` or `NATURAL JOIN`.
    Custom(String),
}

impl JoinOperator {
    pub fn as_str(&self) -> &str {
        match self {
            JoinOperator::Join => "JOIN",
            JoinOperator::LeftJoin => "LEFT JOIN",
            JoinOperator::RightJoin => "RIGHT JOIN",
            JoinOperator::FullJoin => "FULL JOIN",
            JoinOperator::CrossJoin => "CROSS JOIN",
            JoinOperator::Custom(op) => op,
        }
    }
}

/// One joined table with its ON predicate or USING columns.
#[derive(Debug, Clone)]
pub struct JoinTable {
    pub operator: JoinOperator,
    pub table: Table,
    pub on: Option<Predicate>,
    pub using: Vec<Field>,
}

impl JoinTable {
    pub fn new(operator: JoinOperator, table: Table) -> Self {
        Self {
            operator,
            table,
            on: None,
            using: Vec::new(),
        }
    }

    pub fn on(mut self, predicate: impl Into<Predicate>) -> Self {
        self.on = Some(predicate.into());
        self
    }

    pub fn using<I: IntoIterator<Item = Field>>(mut self, fields: I) -> Self {
        self.using = fields.into_iter().collect();
        self
    }
}

/// Renders with a leading space: ` JOIN actor AS a ON ...`.
impl SqlWriter for JoinTable {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        out.push(' ');
        out.push_str(self.operator.as_str());
        out.push(' ');
        self.table.write_sql(out)?;
        if let Some(on) = &self.on {
            out.push_str(" ON ");
            on.write_sql(out)?;
        } else if !self.using.is_empty() {
            out.push_str(" USING (");
            for (i, field) in self.using.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                field.write_unqualified(out)?;
            }
            out.push(')');
        }
        Ok(())
    }
}

pub(crate) fn write_joins(out: &mut Output, joins: &[JoinTable]) -> SqlResult<()> {
    for join in joins {
        join.write_sql(out)?;
    }
    Ok(())
}

/// A common table expression.
#[derive(Clone)]
pub struct Cte {
    name: String,
    columns: Vec<String>,
    query: Arc<dyn SqlWriter>,
    recursive: bool,
    materialized: Option<bool>,
}

impl Cte {
    pub fn new<I, S>(name: impl Into<String>, columns: I, query: impl SqlWriter + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            query: Arc::new(query),
            recursive: false,
            materialized: None,
        }
    }

    /// Mark the CTE recursive. One recursive CTE makes the whole WITH clause
    /// `WITH RECURSIVE`.
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// `AS MATERIALIZED` / `AS NOT MATERIALIZED` (Postgres only).
    pub fn materialized(mut self, materialized: bool) -> Self {
        self.materialized = Some(materialized);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference the CTE as a table in FROM/JOIN.
    pub fn as_table(&self) -> Table {
        Table::named(self.name.clone())
    }

    fn write_definition(&self, out: &mut Output) -> SqlResult<()> {
        out.write_identifier(&self.name);
        if !self.columns.is_empty() {
            out.push_str(" (");
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.write_identifier(column);
            }
            out.push(')');
        }
        out.push_str(" AS ");
        if out.dialect() == Dialect::Postgres {
            match self.materialized {
                Some(true) => out.push_str("MATERIALIZED "),
                Some(false) => out.push_str("NOT MATERIALIZED "),
                None => {}
            }
        }
        out.push('(');
        self.query.write_sql(out)?;
        out.push(')');
        Ok(())
    }
}

impl fmt::Debug for Cte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cte")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("query", &self.query)
            .field("recursive", &self.recursive)
            .field("materialized", &self.materialized)
            .finish()
    }
}

/// Write `WITH ... ` (with a trailing space) when there is at least one CTE.
pub(crate) fn write_ctes(out: &mut Output, ctes: &[Cte]) -> SqlResult<()> {
    if ctes.is_empty() {
        return Ok(());
    }
    out.push_str("WITH ");
    if ctes.iter().any(|c| c.recursive) {
        out.push_str("RECURSIVE ");
    }
    for (i, cte) in ctes.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        cte.write_definition(out)?;
    }
    out.push(' ');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlError;
    use crate::field::expr;
    use crate::render::render;

    #[derive(Debug)]
    struct Tenant {
        fail: bool,
    }

    impl SqlWriter for Tenant {
        fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
            out.write_identifier("tenant_rows");
            Ok(())
        }
    }

    impl PolicyTable for Tenant {
        fn policy(&self, _dialect: Dialect) -> SqlResult<Option<Predicate>> {
            if self.fail {
                return Err(SqlError::render("no tenant in scope"));
            }
            Ok(Some(expr("tenant_id = 7").into()))
        }
    }

    #[test]
    fn named_table_with_alias_and_schema() {
        let t = Table::with_schema("public", "order").alias("o");
        assert_eq!(render(Dialect::Postgres, &t).unwrap().sql, "public.\"order\" AS o");
        assert_eq!(t.number("id").as_column().unwrap().qualifier(), Some("o"));
        assert_eq!(Table::named("actor").qualifier(), Some("actor"));
    }

    #[test]
    fn policy_predicate_only_for_policy_tables() {
        assert!(Table::named("actor").policy_predicate(Dialect::Sqlite).unwrap().is_none());
        let ok = Table::policy(Tenant { fail: false });
        assert!(ok.policy_predicate(Dialect::Sqlite).unwrap().is_some());
        let bad = Table::policy(Tenant { fail: true });
        assert!(bad.policy_predicate(Dialect::Sqlite).unwrap_err().is_render());
    }

    #[test]
    fn join_using_writes_unqualified_columns() {
        let a = Table::named("actor").alias("a");
        let j = JoinTable::new(JoinOperator::Join, a.clone())
            .using([a.string("first_name"), a.string("last_name")]);
        assert_eq!(
            render(Dialect::Sqlite, &j).unwrap().sql,
            " JOIN actor AS a USING (first_name, last_name)"
        );
    }

    #[test]
    fn ctes_render_modifiers() {
        let mut out = Output::new(Dialect::Postgres);
        let ctes = vec![
            Cte::new("nums", ["n"], expr("SELECT 1")).recursive(),
            Cte::new("big", Vec::<String>::new(), expr("SELECT 2")).materialized(false),
        ];
        write_ctes(&mut out, &ctes).unwrap();
        assert_eq!(
            out.sql(),
            "WITH RECURSIVE nums (n) AS (SELECT 1), big AS NOT MATERIALIZED (SELECT 2) "
        );

        let mut out = Output::new(Dialect::MySql);
        write_ctes(&mut out, &ctes[1..]).unwrap();
        assert_eq!(out.sql(), "WITH big AS (SELECT 2) ");
    }
}
