//! Statement builders.
//!
//! Every builder is a plain value: composition methods consume the builder
//! and return the updated one, so a builder that was cloned earlier never
//! observes later changes. Validation runs when the statement is rendered,
//! so [`Query::set_dialect`] can change what is valid.
//!
//! ```ignore
//! use sqlweave::{Dialect, Query, Table};
//!
//! let a = Table::named("actor").alias("a");
//! let stmt = Dialect::Postgres
//!     .update(a.clone())
//!     .set([a.string("first_name").set("bob")])
//!     .where_([a.number("actor_id").eq(1)])
//!     .build()?;
//! assert_eq!(stmt.sql, "UPDATE actor AS a SET first_name = $1 WHERE a.actor_id = $2");
//! ```

mod delete;
mod insert;
mod raw;
mod select;
mod update;

pub use delete::DeleteQuery;
pub use insert::{Conflict, InsertQuery};
pub use raw::RawQuery;
pub use select::SelectQuery;
pub use update::UpdateQuery;

use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::field::Field;
use crate::predicate::Predicate;
use crate::render::{Output, Rendered, SqlWriter, render};
use crate::table::{Cte, Table};
use crate::value::Value;

/// A statement that can be rendered and executed.
pub trait Query: SqlWriter + Clone {
    fn dialect(&self) -> Dialect;

    /// Override the dialect. Validation against the new dialect happens on
    /// the next render.
    fn set_dialect(self, dialect: Dialect) -> Self;

    /// The fields a row mapper can read, in order.
    fn fetchable_fields(&self) -> &[Field];

    /// Install the fields registered by a row mapper.
    ///
    /// Succeeds only when no fields are set yet and the statement can return
    /// rows; otherwise the statement is returned unchanged with `false`.
    fn set_fetchable_fields(self, fields: Vec<Field>) -> (Self, bool);

    /// Render with the statement's own dialect.
    fn build(&self) -> SqlResult<Rendered> {
        render(self.dialect(), self)
    }
}

/// Entry points stamping the dialect on a new statement.
impl Dialect {
    pub fn select<I: IntoIterator<Item = Field>>(self, fields: I) -> SelectQuery {
        SelectQuery::new(self).fields(fields)
    }

    pub fn select_from(self, table: Table) -> SelectQuery {
        SelectQuery::new(self).from(table)
    }

    pub fn insert_into(self, table: Table) -> InsertQuery {
        InsertQuery::new(self).table(table)
    }

    pub fn update(self, table: Table) -> UpdateQuery {
        UpdateQuery::new(self).table(table)
    }

    pub fn delete_from(self, table: Table) -> DeleteQuery {
        DeleteQuery::new(self).table(table)
    }

    /// A raw statement rendered through the placeholder language.
    pub fn queryf<I, V>(self, format: impl Into<String>, values: I) -> RawQuery
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        RawQuery::new(self, format, values)
    }

    /// Start a statement with common table expressions.
    pub fn with<I: IntoIterator<Item = Cte>>(self, ctes: I) -> WithBuilder {
        WithBuilder {
            dialect: self,
            ctes: ctes.into_iter().collect(),
        }
    }
}

/// CTEs waiting for the statement they prefix.
#[derive(Debug, Clone)]
pub struct WithBuilder {
    dialect: Dialect,
    ctes: Vec<Cte>,
}

impl WithBuilder {
    pub fn select<I: IntoIterator<Item = Field>>(self, fields: I) -> SelectQuery {
        self.dialect.select(fields).with(self.ctes)
    }

    pub fn select_from(self, table: Table) -> SelectQuery {
        self.dialect.select_from(table).with(self.ctes)
    }

    pub fn insert_into(self, table: Table) -> InsertQuery {
        self.dialect.insert_into(table).with(self.ctes)
    }

    pub fn update(self, table: Table) -> UpdateQuery {
        self.dialect.update(table).with(self.ctes)
    }

    pub fn delete_from(self, table: Table) -> DeleteQuery {
        self.dialect.delete_from(table).with(self.ctes)
    }
}

// ==================== Shared clause writers ====================

/// Policy predicates of `tables`, in order, followed by `predicates`.
/// `None` when nothing would be rendered.
pub(crate) fn where_predicate<'a>(
    dialect: Dialect,
    tables: impl IntoIterator<Item = &'a Table>,
    predicates: &[Predicate],
) -> SqlResult<Option<Predicate>> {
    let mut all = Vec::with_capacity(predicates.len());
    for table in tables {
        if let Some(policy) = table.policy_predicate(dialect)? {
            all.push(policy);
        }
    }
    all.extend(predicates.iter().cloned());
    let predicate = Predicate::And(all);
    Ok((!predicate.is_empty_group()).then_some(predicate))
}

pub(crate) fn write_where(out: &mut Output, predicate: Option<&Predicate>) -> SqlResult<()> {
    if let Some(predicate) = predicate {
        out.push_str(" WHERE ");
        predicate.write_sql(out)?;
    }
    Ok(())
}

pub(crate) fn write_projections(out: &mut Output, fields: &[Field]) -> SqlResult<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        field.write_projection(out)?;
    }
    Ok(())
}

pub(crate) fn write_order_by(out: &mut Output, fields: &[Field]) -> SqlResult<()> {
    if fields.is_empty() {
        return Ok(());
    }
    out.push_str(" ORDER BY ");
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        field.write_ordering(out)?;
    }
    Ok(())
}

pub(crate) fn write_returning(out: &mut Output, fields: &[Field]) -> SqlResult<()> {
    if fields.is_empty() {
        return Ok(());
    }
    out.push_str(" RETURNING ");
    write_projections(out, fields)
}
