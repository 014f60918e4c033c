//! UPDATE statement builder.

use crate::column::{Column, ColumnMapper};
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::field::Field;
use crate::predicate::{Assignment, Predicate, write_assignments};
use crate::query::{Query, where_predicate, write_order_by, write_returning, write_where};
use crate::render::{Output, SqlWriter};
use crate::table::{Cte, JoinOperator, JoinTable, Table, write_ctes, write_joins};
use crate::value::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// UPDATE statement builder.
#[derive(Clone)]
pub struct UpdateQuery {
    dialect: Dialect,
    ctes: Vec<Cte>,
    table: Option<Table>,
    assignments: Vec<Assignment>,
    mapper: Option<ColumnMapper>,
    from: Option<Table>,
    joins: Vec<JoinTable>,
    where_: Vec<Predicate>,
    order_by: Vec<Field>,
    limit: Option<Value>,
    returning: Vec<Field>,
}

impl UpdateQuery {
    /// An empty UPDATE; rendering fails until a table is set.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ctes: Vec::new(),
            table: None,
            assignments: Vec::new(),
            mapper: None,
            from: None,
            joins: Vec::new(),
            where_: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            returning: Vec::new(),
        }
    }

    pub fn with<I: IntoIterator<Item = Cte>>(mut self, ctes: I) -> Self {
        self.ctes.extend(ctes);
        self
    }

    pub fn table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    // ==================== SET ====================

    pub fn set<I: IntoIterator<Item = Assignment>>(mut self, assignments: I) -> Self {
        self.assignments.extend(assignments);
        self
    }

    /// Produce the assignments from a mapper at render time. Ignored when
    /// assignments were set directly.
    pub fn set_fn<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&mut Column) -> SqlResult<()> + Send + Sync + 'static,
    {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    pub fn set_mapper(mut self, mapper: ColumnMapper) -> Self {
        self.mapper = Some(mapper);
        self
    }

    // ==================== FROM / JOIN ====================

    pub fn from(mut self, table: Table) -> Self {
        self.from = Some(table);
        self
    }

    fn push_join(mut self, join: JoinTable) -> Self {
        self.joins.push(join);
        self
    }

    pub fn join(self, table: Table, on: impl Into<Predicate>) -> Self {
        self.push_join(JoinTable::new(JoinOperator::Join, table).on(on))
    }

    pub fn left_join(self, table: Table, on: impl Into<Predicate>) -> Self {
        self.push_join(JoinTable::new(JoinOperator::LeftJoin, table).on(on))
    }

    pub fn right_join(self, table: Table, on: impl Into<Predicate>) -> Self {
        self.push_join(JoinTable::new(JoinOperator::RightJoin, table).on(on))
    }

    pub fn full_join(self, table: Table, on: impl Into<Predicate>) -> Self {
        self.push_join(JoinTable::new(JoinOperator::FullJoin, table).on(on))
    }

    pub fn cross_join(self, table: Table) -> Self {
        self.push_join(JoinTable::new(JoinOperator::CrossJoin, table))
    }

    /// Join with a verbatim operator, e.g. `,`.
    pub fn custom_join(self, operator: impl Into<String>, table: Table) -> Self {
        self.push_join(JoinTable::new(JoinOperator::Custom(operator.into()), table))
    }

    pub fn join_using<I: IntoIterator<Item = Field>>(self, table: Table, fields: I) -> Self {
        self.push_join(JoinTable::new(JoinOperator::Join, table).using(fields))
    }

    // ==================== WHERE / ORDER BY / LIMIT ====================

    /// Add predicates; all predicates are ANDed.
    pub fn where_<I: IntoIterator<Item = Predicate>>(mut self, predicates: I) -> Self {
        self.where_.extend(predicates);
        self
    }

    /// MySQL only.
    pub fn order_by<I: IntoIterator<Item = Field>>(mut self, fields: I) -> Self {
        self.order_by.extend(fields);
        self
    }

    /// MySQL only.
    pub fn limit(mut self, limit: impl Into<Value>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    // ==================== RETURNING ====================

    /// Postgres and SQLite only.
    pub fn returning<I: IntoIterator<Item = Field>>(mut self, fields: I) -> Self {
        self.returning.extend(fields);
        self
    }

    pub fn clear_returning(mut self) -> Self {
        self.returning.clear();
        self
    }

    /// Check the statement against `dialect` and resolve the assignments.
    fn validate(&self, dialect: Dialect) -> SqlResult<(&Table, Cow<'_, [Assignment]>)> {
        let Some(table) = &self.table else {
            return Err(SqlError::invalid("missing target table"));
        };

        let assignments = if !self.assignments.is_empty() {
            Cow::Borrowed(self.assignments.as_slice())
        } else if let Some(mapper) = &self.mapper {
            let mut col = Column::for_update(dialect);
            mapper(&mut col)?;
            let assignments = col.into_assignments();
            if assignments.is_empty() {
                return Err(SqlError::invalid("column mapper did not set any field"));
            }
            Cow::Owned(assignments)
        } else {
            return Err(SqlError::invalid("no fields provided to SET"));
        };

        if self.from.is_some() && !dialect.supports_update_from() {
            return Err(SqlError::unsupported(dialect, "UPDATE ... FROM"));
        }
        if !self.joins.is_empty() && self.from.is_none() && dialect.update_join_requires_from() {
            return Err(SqlError::unsupported(dialect, "JOIN without FROM"));
        }
        if !self.order_by.is_empty() && !dialect.supports_order_limit_on_mutation() {
            return Err(SqlError::unsupported(dialect, "UPDATE ... ORDER BY"));
        }
        if self.limit.is_some() && !dialect.supports_order_limit_on_mutation() {
            return Err(SqlError::unsupported(dialect, "UPDATE ... LIMIT"));
        }
        if !self.returning.is_empty() && !dialect.supports_returning() {
            return Err(SqlError::unsupported(dialect, "RETURNING"));
        }
        Ok((table, assignments))
    }

    fn write_update(&self, out: &mut Output) -> SqlResult<()> {
        let dialect = out.dialect();
        let (table, assignments) = self.validate(dialect)?;

        let tables = std::iter::once(table)
            .chain(self.from.as_ref())
            .chain(self.joins.iter().map(|j| &j.table));
        let predicate = where_predicate(dialect, tables, &self.where_)?;

        write_ctes(out, &self.ctes)?;
        out.push_str("UPDATE ");
        table.write_sql(out)?;
        if dialect == Dialect::MySql {
            write_joins(out, &self.joins)?;
        }

        out.push_str(" SET ");
        write_assignments(out, &assignments)?;

        if let Some(from) = &self.from {
            out.push_str(" FROM ");
            from.write_sql(out)?;
        }
        if dialect != Dialect::MySql {
            write_joins(out, &self.joins)?;
        }

        write_where(out, predicate.as_ref())?;

        write_order_by(out, &self.order_by)?;
        if let Some(limit) = &self.limit {
            out.push_str(" LIMIT ");
            out.write_value(limit)?;
        }

        write_returning(out, &self.returning)
    }
}

impl SqlWriter for UpdateQuery {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        self.write_update(out).map_err(|e| e.in_statement("UPDATE"))
    }
}

impl Query for UpdateQuery {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn set_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    fn fetchable_fields(&self) -> &[Field] {
        if self.dialect.supports_returning() {
            &self.returning
        } else {
            &[]
        }
    }

    fn set_fetchable_fields(mut self, fields: Vec<Field>) -> (Self, bool) {
        if !self.dialect.supports_returning() || !self.returning.is_empty() {
            return (self, false);
        }
        self.returning = fields;
        (self, true)
    }
}

impl fmt::Debug for UpdateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateQuery")
            .field("dialect", &self.dialect)
            .field("ctes", &self.ctes)
            .field("table", &self.table)
            .field("assignments", &self.assignments)
            .field("mapper", &self.mapper.as_ref().map(|_| "<fn>"))
            .field("from", &self.from)
            .field("joins", &self.joins)
            .field("where", &self.where_)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("returning", &self.returning)
            .finish()
    }
}
