//! DELETE statement builder.

use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::field::Field;
use crate::predicate::Predicate;
use crate::query::{Query, where_predicate, write_order_by, write_returning, write_where};
use crate::render::{Output, SqlWriter};
use crate::table::{Cte, JoinOperator, JoinTable, Table, write_ctes, write_joins};
use crate::value::Value;

/// DELETE statement builder.
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    dialect: Dialect,
    ctes: Vec<Cte>,
    table: Option<Table>,
    using: Option<Table>,
    joins: Vec<JoinTable>,
    where_: Vec<Predicate>,
    order_by: Vec<Field>,
    limit: Option<Value>,
    returning: Vec<Field>,
}

impl DeleteQuery {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ctes: Vec::new(),
            table: None,
            using: None,
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

    /// Postgres and MySQL only.
    pub fn using(mut self, table: Table) -> Self {
        self.using = Some(table);
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

    pub fn cross_join(self, table: Table) -> Self {
        self.push_join(JoinTable::new(JoinOperator::CrossJoin, table))
    }

    pub fn custom_join(self, operator: impl Into<String>, table: Table) -> Self {
        self.push_join(JoinTable::new(JoinOperator::Custom(operator.into()), table))
    }

    pub fn join_using<I: IntoIterator<Item = Field>>(self, table: Table, fields: I) -> Self {
        self.push_join(JoinTable::new(JoinOperator::Join, table).using(fields))
    }

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

    /// Postgres and SQLite only.
    pub fn returning<I: IntoIterator<Item = Field>>(mut self, fields: I) -> Self {
        self.returning.extend(fields);
        self
    }

    fn validate(&self, dialect: Dialect) -> SqlResult<&Table> {
        let Some(table) = &self.table else {
            return Err(SqlError::invalid("missing target table"));
        };
        if (self.using.is_some() || !self.joins.is_empty()) && !dialect.supports_delete_using() {
            return Err(SqlError::unsupported(dialect, "DELETE ... USING"));
        }
        if !self.joins.is_empty() && self.using.is_none() {
            return Err(SqlError::unsupported(dialect, "JOIN without USING"));
        }
        if !self.order_by.is_empty() && !dialect.supports_order_limit_on_mutation() {
            return Err(SqlError::unsupported(dialect, "DELETE ... ORDER BY"));
        }
        if self.limit.is_some() && !dialect.supports_order_limit_on_mutation() {
            return Err(SqlError::unsupported(dialect, "DELETE ... LIMIT"));
        }
        if !self.returning.is_empty() && !dialect.supports_returning() {
            return Err(SqlError::unsupported(dialect, "RETURNING"));
        }
        Ok(table)
    }

    fn write_delete(&self, out: &mut Output) -> SqlResult<()> {
        let dialect = out.dialect();
        let table = self.validate(dialect)?;

        let tables = std::iter::once(table)
            .chain(self.using.as_ref())
            .chain(self.joins.iter().map(|j| &j.table));
        let predicate = where_predicate(dialect, tables, &self.where_)?;

        write_ctes(out, &self.ctes)?;
        out.push_str("DELETE FROM ");
        table.write_sql(out)?;
        if let Some(using) = &self.using {
            out.push_str(" USING ");
            using.write_sql(out)?;
        }
        write_joins(out, &self.joins)?;

        write_where(out, predicate.as_ref())?;

        write_order_by(out, &self.order_by)?;
        if let Some(limit) = &self.limit {
            out.push_str(" LIMIT ");
            out.write_value(limit)?;
        }

        write_returning(out, &self.returning)
    }
}

impl SqlWriter for DeleteQuery {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        self.write_delete(out).map_err(|e| e.in_statement("DELETE"))
    }
}

impl Query for DeleteQuery {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::expr;

    fn actor() -> Table {
        Table::named("actor").alias("a")
    }

    #[test]
    fn delete_with_using_and_returning() {
        let a = actor();
        let f = Table::named("film").alias("f");
        let q = Dialect::Postgres
            .delete_from(a.clone())
            .using(f.clone())
            .where_([a.number("film_id").eq(f.number("film_id")), f.string("title").eq("x")])
            .returning([a.number("actor_id")]);
        let r = q.build().unwrap();
        assert_eq!(
            r.sql,
            "DELETE FROM actor AS a USING film AS f WHERE a.film_id = f.film_id AND f.title = $1 RETURNING a.actor_id"
        );
    }

    #[test]
    fn mysql_order_by_limit() {
        let a = actor();
        let r = Dialect::MySql
            .delete_from(a.clone())
            .where_([a.time("last_update").is_null()])
            .order_by([a.number("actor_id").desc()])
            .limit(10)
            .build()
            .unwrap();
        assert_eq!(
            r.sql,
            "DELETE FROM actor AS a WHERE a.last_update IS NULL ORDER BY a.actor_id DESC LIMIT ?"
        );
    }

    #[test]
    fn unsupported_clauses() {
        let q = Dialect::Sqlite.delete_from(actor()).using(Table::named("film"));
        assert!(q.build().unwrap_err().is_unsupported());

        let q = Dialect::Postgres
            .delete_from(actor())
            .join(Table::named("film"), expr("1 = 1"));
        assert!(q.build().unwrap_err().is_unsupported());

        let q = Dialect::SqlServer.delete_from(actor()).returning([expr("1").into()]);
        assert!(q.build().unwrap_err().is_unsupported());
    }

    #[test]
    fn missing_table() {
        let err = DeleteQuery::new(Dialect::Sqlite).build().unwrap_err();
        assert!(err.is_invalid_statement());
        assert_eq!(err.to_string(), "Invalid statement: DELETE: missing target table");
    }
}
