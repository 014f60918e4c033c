//! SELECT statement builder.

use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::field::Field;
use crate::predicate::{Predicate, and};
use crate::query::{Query, where_predicate, write_order_by, write_projections, write_where};
use crate::render::{Output, SqlWriter};
use crate::table::{Cte, JoinOperator, JoinTable, Table, write_ctes, write_joins};
use crate::value::Value;

/// SELECT statement builder.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    dialect: Dialect,
    ctes: Vec<Cte>,
    distinct: bool,
    fields: Vec<Field>,
    from: Option<Table>,
    joins: Vec<JoinTable>,
    where_: Vec<Predicate>,
    group_by: Vec<Field>,
    having: Vec<Predicate>,
    order_by: Vec<Field>,
    limit: Option<Value>,
    offset: Option<Value>,
}

impl SelectQuery {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ctes: Vec::new(),
            distinct: false,
            fields: Vec::new(),
            from: None,
            joins: Vec::new(),
            where_: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn with<I: IntoIterator<Item = Cte>>(mut self, ctes: I) -> Self {
        self.ctes.extend(ctes);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn fields<I: IntoIterator<Item = Field>>(mut self, fields: I) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn from(mut self, table: Table) -> Self {
        self.from = Some(table);
        self
    }

    // ==================== JOIN ====================

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

    pub fn custom_join(self, operator: impl Into<String>, table: Table) -> Self {
        self.push_join(JoinTable::new(JoinOperator::Custom(operator.into()), table))
    }

    pub fn join_using<I: IntoIterator<Item = Field>>(self, table: Table, fields: I) -> Self {
        self.push_join(JoinTable::new(JoinOperator::Join, table).using(fields))
    }

    // ==================== Filtering and grouping ====================

    pub fn where_<I: IntoIterator<Item = Predicate>>(mut self, predicates: I) -> Self {
        self.where_.extend(predicates);
        self
    }

    pub fn group_by<I: IntoIterator<Item = Field>>(mut self, fields: I) -> Self {
        self.group_by.extend(fields);
        self
    }

    pub fn having<I: IntoIterator<Item = Predicate>>(mut self, predicates: I) -> Self {
        self.having.extend(predicates);
        self
    }

    // ==================== Ordering and paging ====================

    pub fn order_by<I: IntoIterator<Item = Field>>(mut self, fields: I) -> Self {
        self.order_by.extend(fields);
        self
    }

    pub fn limit(mut self, limit: impl Into<Value>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    pub fn offset(mut self, offset: impl Into<Value>) -> Self {
        self.offset = Some(offset.into());
        self
    }

    fn validate(&self, dialect: Dialect) -> SqlResult<()> {
        if self.fields.is_empty() {
            return Err(SqlError::invalid("no fields provided to SELECT"));
        }
        if !self.joins.is_empty() && self.from.is_none() {
            return Err(SqlError::invalid("JOIN without FROM"));
        }
        if !self.having.is_empty() && self.group_by.is_empty() {
            return Err(SqlError::invalid("HAVING without GROUP BY"));
        }
        if dialect == Dialect::SqlServer && self.offset.is_some() && self.order_by.is_empty() {
            return Err(SqlError::invalid("sqlserver OFFSET requires ORDER BY"));
        }
        Ok(())
    }

    fn write_select(&self, out: &mut Output) -> SqlResult<()> {
        let dialect = out.dialect();
        self.validate(dialect)?;

        let tables = self
            .from
            .iter()
            .chain(self.joins.iter().map(|j| &j.table));
        let predicate = where_predicate(dialect, tables, &self.where_)?;

        write_ctes(out, &self.ctes)?;
        out.push_str("SELECT ");
        if self.distinct {
            out.push_str("DISTINCT ");
        }
        // SQL Server has no LIMIT; without OFFSET it uses TOP
        let top = dialect == Dialect::SqlServer && self.offset.is_none();
        if top {
            if let Some(limit) = &self.limit {
                out.push_str("TOP (");
                out.write_value(limit)?;
                out.push_str(") ");
            }
        }
        write_projections(out, &self.fields)?;

        if let Some(from) = &self.from {
            out.push_str(" FROM ");
            from.write_sql(out)?;
        }
        write_joins(out, &self.joins)?;

        write_where(out, predicate.as_ref())?;

        if !self.group_by.is_empty() {
            out.push_str(" GROUP BY ");
            for (i, field) in self.group_by.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                field.write_sql(out)?;
            }
        }
        if !self.having.is_empty() {
            out.push_str(" HAVING ");
            and(self.having.iter().cloned()).write_sql(out)?;
        }

        write_order_by(out, &self.order_by)?;

        if dialect == Dialect::SqlServer {
            if let Some(offset) = &self.offset {
                out.push_str(" OFFSET ");
                out.write_value(offset)?;
                out.push_str(" ROWS");
                if let Some(limit) = &self.limit {
                    out.push_str(" FETCH NEXT ");
                    out.write_value(limit)?;
                    out.push_str(" ROWS ONLY");
                }
            }
            return Ok(());
        }
        if let Some(limit) = &self.limit {
            out.push_str(" LIMIT ");
            out.write_value(limit)?;
        }
        if let Some(offset) = &self.offset {
            out.push_str(" OFFSET ");
            out.write_value(offset)?;
        }
        Ok(())
    }
}

impl SqlWriter for SelectQuery {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        self.write_select(out).map_err(|e| e.in_statement("SELECT"))
    }
}

impl Query for SelectQuery {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn set_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    fn fetchable_fields(&self) -> &[Field] {
        &self.fields
    }

    fn set_fetchable_fields(mut self, fields: Vec<Field>) -> (Self, bool) {
        if !self.fields.is_empty() {
            return (self, false);
        }
        self.fields = fields;
        (self, true)
    }
}

/// A subquery, rendered in place.
impl From<SelectQuery> for Value {
    fn from(q: SelectQuery) -> Self {
        Value::sql(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{expr, exprf};
    use crate::value::WireValue;

    fn film() -> Table {
        Table::named("film").alias("f")
    }

    #[test]
    fn full_select() {
        let f = film();
        let a = Table::named("actor").alias("a");
        let q = Dialect::Postgres
            .select([f.number("rating"), Field::from(expr("COUNT(*)")).as_("n")])
            .distinct()
            .from(f.clone())
            .join(a.clone(), a.number("film_id").eq(f.number("film_id")))
            .where_([f.number("length").gt(60)])
            .group_by([f.number("rating")])
            .having([exprf("COUNT(*) > {}", [5]).into()])
            .order_by([f.number("rating").desc()])
            .limit(10)
            .offset(20);
        let r = q.build().unwrap();
        assert_eq!(
            r.sql,
            "SELECT DISTINCT f.rating, COUNT(*) AS n FROM film AS f \
             JOIN actor AS a ON a.film_id = f.film_id \
             WHERE f.length > $1 GROUP BY f.rating HAVING COUNT(*) > $2 \
             ORDER BY f.rating DESC LIMIT $3 OFFSET $4"
        );
        assert_eq!(
            r.args,
            vec![WireValue::Int(60), WireValue::Int(5), WireValue::Int(10), WireValue::Int(20)]
        );
    }

    #[test]
    fn sqlserver_paging() {
        let f = film();
        let q = Dialect::SqlServer.select([f.string("title")]).from(f.clone()).limit(5);
        assert_eq!(q.build().unwrap().sql, "SELECT TOP (@p1) f.title FROM film AS f");

        let q = q.order_by([f.string("title")]).offset(10);
        assert_eq!(
            q.build().unwrap().sql,
            "SELECT f.title FROM film AS f ORDER BY f.title OFFSET @p1 ROWS FETCH NEXT @p2 ROWS ONLY"
        );

        let err = Dialect::SqlServer
            .select([f.string("title")])
            .from(f)
            .offset(1)
            .build()
            .unwrap_err();
        assert!(err.is_invalid_statement());
    }

    #[test]
    fn fetchable_fields_only_set_once() {
        let f = film();
        let q = Dialect::Sqlite.select_from(f.clone());
        assert!(q.fetchable_fields().is_empty());
        let (q, ok) = q.set_fetchable_fields(vec![f.string("title")]);
        assert!(ok);
        let (_, ok) = q.set_fetchable_fields(vec![f.string("rating")]);
        assert!(!ok);
    }

    #[test]
    fn subquery_as_value() {
        let f = film();
        let sub = Dialect::Postgres
            .select([f.number("film_id")])
            .from(f.clone())
            .where_([f.number("length").gt(100)]);
        let outer = Dialect::Postgres
            .select([f.string("title")])
            .from(f.clone())
            .where_([exprf("f.film_id IN ({})", [sub]).into(), f.string("title").ne("x")]);
        assert_eq!(
            outer.build().unwrap().sql,
            "SELECT f.title FROM film AS f WHERE f.film_id IN (SELECT f.film_id FROM film AS f WHERE f.length > $1) AND f.title <> $2"
        );
    }
}
