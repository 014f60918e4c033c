//! INSERT statement builder.

use crate::column::{Column, ColumnMapper};
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::field::Field;
use crate::predicate::{Assignment, Predicate, and, write_assignments};
use crate::query::{Query, SelectQuery, write_returning};
use crate::render::{Output, SqlWriter};
use crate::table::{Cte, Table, write_ctes};
use crate::value::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Conflict resolution.
#[derive(Clone, Debug)]
pub enum Conflict {
    /// `ON CONFLICT [(target)] DO NOTHING`
    DoNothing { target: Vec<Field> },
    /// `ON CONFLICT [(target)] DO UPDATE SET ... [WHERE ...]`
    DoUpdate {
        target: Vec<Field>,
        assignments: Vec<Assignment>,
        where_: Vec<Predicate>,
    },
    /// `ON DUPLICATE KEY UPDATE ...` (MySQL)
    DuplicateKey { assignments: Vec<Assignment> },
}

impl Conflict {
    fn clause(&self) -> &'static str {
        match self {
            Conflict::DoNothing { .. } | Conflict::DoUpdate { .. } => "ON CONFLICT",
            Conflict::DuplicateKey { .. } => "ON DUPLICATE KEY UPDATE",
        }
    }

    fn supported_by(&self, dialect: Dialect) -> bool {
        match self {
            Conflict::DoNothing { .. } | Conflict::DoUpdate { .. } => dialect.supports_on_conflict(),
            Conflict::DuplicateKey { .. } => dialect.supports_on_duplicate_key(),
        }
    }
}

/// INSERT statement builder.
#[derive(Clone)]
pub struct InsertQuery {
    dialect: Dialect,
    ctes: Vec<Cte>,
    table: Option<Table>,
    columns: Vec<Field>,
    rows: Vec<Vec<Value>>,
    mapper: Option<ColumnMapper>,
    select: Option<Box<SelectQuery>>,
    conflict: Option<Conflict>,
    returning: Vec<Field>,
}

/// Where the inserted rows come from once resolved.
enum Source<'a> {
    Rows(Cow<'a, [Field]>, Cow<'a, [Vec<Value>]>),
    Select(&'a SelectQuery),
}

impl InsertQuery {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ctes: Vec::new(),
            table: None,
            columns: Vec::new(),
            rows: Vec::new(),
            mapper: None,
            select: None,
            conflict: None,
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

    pub fn columns<I: IntoIterator<Item = Field>>(mut self, columns: I) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Append one row of values. Each row must match the column list.
    pub fn values<I, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    /// Produce columns and rows from a mapper at render time.
    ///
    /// The first field set names the start of a row; setting it again starts
    /// the next row.
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

    /// `INSERT INTO table (columns) SELECT ...`
    pub fn select(mut self, query: SelectQuery) -> Self {
        self.select = Some(Box::new(query));
        self
    }

    // ==================== Conflicts ====================

    pub fn on_conflict_do_nothing<I: IntoIterator<Item = Field>>(mut self, target: I) -> Self {
        self.conflict = Some(Conflict::DoNothing {
            target: target.into_iter().collect(),
        });
        self
    }

    pub fn on_conflict_do_update<T, A>(mut self, target: T, assignments: A) -> Self
    where
        T: IntoIterator<Item = Field>,
        A: IntoIterator<Item = Assignment>,
    {
        self.conflict = Some(Conflict::DoUpdate {
            target: target.into_iter().collect(),
            assignments: assignments.into_iter().collect(),
            where_: Vec::new(),
        });
        self
    }

    /// Restrict `DO UPDATE` to rows matching the predicates.
    pub fn conflict_where<I: IntoIterator<Item = Predicate>>(mut self, predicates: I) -> Self {
        if let Some(Conflict::DoUpdate { where_, .. }) = &mut self.conflict {
            where_.extend(predicates);
        }
        self
    }

    pub fn on_duplicate_key_update<I: IntoIterator<Item = Assignment>>(mut self, assignments: I) -> Self {
        self.conflict = Some(Conflict::DuplicateKey {
            assignments: assignments.into_iter().collect(),
        });
        self
    }

    // ==================== RETURNING ====================

    /// Postgres and SQLite only.
    pub fn returning<I: IntoIterator<Item = Field>>(mut self, fields: I) -> Self {
        self.returning.extend(fields);
        self
    }

    fn validate(&self, dialect: Dialect) -> SqlResult<(&Table, Source<'_>)> {
        let Some(table) = &self.table else {
            return Err(SqlError::invalid("missing target table"));
        };

        let source = if !self.rows.is_empty() {
            if !self.columns.is_empty() {
                for (i, row) in self.rows.iter().enumerate() {
                    if row.len() != self.columns.len() {
                        return Err(SqlError::invalid(format!(
                            "row {} has {} values, expected {}",
                            i + 1,
                            row.len(),
                            self.columns.len()
                        )));
                    }
                }
            }
            Source::Rows(Cow::Borrowed(self.columns.as_slice()), Cow::Borrowed(self.rows.as_slice()))
        } else if let Some(select) = &self.select {
            Source::Select(select.as_ref())
        } else if let Some(mapper) = &self.mapper {
            let mut col = Column::for_insert(dialect);
            mapper(&mut col)?;
            let (columns, rows) = col.into_rows();
            if rows.is_empty() {
                return Err(SqlError::invalid("column mapper did not set any field"));
            }
            Source::Rows(Cow::Owned(columns), Cow::Owned(rows))
        } else {
            return Err(SqlError::invalid("no rows provided to INSERT"));
        };

        if let Some(conflict) = &self.conflict {
            if !conflict.supported_by(dialect) {
                return Err(SqlError::unsupported(dialect, conflict.clause()));
            }
        }
        if !self.returning.is_empty() && !dialect.supports_returning() {
            return Err(SqlError::unsupported(dialect, "RETURNING"));
        }
        Ok((table, source))
    }

    fn write_insert(&self, out: &mut Output) -> SqlResult<()> {
        let (table, source) = self.validate(out.dialect())?;

        write_ctes(out, &self.ctes)?;
        out.push_str("INSERT INTO ");
        table.write_sql(out)?;

        let columns: &[Field] = match &source {
            Source::Rows(columns, _) => &columns[..],
            Source::Select(_) => &self.columns[..],
        };
        if !columns.is_empty() {
            out.push_str(" (");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                column.write_unqualified(out)?;
            }
            out.push(')');
        }

        match &source {
            Source::Rows(_, rows) => {
                out.push_str(" VALUES ");
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push('(');
                    for (j, value) in row.iter().enumerate() {
                        if j > 0 {
                            out.push_str(", ");
                        }
                        out.write_value(value)?;
                    }
                    out.push(')');
                }
            }
            Source::Select(select) => {
                out.push(' ');
                select.write_sql(out)?;
            }
        }

        if let Some(conflict) = &self.conflict {
            write_conflict(out, conflict)?;
        }
        write_returning(out, &self.returning)
    }
}

fn write_conflict(out: &mut Output, conflict: &Conflict) -> SqlResult<()> {
    let write_target = |out: &mut Output, target: &[Field]| -> SqlResult<()> {
        out.push_str(" ON CONFLICT");
        if !target.is_empty() {
            out.push_str(" (");
            for (i, field) in target.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                field.write_unqualified(out)?;
            }
            out.push(')');
        }
        Ok(())
    };

    match conflict {
        Conflict::DoNothing { target } => {
            write_target(out, target)?;
            out.push_str(" DO NOTHING");
        }
        Conflict::DoUpdate {
            target,
            assignments,
            where_,
        } => {
            write_target(out, target)?;
            out.push_str(" DO UPDATE SET ");
            write_assignments(out, assignments)?;
            if !where_.is_empty() {
                out.push_str(" WHERE ");
                and(where_.iter().cloned()).write_sql(out)?;
            }
        }
        Conflict::DuplicateKey { assignments } => {
            out.push_str(" ON DUPLICATE KEY UPDATE ");
            write_assignments(out, assignments)?;
        }
    }
    Ok(())
}

impl SqlWriter for InsertQuery {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        self.write_insert(out).map_err(|e| e.in_statement("INSERT"))
    }
}

impl Query for InsertQuery {
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

impl fmt::Debug for InsertQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertQuery")
            .field("dialect", &self.dialect)
            .field("ctes", &self.ctes)
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("rows", &self.rows)
            .field("mapper", &self.mapper.as_ref().map(|_| "<fn>"))
            .field("select", &self.select)
            .field("conflict", &self.conflict)
            .field("returning", &self.returning)
            .finish()
    }
}
