//! Generic CRUD over one table.
//!
//! A [`TableMapper`] ties a table to its write-side column mapper and its
//! read-side row mapper; [`Repository`] builds the five common statements
//! from it and runs them through the execution helpers.
//!
//! ```ignore
//! let films = Repository::new(Dialect::Postgres, FilmTable::default());
//! films.insert(&db, vec![new_film]).await?;
//! let film = films.one(&db, films.mapper().film_id.eq(1)).await?;
//! ```

use crate::client::{Database, ExecResult};
use crate::column::Column;
use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::exec;
use crate::predicate::Predicate;
use crate::row::Row;
use crate::table::Table;
use std::future::Future;
use std::sync::Arc;

/// A table with its column and row mappers.
pub trait TableMapper: Send + Sync + 'static {
    /// What rows are read into.
    type Model: Send;
    /// What rows are written from.
    type Input: Send + Sync + 'static;

    fn table(&self) -> Table;

    /// Set the fields of one input. Called once per input on insert and
    /// once on update.
    fn map_columns(&self, column: &mut Column, input: &Self::Input) -> SqlResult<()>;

    fn map_row(&self, row: &mut Row) -> SqlResult<Self::Model>;
}

/// CRUD statements for the table of a [`TableMapper`].
#[derive(Debug)]
pub struct Repository<M> {
    dialect: Dialect,
    mapper: Arc<M>,
}

impl<M> Clone for Repository<M> {
    fn clone(&self) -> Self {
        Self {
            dialect: self.dialect,
            mapper: Arc::clone(&self.mapper),
        }
    }
}

impl<M: TableMapper> Repository<M> {
    pub fn new(dialect: Dialect, mapper: M) -> Self {
        Self {
            dialect,
            mapper: Arc::new(mapper),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn table(&self) -> Table {
        self.mapper.table()
    }

    /// Insert one row per input.
    #[track_caller]
    pub fn insert<D: Database>(
        &self,
        db: &D,
        inputs: Vec<M::Input>,
    ) -> impl Future<Output = SqlResult<ExecResult>> + Send {
        let mapper = Arc::clone(&self.mapper);
        let query = self
            .dialect
            .insert_into(self.mapper.table())
            .set_fn(move |column| {
                for input in &inputs {
                    mapper.map_columns(column, input)?;
                }
                Ok(())
            });
        exec::exec(db, query)
    }

    /// Update the rows matching `predicate` with the fields of `input`.
    #[track_caller]
    pub fn update<D: Database>(
        &self,
        db: &D,
        predicate: impl Into<Predicate>,
        input: M::Input,
    ) -> impl Future<Output = SqlResult<ExecResult>> + Send {
        let mapper = Arc::clone(&self.mapper);
        let query = self
            .dialect
            .update(self.mapper.table())
            .set_fn(move |column| mapper.map_columns(column, &input))
            .where_([predicate.into()]);
        exec::exec(db, query)
    }

    /// Delete the rows matching `predicate`.
    #[track_caller]
    pub fn delete<D: Database>(
        &self,
        db: &D,
        predicate: impl Into<Predicate>,
    ) -> impl Future<Output = SqlResult<ExecResult>> + Send {
        let query = self
            .dialect
            .delete_from(self.mapper.table())
            .where_([predicate.into()]);
        exec::exec(db, query)
    }

    /// The first row matching `predicate`; [`NotFound`](crate::SqlError::NotFound)
    /// when there is none.
    #[track_caller]
    pub fn one<D: Database>(
        &self,
        db: &D,
        predicate: impl Into<Predicate>,
    ) -> impl Future<Output = SqlResult<M::Model>> + Send {
        let query = self
            .dialect
            .select_from(self.mapper.table())
            .where_([predicate.into()])
            .limit(1);
        let mapper = Arc::clone(&self.mapper);
        exec::fetch_one(db, query, move |row| mapper.map_row(row))
    }

    /// Every row matching `predicate`.
    #[track_caller]
    pub fn all<D: Database>(
        &self,
        db: &D,
        predicate: impl Into<Predicate>,
    ) -> impl Future<Output = SqlResult<Vec<M::Model>>> + Send {
        let query = self
            .dialect
            .select_from(self.mapper.table())
            .where_([predicate.into()]);
        let mapper = Arc::clone(&self.mapper);
        exec::fetch_all(db, query, move |row| mapper.map_row(row))
    }
}
