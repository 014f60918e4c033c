//! Execution collaborator trait.

use crate::error::SqlResult;
use crate::monitor::QueryLogger;
use crate::render::Rendered;
use crate::value::WireValue;
use futures_core::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// A stream of fetched records, one `Vec` of wire values per row.
pub type RowStream = Pin<Box<dyn Stream<Item = SqlResult<Vec<WireValue>>> + Send>>;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Only reported by drivers that have one (SQLite, MySQL).
    pub last_insert_id: Option<i64>,
}

/// A running query: the driver's column names and the record stream.
pub struct RowCursor {
    pub columns: Vec<String>,
    pub rows: RowStream,
}

impl std::fmt::Debug for RowCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// A driver connection, pool or transaction.
///
/// Implementations receive statements already rendered for their dialect
/// and transmit `sql` and `args` unchanged.
pub trait Database: Send + Sync {
    /// Run a statement and report the affected row count.
    fn execute(&self, stmt: &Rendered) -> impl std::future::Future<Output = SqlResult<ExecResult>> + Send;

    /// Run a query and stream its rows.
    fn query(&self, stmt: &Rendered) -> impl std::future::Future<Output = SqlResult<RowCursor>> + Send;

    /// Logger that receives a [`QueryStats`](crate::monitor::QueryStats)
    /// after every statement run through the execution helpers.
    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        None
    }
}

impl<D: Database> Database for &D {
    fn execute(&self, stmt: &Rendered) -> impl std::future::Future<Output = SqlResult<ExecResult>> + Send {
        (**self).execute(stmt)
    }

    fn query(&self, stmt: &Rendered) -> impl std::future::Future<Output = SqlResult<RowCursor>> + Send {
        (**self).query(stmt)
    }

    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        (**self).logger()
    }
}

impl<D: Database> Database for Arc<D> {
    fn execute(&self, stmt: &Rendered) -> impl std::future::Future<Output = SqlResult<ExecResult>> + Send {
        (**self).execute(stmt)
    }

    fn query(&self, stmt: &Rendered) -> impl std::future::Future<Output = SqlResult<RowCursor>> + Send {
        (**self).query(stmt)
    }

    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        (**self).logger()
    }
}
