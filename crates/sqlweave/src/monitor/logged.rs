use super::config::LoggerConfig;
use super::logger::TextLogger;
use super::types::{QueryLogger, QueryStats};
use crate::client::{Database, ExecResult, RowCursor};
use crate::error::SqlResult;
use crate::render::Rendered;
use std::sync::Arc;

/// A database paired with a logger.
#[derive(Clone)]
pub struct Logged<D> {
    db: D,
    logger: Arc<dyn QueryLogger>,
}

impl<D: std::fmt::Debug> std::fmt::Debug for Logged<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logged").field("db", &self.db).finish_non_exhaustive()
    }
}

impl<D> Logged<D> {
    pub fn new(db: D, logger: Arc<dyn QueryLogger>) -> Self {
        Self { db, logger }
    }

    pub fn inner(&self) -> &D {
        &self.db
    }

    pub fn into_inner(self) -> D {
        self.db
    }

    /// Wrap another database with the same logger.
    pub fn rewrap<T>(&self, db: T) -> Logged<T> {
        Logged {
            db,
            logger: Arc::clone(&self.logger),
        }
    }
}

impl<D: Database> Database for Logged<D> {
    fn execute(&self, stmt: &Rendered) -> impl std::future::Future<Output = SqlResult<ExecResult>> + Send {
        self.db.execute(stmt)
    }

    fn query(&self, stmt: &Rendered) -> impl std::future::Future<Output = SqlResult<RowCursor>> + Send {
        self.db.query(stmt)
    }

    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        Some(Arc::clone(&self.logger))
    }
}

/// Log to stdout with time taken and caller.
pub fn log<D: Database>(db: D) -> Logged<D> {
    let logger = TextLogger::stdout(LoggerConfig::standard().from_env());
    Logged::new(db, Arc::new(logger))
}

/// Log to stdout with bind values and the first five fetched rows.
pub fn verbose_log<D: Database>(db: D) -> Logged<D> {
    let logger = TextLogger::stdout(LoggerConfig::verbose().from_env());
    Logged::new(db, Arc::new(logger))
}

/// Hand `stats` to `logger`, on the ambient runtime when asked to log
/// asynchronously and one is running.
pub(crate) fn dispatch(logger: Arc<dyn QueryLogger>, asynchronous: bool, stats: QueryStats) {
    if asynchronous {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { logger.log_query(&stats) });
            return;
        }
    }
    logger.log_query(&stats);
}
