//! Transactions over an execution collaborator.
//!
//! [`run_in_tx`] begins a transaction, hands it to a callback and commits
//! when the callback returns `Ok`. Every other exit rolls back: an `Err`
//! from the callback, a panic inside it (rolled back, then resumed), and a
//! dropped future (left to the driver, which rolls back an unfinished
//! transaction when it is dropped).
//!
//! # Example
//!
//! ```ignore
//! use sqlweave::transaction::{TxOptions, run_in_tx};
//! use sqlweave::exec;
//!
//! run_in_tx(&db, TxOptions::default(), |tx| {
//!     Box::pin(async move {
//!         exec::exec(tx, debit).await?;
//!         exec::exec(tx, credit).await?;
//!         Ok(())
//!     })
//! })
//! .await?;
//! ```

use crate::client::{Database, ExecResult, RowCursor};
use crate::error::{SqlError, SqlResult};
use crate::monitor::{Logged, QueryLogger};
use crate::render::Rendered;
use futures_core::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::Poll;

/// Transaction isolation level. `Default` leaves the choice to the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Snapshot,
    Serializable,
}

impl IsolationLevel {
    /// The level as written in `SET TRANSACTION ISOLATION LEVEL ...`.
    pub fn as_sql(self) -> Option<&'static str> {
        match self {
            IsolationLevel::Default => None,
            IsolationLevel::ReadUncommitted => Some("READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead => Some("REPEATABLE READ"),
            IsolationLevel::Snapshot => Some("SNAPSHOT"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql().unwrap_or("DEFAULT"))
    }
}

/// Options for [`TransactionalDatabase::begin`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

impl TxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = level;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// An open transaction. Dropping it without [`commit`](Self::commit) must
/// roll it back.
pub trait Transaction: Database + Sized {
    fn commit(self) -> impl Future<Output = SqlResult<()>> + Send;

    fn rollback(self) -> impl Future<Output = SqlResult<()>> + Send;
}

/// An execution collaborator that can begin transactions.
pub trait TransactionalDatabase: Database {
    type Tx: Transaction;

    fn begin(&self, options: TxOptions) -> impl Future<Output = SqlResult<Self::Tx>> + Send;
}

impl<D: TransactionalDatabase> TransactionalDatabase for &D {
    type Tx = D::Tx;

    fn begin(&self, options: TxOptions) -> impl Future<Output = SqlResult<Self::Tx>> + Send {
        (**self).begin(options)
    }
}

impl<D: TransactionalDatabase> TransactionalDatabase for Arc<D> {
    type Tx = D::Tx;

    fn begin(&self, options: TxOptions) -> impl Future<Output = SqlResult<Self::Tx>> + Send {
        (**self).begin(options)
    }
}

/// Transactions begun on a logged database keep its logger.
impl<D: TransactionalDatabase> TransactionalDatabase for Logged<D> {
    type Tx = Logged<D::Tx>;

    fn begin(&self, options: TxOptions) -> impl Future<Output = SqlResult<Self::Tx>> + Send {
        async move {
            let tx = self.inner().begin(options).await?;
            Ok(self.rewrap(tx))
        }
    }
}

impl<T: Transaction> Transaction for Logged<T> {
    fn commit(self) -> impl Future<Output = SqlResult<()>> + Send {
        self.into_inner().commit()
    }

    fn rollback(self) -> impl Future<Output = SqlResult<()>> + Send {
        self.into_inner().rollback()
    }
}

/// Warns when a transaction is abandoned before commit or rollback ran.
struct TxGuard {
    settled: bool,
}

impl Drop for TxGuard {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(
                target: "sqlweave.tx",
                "transaction dropped before commit or rollback; the driver rolls it back"
            );
        }
    }
}

/// Run `callback` inside a transaction.
///
/// Commits when the callback returns `Ok`. On `Err` the transaction is rolled
/// back and the callback's error returned; a failed rollback is reported as
/// `"<error> (rollback failed: <rollback error>)"`. A panic in the callback
/// rolls back and then resumes unwinding.
pub async fn run_in_tx<D, T, F>(db: &D, options: TxOptions, callback: F) -> SqlResult<T>
where
    D: TransactionalDatabase,
    F: for<'t> FnOnce(&'t D::Tx) -> BoxFuture<'t, SqlResult<T>>,
{
    let tx = db.begin(options).await?;
    let mut guard = TxGuard { settled: false };

    let outcome = {
        let mut body = callback(&tx);
        std::future::poll_fn(|cx| {
            match std::panic::catch_unwind(AssertUnwindSafe(|| body.as_mut().poll(cx))) {
                Ok(Poll::Pending) => Poll::Pending,
                Ok(Poll::Ready(result)) => Poll::Ready(Ok(result)),
                Err(payload) => Poll::Ready(Err(payload)),
            }
        })
        .await
    };

    match outcome {
        Ok(Ok(value)) => {
            guard.settled = true;
            tx.commit().await?;
            Ok(value)
        }
        Ok(Err(error)) => {
            guard.settled = true;
            match tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err(SqlError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            }
        }
        Err(payload) => {
            guard.settled = true;
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(
                    target: "sqlweave.tx",
                    error = %rollback_err,
                    "rollback after panic failed"
                );
            }
            std::panic::resume_unwind(payload)
        }
    }
}

/// A database whose [`run_in_tx`](InTx::run_in_tx) method begins
/// transactions with fixed options.
#[derive(Debug, Clone)]
pub struct InTx<D> {
    db: D,
    options: TxOptions,
}

impl<D: TransactionalDatabase> InTx<D> {
    pub fn new(db: D, options: TxOptions) -> Self {
        Self { db, options }
    }

    pub fn inner(&self) -> &D {
        &self.db
    }

    pub fn options(&self) -> TxOptions {
        self.options
    }

    pub async fn run_in_tx<T, F>(&self, callback: F) -> SqlResult<T>
    where
        F: for<'t> FnOnce(&'t D::Tx) -> BoxFuture<'t, SqlResult<T>>,
    {
        run_in_tx(&self.db, self.options, callback).await
    }
}

impl<D: Database> Database for InTx<D> {
    fn execute(&self, stmt: &Rendered) -> impl Future<Output = SqlResult<ExecResult>> + Send {
        self.db.execute(stmt)
    }

    fn query(&self, stmt: &Rendered) -> impl Future<Output = SqlResult<RowCursor>> + Send {
        self.db.query(stmt)
    }

    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        self.db.logger()
    }
}

impl<D: TransactionalDatabase> TransactionalDatabase for InTx<D> {
    type Tx = D::Tx;

    fn begin(&self, options: TxOptions) -> impl Future<Output = SqlResult<Self::Tx>> + Send {
        self.db.begin(options)
    }
}
