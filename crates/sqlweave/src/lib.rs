//! # sqlweave
//!
//! A multi-dialect SQL statement builder for SQLite, Postgres, MySQL and
//! SQL Server.
//!
//! ## Features
//!
//! - **Typed fields**: tables hand out fields tagged by kind (number, string,
//!   time, JSON, ...), and predicates and assignments are built from them
//! - **One builder, many dialects**: the same statement renders with `$1`,
//!   `?` or `@p1` placeholders and is validated against the dialect's clause
//!   support before any SQL is written
//! - **Mapper-driven projections**: a row mapper is dry-run against the
//!   statement to discover the columns it reads, so `SELECT` lists and
//!   `RETURNING` clauses never drift from the code that consumes them
//! - **Strict coercion**: malformed driver values are errors, never silent
//!   defaults
//! - **Bring your own driver**: execution goes through the small
//!   [`Database`] trait; statements arrive fully rendered
//! - **Query logging**: line-oriented or `tracing`-based, per database
//!
//! ## Building statements
//!
//! ```ignore
//! use sqlweave::{Dialect, Query, Table};
//!
//! let film = Table::named("film");
//! let stmt = Dialect::MySql
//!     .update(film.clone())
//!     .set([film.string("title").set("ALIEN CENTER")])
//!     .where_([film.number("film_id").eq(1)])
//!     .build()?;
//! assert_eq!(stmt.sql, "UPDATE film SET title = ? WHERE film.film_id = ?");
//! ```
//!
//! ## Reading rows
//!
//! ```ignore
//! use sqlweave::exec::fetch_all;
//!
//! let titles = fetch_all(&db, Dialect::Postgres.select_from(film.clone()), |row| {
//!     row.string(&film.string("title"))
//! })
//! .await?;
//! ```

pub mod client;
pub mod column;
pub mod dialect;
pub mod error;
pub mod exec;
pub mod field;
pub mod monitor;
pub mod predicate;
pub mod query;
pub mod render;
pub mod repo;
pub mod row;
pub mod table;
pub mod transaction;
pub mod value;

pub use client::{Database, ExecResult, RowCursor, RowStream};
pub use column::{Column, ColumnMapper};
pub use dialect::Dialect;
pub use error::{SqlError, SqlResult};
pub use exec::{FetchStream, exec, fetch_all, fetch_cursor, fetch_exists, fetch_one};
pub use field::{ColumnField, Expression, Field, FieldKind, NullsOrder, SortDir, expr, exprf};
pub use monitor::{Logged, LoggerConfig, QueryLogger, QueryStats, TextLogger, TracingLogger};
pub use predicate::{Assignment, Predicate, and, not, or};
pub use query::{Conflict, DeleteQuery, InsertQuery, Query, RawQuery, SelectQuery, UpdateQuery};
pub use render::{Output, Rendered, SqlWriter};
pub use repo::{Repository, TableMapper};
pub use row::{ColumnRef, Row};
pub use table::{Cte, JoinOperator, JoinTable, PolicyTable, Table};
pub use transaction::{IsolationLevel, Transaction, TransactionalDatabase, TxOptions, run_in_tx};
pub use value::{ArrayValue, Enumeration, Parameter, Value, WireValue, param};
