//! Query logging for executed statements.
//!
//! Every statement run through the execution helpers produces a
//! [`QueryStats`]. When the database has a [`QueryLogger`], the helpers ask it
//! for its [`LogSettings`] before running the statement (so the cost of
//! capturing callers and result previews is only paid when wanted) and hand
//! it the finished stats afterwards. Logging never changes the outcome of a
//! statement.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlweave::monitor::{log, verbose_log};
//!
//! let db = log(driver);            // [OK] ... timeTaken=... caller=...
//! let db = verbose_log(driver);    // also prints bind values and results
//! ```

mod config;
mod logged;
mod logger;
mod tracing_logger;
mod types;

#[cfg(test)]
mod tests;

pub use config::LoggerConfig;
pub use logged::{Logged, log, verbose_log};
pub(crate) use logged::dispatch;
pub use logger::TextLogger;
pub use tracing_logger::TracingLogger;
pub use types::{LogSettings, QueryLogger, QueryStats, QueryType};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
