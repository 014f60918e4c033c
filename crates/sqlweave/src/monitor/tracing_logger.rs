use super::truncate_sql_bytes;
use super::types::{LogSettings, QueryLogger, QueryStats};
use tracing::Level;

/// A `tracing`-based logger emitting one event per executed statement under
/// the target `sqlweave.sql`.
///
/// Failed statements are always emitted at `WARN` or above.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    /// Tracing event level for successful statements.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    pub settings: LogSettings,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
            settings: LogSettings {
                include_time: true,
                include_caller: true,
                ..LogSettings::default()
            },
        }
    }
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub fn settings(mut self, settings: LogSettings) -> Self {
        self.settings = settings;
        self
    }

    pub(super) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

impl QueryLogger for TracingLogger {
    fn log_settings(&self) -> LogSettings {
        self.settings
    }

    fn log_query(&self, stats: &QueryStats) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(&stats.query);
        let caller = format!("{}:{}", stats.caller_file, stats.caller_line);
        match &stats.error {
            None => emit_at_level!(
                self.level,
                target: "sqlweave.sql",
                dialect = %stats.dialect,
                query_type = ?stats.query_type(),
                sql = %sql,
                arg_count = stats.args.len(),
                row_count = stats.row_count,
                rows_affected = stats.rows_affected,
                time_taken = ?stats.time_taken,
                caller = %caller,
            ),
            Some(error) => {
                let level = if self.level > Level::WARN { Level::WARN } else { self.level };
                emit_at_level!(
                    level,
                    target: "sqlweave.sql",
                    dialect = %stats.dialect,
                    query_type = ?stats.query_type(),
                    sql = %sql,
                    arg_count = stats.args.len(),
                    error = %error,
                    time_taken = ?stats.time_taken,
                    caller = %caller,
                )
            }
        }
    }
}
