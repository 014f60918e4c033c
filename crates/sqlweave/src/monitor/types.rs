use crate::dialect::Dialect;
use crate::error::SqlError;
use crate::render::interpolate::sprintf_partial;
use crate::value::WireValue;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// The kind of statement that was run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    s.get(0..keyword.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
}

impl QueryType {
    /// Detect the statement kind from its SQL text. A `WITH` prefix is
    /// skipped to find the statement the CTEs belong to.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start().trim_start_matches('(');
        if starts_with_keyword(trimmed, "SELECT") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else if starts_with_keyword(trimmed, "WITH") {
            Self::after_ctes(trimmed)
        } else {
            QueryType::Other
        }
    }

    /// The statement following the last top-level parenthesized CTE body.
    fn after_ctes(sql: &str) -> Self {
        let mut depth: i32 = 0;
        let mut last_top_level = 0;
        let mut in_string = false;
        for (i, c) in sql.char_indices() {
            match c {
                '\'' => in_string = !in_string,
                '(' if !in_string => depth += 1,
                ')' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        last_top_level = i + 1;
                    }
                }
                _ => {}
            }
        }
        let remainder = sql[last_top_level..].trim_start();
        if starts_with_keyword(remainder, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(remainder, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(remainder, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Select
        }
    }
}

/// Statistics of one executed statement.
#[derive(Debug, Clone)]
pub struct QueryStats {
    pub dialect: Dialect,
    pub query: String,
    pub args: Vec<WireValue>,
    /// Bind name to argument indices.
    pub params: BTreeMap<String, Vec<usize>>,
    /// Error message, if the statement failed.
    pub error: Option<String>,
    /// Rows fetched. Not set for `exec`.
    pub row_count: Option<i64>,
    /// Rows affected. Only set for `exec`.
    pub rows_affected: Option<i64>,
    pub last_insert_id: Option<i64>,
    /// Result of `fetch_exists`.
    pub exists: Option<bool>,
    pub started_at: DateTime<Utc>,
    pub time_taken: Duration,
    pub caller_file: String,
    pub caller_line: u32,
    /// Preview of the first fetched rows, when requested by [`LogSettings`].
    pub results: String,
}

impl QueryStats {
    pub(crate) fn new(dialect: Dialect, query: String, args: Vec<WireValue>, params: BTreeMap<String, Vec<usize>>) -> Self {
        Self {
            dialect,
            query,
            args,
            params,
            error: None,
            row_count: None,
            rows_affected: None,
            last_insert_id: None,
            exists: None,
            started_at: Utc::now(),
            time_taken: Duration::ZERO,
            caller_file: String::new(),
            caller_line: 0,
            results: String::new(),
        }
    }

    pub fn query_type(&self) -> QueryType {
        QueryType::from_sql(&self.query)
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The query with its arguments interpolated, for display only. On
    /// failure the error follows whatever was interpolated before it.
    pub fn interpolated(&self) -> (String, Option<SqlError>) {
        sprintf_partial(self.dialect, &self.query, &self.args, &self.params)
    }
}

/// What a logger wants captured in [`QueryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// Dispatch logging without blocking the caller. Lines may arrive out
    /// of order.
    pub log_asynchronously: bool,
    pub include_time: bool,
    /// Capture the file and line that ran the statement.
    pub include_caller: bool,
    /// Number of fetched rows to preview; 0 disables the preview.
    pub include_results: usize,
}

/// Receives the stats of executed statements.
pub trait QueryLogger: Send + Sync {
    fn log_settings(&self) -> LogSettings;

    fn log_query(&self, stats: &QueryStats);
}
