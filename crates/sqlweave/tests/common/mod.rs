#![allow(dead_code)]

use futures_util::stream;
use sqlweave::monitor::QueryLogger;
use sqlweave::{Database, ExecResult, Rendered, RowCursor, SqlError, SqlResult, WireValue};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// In-memory database returning canned rows and recording every statement.
#[derive(Default)]
pub struct FakeDb {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<WireValue>>,
    pub result: ExecResult,
    pub fail_with: Option<String>,
    pub statements: Mutex<Vec<Rendered>>,
    pub logger: Option<Arc<dyn QueryLogger>>,
}

impl FakeDb {
    pub fn with_rows<const N: usize>(columns: [&str; N], rows: Vec<Vec<WireValue>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn logged_by(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn statements(&self) -> Vec<Rendered> {
        self.statements.lock().unwrap().clone()
    }

    pub fn last_sql(&self) -> String {
        self.statements().last().map(|s| s.sql.clone()).unwrap_or_default()
    }

    fn record(&self, stmt: &Rendered) -> SqlResult<()> {
        self.statements.lock().unwrap().push(stmt.clone());
        match &self.fail_with {
            Some(message) => Err(SqlError::execution(message.clone())),
            None => Ok(()),
        }
    }
}

impl Database for FakeDb {
    async fn execute(&self, stmt: &Rendered) -> SqlResult<ExecResult> {
        self.record(stmt)?;
        Ok(self.result)
    }

    async fn query(&self, stmt: &Rendered) -> SqlResult<RowCursor> {
        self.record(stmt)?;
        let rows: Vec<SqlResult<Vec<WireValue>>> = self.rows.iter().cloned().map(Ok).collect();
        Ok(RowCursor {
            columns: self.columns.clone(),
            rows: Box::pin(stream::iter(rows)),
        })
    }

    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        self.logger.clone()
    }
}

/// Shared in-memory log sink.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn text(s: &str) -> WireValue {
    WireValue::Text(s.to_string())
}
