//! Execution helpers: render a statement, run it through a [`Database`] and
//! map the rows.
//!
//! Every helper records a [`QueryStats`] and hands it to the database's
//! logger, if it has one. The caller location is captured with
//! `#[track_caller]`, so call the helpers directly rather than through a
//! wrapper closure.

use crate::client::{Database, ExecResult, RowStream};
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::monitor::{LogSettings, QueryLogger, QueryStats, dispatch};
use crate::query::{Query, RawQuery};
use crate::render::Rendered;
use crate::row::{Row, Scanner, StaticColumns};
use crate::value::{Value, WireValue};
use futures_core::Stream;
use std::future::Future;
use std::panic::Location;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

/// Collects the stats of one statement and logs them when finished.
struct Recorder {
    logger: Arc<dyn QueryLogger>,
    settings: LogSettings,
    stats: QueryStats,
    started: Instant,
}

impl Recorder {
    fn start(db: &impl Database, stmt: &Rendered, caller: &'static Location<'static>) -> Option<Self> {
        let logger = db.logger()?;
        let settings = logger.log_settings();
        let mut stats = QueryStats::new(
            stmt.dialect,
            stmt.sql.clone(),
            stmt.args.clone(),
            stmt.params.clone(),
        );
        if settings.include_caller {
            stats.caller_file = caller.file().to_string();
            stats.caller_line = caller.line();
        }
        Some(Self {
            logger,
            settings,
            stats,
            started: Instant::now(),
        })
    }

    fn preview(&mut self, index: usize, values: &[WireValue]) {
        if index < self.settings.include_results {
            let row: Vec<String> = values.iter().map(|v| format!("{v:?}")).collect();
            self.stats.results.push('\n');
            self.stats.results.push_str(&row.join(" | "));
        }
    }

    fn finish(mut self, error: Option<&SqlError>) {
        if self.settings.include_time {
            self.stats.time_taken = self.started.elapsed();
        }
        self.stats.error = error.map(ToString::to_string);
        dispatch(self.logger, self.settings.log_asynchronously, self.stats);
    }
}

/// Turns fetched records into rows for the mapper.
struct RowFactory {
    dialect: Dialect,
    scanner: Option<Scanner>,
    columns: Arc<StaticColumns>,
}

impl RowFactory {
    fn row(&self, values: Vec<WireValue>) -> SqlResult<Row> {
        match &self.scanner {
            Some(scanner) => scanner.row(values),
            None => Row::new_static(self.dialect, Arc::clone(&self.columns), values),
        }
    }
}

/// Dry-run the mapper, install its fields on the statement and render it.
///
/// Statements that refuse the fields, and mappers that read nothing, get
/// static rows.
fn prepare<Q, T, F>(query: Q, mapper: &mut F) -> SqlResult<(Rendered, Option<Scanner>)>
where
    Q: Query,
    F: FnMut(&mut Row) -> SqlResult<T>,
{
    let dialect = query.dialect();
    let mut plan_row = Row::plan(dialect);
    mapper(&mut plan_row)?;
    let plan = plan_row.into_plan();
    if plan.is_empty() {
        return Ok((query.build()?, None));
    }
    let (query, accepted) = query.set_fetchable_fields(plan.fields().to_vec());
    let stmt = query.build()?;
    let scanner = accepted.then(|| plan.into_scanner(dialect));
    Ok((stmt, scanner))
}

async fn next_record(rows: &mut RowStream) -> Option<SqlResult<Vec<WireValue>>> {
    std::future::poll_fn(|cx| rows.as_mut().poll_next(cx)).await
}

/// Run the query and map up to `limit` rows.
async fn fetch_rows<D, T, F>(
    db: &D,
    stmt: &Rendered,
    scanner: Option<Scanner>,
    mapper: &mut F,
    limit: Option<usize>,
    recorder: &mut Option<Recorder>,
) -> SqlResult<Vec<T>>
where
    D: Database,
    F: FnMut(&mut Row) -> SqlResult<T>,
{
    let cursor = db.query(stmt).await?;
    let factory = RowFactory {
        dialect: stmt.dialect,
        scanner,
        columns: StaticColumns::new(cursor.columns),
    };
    let mut rows = cursor.rows;
    let mut out = Vec::new();
    let mut count: usize = 0;
    while limit.is_none_or(|limit| out.len() < limit) {
        let Some(values) = next_record(&mut rows).await else {
            break;
        };
        let values = values?;
        if let Some(rec) = recorder.as_mut() {
            rec.preview(count, &values);
        }
        count += 1;
        let mut row = factory.row(values)?;
        out.push(mapper(&mut row)?);
    }
    if let Some(rec) = recorder.as_mut() {
        rec.stats.row_count = Some(count as i64);
    }
    Ok(out)
}

fn finish<T>(recorder: Option<Recorder>, result: &SqlResult<T>) {
    if let Some(rec) = recorder {
        rec.finish(result.as_ref().err());
    }
}

/// Run a statement that returns no rows.
#[track_caller]
pub fn exec<D, Q>(db: &D, query: Q) -> impl Future<Output = SqlResult<ExecResult>> + Send
where
    D: Database,
    Q: Query,
{
    let caller = Location::caller();
    async move {
        let stmt = query.build()?;
        let mut recorder = Recorder::start(db, &stmt, caller);
        let result = db.execute(&stmt).await;
        if let (Some(rec), Ok(res)) = (recorder.as_mut(), &result) {
            rec.stats.rows_affected = Some(res.rows_affected as i64);
            rec.stats.last_insert_id = res.last_insert_id;
        }
        finish(recorder, &result);
        result
    }
}

/// Fetch the first row. Zero rows is [`SqlError::NotFound`].
#[track_caller]
pub fn fetch_one<D, Q, T, F>(db: &D, query: Q, mut mapper: F) -> impl Future<Output = SqlResult<T>> + Send
where
    D: Database,
    Q: Query,
    T: Send,
    F: FnMut(&mut Row) -> SqlResult<T> + Send,
{
    let caller = Location::caller();
    async move {
        let (stmt, scanner) = prepare(query, &mut mapper)?;
        let mut recorder = Recorder::start(db, &stmt, caller);
        let result = fetch_rows(db, &stmt, scanner, &mut mapper, Some(1), &mut recorder)
            .await
            .and_then(|rows| {
                rows.into_iter()
                    .next()
                    .ok_or_else(|| SqlError::not_found("query returned no rows"))
            });
        finish(recorder, &result);
        result
    }
}

/// Fetch every row.
#[track_caller]
pub fn fetch_all<D, Q, T, F>(db: &D, query: Q, mut mapper: F) -> impl Future<Output = SqlResult<Vec<T>>> + Send
where
    D: Database,
    Q: Query,
    T: Send,
    F: FnMut(&mut Row) -> SqlResult<T> + Send,
{
    let caller = Location::caller();
    async move {
        let (stmt, scanner) = prepare(query, &mut mapper)?;
        let mut recorder = Recorder::start(db, &stmt, caller);
        let result = fetch_rows(db, &stmt, scanner, &mut mapper, None, &mut recorder).await;
        finish(recorder, &result);
        result
    }
}

/// Whether the query returns any row.
///
/// Renders `SELECT EXISTS (...)`, or `SELECT CASE WHEN EXISTS (...) THEN 1
/// ELSE 0 END` on SQL Server.
#[track_caller]
pub fn fetch_exists<D, Q>(db: &D, query: Q) -> impl Future<Output = SqlResult<bool>> + Send
where
    D: Database,
    Q: Query + 'static,
{
    let caller = Location::caller();
    async move {
        let dialect = query.dialect();
        let format = if dialect == Dialect::SqlServer {
            "SELECT CASE WHEN EXISTS ({}) THEN 1 ELSE 0 END"
        } else {
            "SELECT EXISTS ({})"
        };
        let stmt = RawQuery::new(dialect, format, [Value::sql(query)]).build()?;
        let mut recorder = Recorder::start(db, &stmt, caller);
        let mut exists = |row: &mut Row| -> SqlResult<bool> {
            let Some(column) = row.columns().first().map(|c| c.to_string()) else {
                return Err(SqlError::execution("EXISTS query returned no columns"));
            };
            row.bool(column.as_str())
        };
        let result = fetch_rows(db, &stmt, None, &mut exists, Some(1), &mut recorder)
            .await
            .map(|rows| rows.first().copied().unwrap_or(false));
        if let (Some(rec), Ok(exists)) = (recorder.as_mut(), &result) {
            rec.stats.row_count = None;
            rec.stats.exists = Some(*exists);
        }
        finish(recorder, &result);
        result
    }
}

/// Stream mapped rows as they arrive.
#[track_caller]
pub fn fetch_cursor<D, Q, T, F>(db: &D, query: Q, mut mapper: F) -> impl Future<Output = SqlResult<FetchStream<T>>> + Send
where
    D: Database,
    Q: Query,
    T: 'static,
    F: FnMut(&mut Row) -> SqlResult<T> + Send + 'static,
{
    let caller = Location::caller();
    async move {
        let (stmt, scanner) = prepare(query, &mut mapper)?;
        let mut recorder = Recorder::start(db, &stmt, caller);
        let cursor = match db.query(&stmt).await {
            Ok(cursor) => cursor,
            Err(e) => {
                if let Some(rec) = recorder.take() {
                    rec.finish(Some(&e));
                }
                return Err(e);
            }
        };
        Ok(FetchStream {
            rows: cursor.rows,
            factory: RowFactory {
                dialect: stmt.dialect,
                scanner,
                columns: StaticColumns::new(cursor.columns),
            },
            mapper: Box::new(mapper),
            recorder,
            row_count: 0,
            done: false,
        })
    }
}

/// Rows of [`fetch_cursor`], mapped one at a time.
///
/// The statement is logged when the stream ends, fails, or is dropped.
pub struct FetchStream<T> {
    rows: RowStream,
    factory: RowFactory,
    mapper: Box<dyn FnMut(&mut Row) -> SqlResult<T> + Send>,
    recorder: Option<Recorder>,
    row_count: usize,
    done: bool,
}

impl<T> FetchStream<T> {
    /// Rows yielded so far.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    fn close(&mut self, error: Option<&SqlError>) {
        self.done = true;
        if let Some(mut rec) = self.recorder.take() {
            rec.stats.row_count = Some(self.row_count as i64);
            rec.finish(error);
        }
    }

    fn map(&mut self, values: Vec<WireValue>) -> SqlResult<T> {
        if let Some(rec) = self.recorder.as_mut() {
            rec.preview(self.row_count, &values);
        }
        self.row_count += 1;
        let mut row = self.factory.row(values)?;
        (self.mapper)(&mut row)
    }
}

impl<T> Stream for FetchStream<T> {
    type Item = SqlResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.rows.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.close(None);
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.close(Some(&e));
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Some(Ok(values))) => {
                let mapped = this.map(values);
                if let Err(e) = &mapped {
                    this.close(Some(e));
                }
                Poll::Ready(Some(mapped))
            }
        }
    }
}

impl<T> Drop for FetchStream<T> {
    fn drop(&mut self) {
        if !self.done {
            self.close(None);
        }
    }
}
