mod common;

use common::{Capture, FakeDb, text};
use futures_util::StreamExt;
use sqlweave::monitor::{LoggerConfig, TextLogger};
use sqlweave::{
    Dialect, ExecResult, Query, Row, SqlResult, Table, Value, WireValue, exec, fetch_all,
    fetch_cursor, fetch_exists, fetch_one, param,
};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
struct Film {
    id: i64,
    title: String,
}

fn film_mapper(film: &Table) -> impl FnMut(&mut Row) -> SqlResult<Film> + Send + 'static {
    let (id, title) = (film.number("film_id"), film.string("title"));
    move |row| {
        Ok(Film {
            id: row.int64(&id)?,
            title: row.string(&title)?,
        })
    }
}

fn films() -> FakeDb {
    FakeDb::with_rows(
        ["film_id", "title"],
        vec![
            vec![WireValue::Int(1), text("ACADEMY DINOSAUR")],
            vec![WireValue::Int(2), text("ACE GOLDFINGER")],
        ],
    )
}

fn capture_logger(capture: &Capture, config: LoggerConfig) -> Arc<TextLogger> {
    Arc::new(TextLogger::new(capture.clone(), config.no_color(true)).without_timestamps())
}

#[tokio::test]
async fn test_fetch_all_projects_mapper_fields() {
    let db = films();
    let film = Table::named("film");
    let rows = fetch_all(&db, Dialect::Sqlite.select_from(film.clone()), film_mapper(&film))
        .await
        .unwrap();
    assert_eq!(
        rows,
        [
            Film { id: 1, title: "ACADEMY DINOSAUR".into() },
            Film { id: 2, title: "ACE GOLDFINGER".into() },
        ]
    );
    assert_eq!(db.last_sql(), "SELECT film.film_id, film.title FROM film");
}

#[tokio::test]
async fn test_fetch_one() {
    let db = films();
    let film = Table::named("film");
    let query = Dialect::Postgres
        .select_from(film.clone())
        .where_([film.number("film_id").eq(1)])
        .limit(1);
    let first = fetch_one(&db, query, film_mapper(&film)).await.unwrap();
    assert_eq!(first.title, "ACADEMY DINOSAUR");

    let stmt = &db.statements()[0];
    assert_eq!(
        stmt.sql,
        "SELECT film.film_id, film.title FROM film WHERE film.film_id = $1 LIMIT $2"
    );
    assert_eq!(stmt.args, [WireValue::Int(1), WireValue::Int(1)]);
}

#[tokio::test]
async fn test_fetch_one_without_rows_is_not_found() {
    let db = FakeDb::with_rows(["film_id", "title"], Vec::new());
    let film = Table::named("film");
    let err = fetch_one(&db, Dialect::Sqlite.select_from(film.clone()), film_mapper(&film))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_raw_queries_map_static_rows_by_name() {
    let db = FakeDb::with_rows(
        ["title", "rating"],
        vec![vec![text("ALIEN CENTER"), text("NC-17")]],
    );
    let query = Dialect::Postgres.queryf(
        "SELECT title, rating FROM film WHERE rating = {rating}",
        [param("rating", "NC-17")],
    );
    let rows = fetch_all(&db, query, |row: &mut Row| {
        // any order, any number of times
        let rating = row.string("rating")?;
        Ok((row.string("title")?, rating, row.string("rating")?))
    })
    .await
    .unwrap();
    assert_eq!(
        rows,
        [(String::from("ALIEN CENTER"), String::from("NC-17"), String::from("NC-17"))]
    );
    assert_eq!(db.last_sql(), "SELECT title, rating FROM film WHERE rating = $1");
}

#[tokio::test]
async fn test_static_row_missing_column() {
    let db = FakeDb::with_rows(["title"], vec![vec![text("ALIEN CENTER")]]);
    let query = Dialect::Sqlite.queryf("SELECT title FROM film", Vec::<Value>::new());
    let err = fetch_all(&db, query, |row: &mut Row| row.string("rating"))
        .await
        .unwrap_err();
    assert!(err.is_coercion());
    assert!(err.to_string().contains("available columns: title"), "{err}");
}

#[tokio::test]
async fn test_malformed_values_fail_the_fetch() {
    let db = FakeDb::with_rows(["film_id", "title"], vec![vec![text("one"), text("x")]]);
    let film = Table::named("film");
    let err = fetch_all(&db, Dialect::Sqlite.select_from(film.clone()), film_mapper(&film))
        .await
        .unwrap_err();
    assert!(err.is_coercion(), "{err:?}");
}

#[tokio::test]
async fn test_fetch_exists() {
    let db = FakeDb::with_rows(["exists"], vec![vec![WireValue::Bool(true)]]);
    let film = Table::named("film");
    let query = Dialect::Postgres
        .select([film.number("film_id")])
        .from(film.clone())
        .where_([film.string("title").eq("ACE GOLDFINGER")]);
    assert!(fetch_exists(&db, query).await.unwrap());
    assert_eq!(
        db.last_sql(),
        "SELECT EXISTS (SELECT film.film_id FROM film WHERE film.title = $1)"
    );

    let db = FakeDb::with_rows(["exists"], vec![vec![WireValue::Int(0)]]);
    let query = Dialect::SqlServer.select([film.number("film_id")]).from(film.clone());
    assert!(!fetch_exists(&db, query).await.unwrap());
    assert_eq!(
        db.last_sql(),
        "SELECT CASE WHEN EXISTS (SELECT film.film_id FROM film) THEN 1 ELSE 0 END"
    );
}

#[tokio::test]
async fn test_exec_reports_driver_result() {
    let db = FakeDb {
        result: ExecResult {
            rows_affected: 3,
            last_insert_id: Some(1003),
        },
        ..FakeDb::default()
    };
    let film = Table::named("film");
    let query = Dialect::MySql
        .delete_from(film.clone())
        .where_([film.number("film_id").gt(1000)]);
    let result = exec(&db, query).await.unwrap();
    assert_eq!(result.rows_affected, 3);
    assert_eq!(result.last_insert_id, Some(1003));
    assert_eq!(db.last_sql(), "DELETE FROM film WHERE film.film_id > ?");
}

#[tokio::test]
async fn test_render_errors_never_reach_the_driver() {
    let db = FakeDb::default();
    let query = Dialect::Postgres.update(Table::named("film"));
    let err = exec(&db, query).await.unwrap_err();
    assert!(err.is_invalid_statement());
    assert!(db.statements().is_empty());
}

#[tokio::test]
async fn test_logged_exec_line() {
    let capture = Capture::default();
    let db = FakeDb {
        result: ExecResult {
            rows_affected: 1,
            last_insert_id: None,
        },
        ..FakeDb::default()
    }
    .logged_by(capture_logger(&capture, LoggerConfig::new().show_caller(true)));
    let film = Table::named("film");
    let query = Dialect::Postgres
        .update(film.clone())
        .set([film.string("title").set("ALIEN CENTER")])
        .where_([film.number("film_id").eq(7)]);
    exec(&db, query).await.unwrap();

    let line = capture.contents();
    assert!(
        line.starts_with(
            "[OK] UPDATE film SET title = 'ALIEN CENTER' WHERE film.film_id = 7; rowsAffected=1 caller="
        ),
        "{line}"
    );
    assert!(line.trim_end().contains("exec.rs:"), "{line}");
}

#[tokio::test]
async fn test_logged_failures() {
    let capture = Capture::default();
    let db = FakeDb::failing("connection refused")
        .logged_by(capture_logger(&capture, LoggerConfig::new()));
    let film = Table::named("film");
    let err = fetch_all(&db, Dialect::MySql.select_from(film.clone()).limit(10), film_mapper(&film))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(
        capture.contents(),
        "[FAIL] SELECT film.film_id, film.title FROM film LIMIT ?; [Int(10)] \
         err={Execution error: connection refused}\n"
    );
}

#[tokio::test]
async fn test_logged_results_preview() {
    let capture = Capture::default();
    let db = films().logged_by(capture_logger(&capture, LoggerConfig::new().show_results(1)));
    let film = Table::named("film");
    fetch_all(&db, Dialect::Sqlite.select_from(film.clone()), film_mapper(&film))
        .await
        .unwrap();
    assert_eq!(
        capture.contents(),
        "[OK] SELECT film.film_id, film.title FROM film; rowCount=2\n\
         ----[ Fetched result ]----\n\
         Int(1) | Text(\"ACADEMY DINOSAUR\")\n\
         ...\n\
         (Fetched 2 rows)\n"
    );
}

#[tokio::test]
async fn test_fetch_cursor_streams_and_logs_once() {
    let capture = Capture::default();
    let db = films().logged_by(capture_logger(&capture, LoggerConfig::new()));
    let film = Table::named("film");
    let mut cursor = fetch_cursor(&db, Dialect::Sqlite.select_from(film.clone()), film_mapper(&film))
        .await
        .unwrap();

    let first = cursor.next().await.unwrap().unwrap();
    assert_eq!(first.id, 1);
    assert!(capture.contents().is_empty());

    let second = cursor.next().await.unwrap().unwrap();
    assert_eq!(second.title, "ACE GOLDFINGER");
    assert!(cursor.next().await.is_none());
    assert_eq!(cursor.row_count(), 2);
    drop(cursor);

    assert_eq!(
        capture.contents(),
        "[OK] SELECT film.film_id, film.title FROM film; rowCount=2\n"
    );
}

#[tokio::test]
async fn test_dropped_cursor_still_logs() {
    let capture = Capture::default();
    let db = films().logged_by(capture_logger(&capture, LoggerConfig::new()));
    let film = Table::named("film");
    let mut cursor = fetch_cursor(&db, Dialect::Sqlite.select_from(film.clone()), film_mapper(&film))
        .await
        .unwrap();
    cursor.next().await.unwrap().unwrap();
    drop(cursor);
    assert!(capture.contents().ends_with("rowCount=1\n"), "{}", capture.contents());
}

#[test]
fn test_rendered_dialect_matches_statement() {
    let film = Table::named("film");
    let stmt = Dialect::SqlServer
        .select([film.string("title")])
        .from(film.clone())
        .build()
        .unwrap();
    assert_eq!(stmt.dialect, Dialect::SqlServer);
}
