use super::*;
use crate::dialect::Dialect;
use crate::value::WireValue;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Shared helpers ──

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn contents(&self) -> String {
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

fn plain(config: LoggerConfig) -> TextLogger {
    TextLogger::new(std::io::sink(), config.no_color(true)).without_timestamps()
}

fn select_stats() -> QueryStats {
    let mut stats = QueryStats::new(
        Dialect::Postgres,
        "SELECT title FROM film WHERE film_id = $1 AND rating = $2".to_string(),
        vec![WireValue::Int(7), WireValue::Text("PG".to_string())],
        BTreeMap::new(),
    );
    stats.row_count = Some(1);
    stats.time_taken = Duration::from_millis(3);
    stats.caller_file = "src/film.rs".to_string();
    stats.caller_line = 42;
    stats
}

#[test]
fn test_query_type_detection() {
    assert_eq!(QueryType::from_sql("SELECT * FROM film"), QueryType::Select);
    assert_eq!(QueryType::from_sql("  select * FROM film"), QueryType::Select);
    assert_eq!(QueryType::from_sql("(SELECT 1) UNION (SELECT 2)"), QueryType::Select);
    assert_eq!(
        QueryType::from_sql("WITH cte AS (SELECT 1) SELECT * FROM cte"),
        QueryType::Select
    );
    assert_eq!(
        QueryType::from_sql("WITH cte (n) AS (SELECT ')') UPDATE film SET n = 1"),
        QueryType::Update
    );
    assert_eq!(
        QueryType::from_sql("INSERT INTO film (title) VALUES ($1)"),
        QueryType::Insert
    );
    assert_eq!(QueryType::from_sql("DELETE FROM film"), QueryType::Delete);
    assert_eq!(QueryType::from_sql("CREATE TABLE film (id INT)"), QueryType::Other);
}

#[test]
fn test_truncate_sql_bytes() {
    assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
    assert_eq!(truncate_sql_bytes("SELECT * FROM film", 8), "SELECT *");
    // never splits a character
    assert_eq!(truncate_sql_bytes("héllo", 2), "h");
}

#[test]
fn test_ok_line_interpolates_args() {
    let logger = plain(LoggerConfig::standard());
    assert_eq!(
        logger.format(&select_stats()),
        "[OK] SELECT title FROM film WHERE film_id = 7 AND rating = 'PG'; \
         timeTaken=3ms rowCount=1 caller=src/film.rs:42"
    );
}

#[test]
fn test_failed_line_shows_raw_args_and_error() {
    let logger = plain(LoggerConfig::new());
    let mut stats = select_stats();
    stats.row_count = None;
    stats.error = Some("relation \"film\" does not exist".to_string());
    assert_eq!(
        logger.format(&stats),
        "[FAIL] SELECT title FROM film WHERE film_id = $1 AND rating = $2; \
         [Int(7), Text(\"PG\")] err={relation \"film\" does not exist}"
    );
}

#[test]
fn test_interpolation_failure_keeps_partial_text() {
    let logger = plain(LoggerConfig::new());
    let mut stats = select_stats();
    stats.query = "SELECT title FROM film WHERE film_id = $1 AND rating = $3".to_string();
    assert_eq!(
        logger.format(&stats),
        "[OK] SELECT title FROM film WHERE film_id = 7 AND rating =  \
         Render error: args index 3 out of bounds; rowCount=1"
    );
}

#[test]
fn test_multiline_errors_are_omitted() {
    let logger = plain(LoggerConfig::new().hide_args(true));
    let mut stats = select_stats();
    stats.row_count = None;
    stats.error = Some("syntax error\nLINE 1".to_string());
    assert_eq!(
        logger.format(&stats),
        "[FAIL] SELECT title FROM film WHERE film_id = $1 AND rating = $2;"
    );
}

#[test]
fn test_hide_args_keeps_placeholders() {
    let logger = plain(LoggerConfig::new().hide_args(true));
    let line = logger.format(&select_stats());
    assert!(line.starts_with("[OK] SELECT title FROM film WHERE film_id = $1 AND rating = $2;"));
    assert!(!line.contains("'PG'"));
}

#[test]
fn test_exec_counters() {
    let logger = plain(LoggerConfig::new());
    let mut stats = QueryStats::new(
        Dialect::Sqlite,
        "INSERT INTO actor (name) VALUES ('bob')".to_string(),
        Vec::new(),
        BTreeMap::new(),
    );
    stats.rows_affected = Some(1);
    stats.last_insert_id = Some(201);
    assert_eq!(
        logger.format(&stats),
        "[OK] INSERT INTO actor (name) VALUES ('bob'); rowsAffected=1 lastInsertId=201"
    );

    stats.rows_affected = None;
    stats.last_insert_id = None;
    stats.exists = Some(true);
    assert!(logger.format(&stats).ends_with(" exists=true"));
}

#[test]
fn test_verbose_sections_and_results_footer() {
    let logger = plain(LoggerConfig::new().interpolate_verbose(true).show_results(1));
    let mut stats = select_stats();
    stats.row_count = Some(3);
    stats.results = "\nInt(7) | Text(\"ACADEMY DINOSAUR\")".to_string();
    let text = logger.format(&stats);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "[OK] rowCount=3",
            "----[ Executing query ]----",
            "SELECT title FROM film WHERE film_id = $1 AND rating = $2; [Int(7), Text(\"PG\")]",
            "----[ with bind values ]----",
            "SELECT title FROM film WHERE film_id = 7 AND rating = 'PG';",
            "----[ Fetched result ]----",
            "Int(7) | Text(\"ACADEMY DINOSAUR\")",
            "...",
            "(Fetched 3 rows)",
        ]
    );
}

#[test]
fn test_failed_statements_show_no_results() {
    let logger = plain(LoggerConfig::new().show_results(5));
    let mut stats = select_stats();
    stats.error = Some("timeout".to_string());
    assert!(!logger.format(&stats).contains("Fetched result"));
}

#[test]
fn test_colors_wrap_labels() {
    colored::control::set_override(true);
    let logger = TextLogger::new(std::io::sink(), LoggerConfig::new()).without_timestamps();
    let line = logger.format(&select_stats());
    colored::control::unset_override();
    assert!(line.starts_with("\u{1b}["));
    assert!(line.contains("[OK]"));
}

#[test]
fn test_log_query_writes_one_line() {
    let capture = Capture::default();
    let logger = TextLogger::new(capture.clone(), LoggerConfig::new().no_color(true));
    logger.log_query(&select_stats());
    let out = capture.contents();
    assert!(out.ends_with("rating = 'PG';\n"), "{out}");
    // timestamp prefix: "YYYY/MM/DD HH:MM:SS "
    assert_eq!(&out[4..5], "/");
    assert_eq!(&out[19..24], " [OK]");
}

#[test]
fn test_settings_follow_config() {
    let logger = plain(LoggerConfig::verbose().log_asynchronously(true));
    assert_eq!(
        logger.log_settings(),
        LogSettings {
            log_asynchronously: true,
            include_time: true,
            include_caller: true,
            include_results: 5,
        }
    );
    assert_eq!(TracingLogger::new().log_settings().include_results, 0);
}

#[test]
fn test_tracing_logger_truncation() {
    let logger = TracingLogger::new().max_sql_length(10);
    assert_eq!(logger.truncate_sql("SELECT * FROM film"), "SELECT * F...");
    assert_eq!(logger.truncate_sql("SELECT 1"), "SELECT 1");
    assert_eq!(logger.no_truncate().truncate_sql("SELECT * FROM film"), "SELECT * FROM film");
}

#[test]
fn test_dispatch_inline_without_runtime() {
    let capture = Capture::default();
    let logger: Arc<dyn QueryLogger> = Arc::new(
        TextLogger::new(capture.clone(), LoggerConfig::new().no_color(true)).without_timestamps(),
    );
    dispatch(logger, true, select_stats());
    assert!(capture.contents().starts_with("[OK] SELECT title"));
}

#[tokio::test]
async fn test_dispatch_spawns_on_runtime() {
    let capture = Capture::default();
    let logger: Arc<dyn QueryLogger> = Arc::new(
        TextLogger::new(capture.clone(), LoggerConfig::new().no_color(true)).without_timestamps(),
    );
    dispatch(logger, true, select_stats());
    for _ in 0..100 {
        if !capture.contents().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(capture.contents().starts_with("[OK] SELECT title"));
}
