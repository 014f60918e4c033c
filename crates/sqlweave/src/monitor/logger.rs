use super::config::LoggerConfig;
use super::types::{LogSettings, QueryLogger, QueryStats};
use colored::{Color, Colorize};
use std::fmt::Write as _;
use std::io::Write;
use std::sync::Mutex;

/// Line-oriented logger writing one entry per statement.
///
/// ```text
/// [OK] SELECT 1; timeTaken=1.2ms caller=src/main.rs:42
/// [FAIL] SELECT x FROM t WHERE id = $1; [Int(1)] err={...} timeTaken=300µs
/// ```
pub struct TextLogger {
    writer: Mutex<Box<dyn Write + Send>>,
    config: LoggerConfig,
    timestamps: bool,
}

impl std::fmt::Debug for TextLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextLogger")
            .field("config", &self.config)
            .field("timestamps", &self.timestamps)
            .finish_non_exhaustive()
    }
}

impl TextLogger {
    /// Log to `writer`, each entry prefixed with the local time.
    pub fn new(writer: impl Write + Send + 'static, config: LoggerConfig) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            config,
            timestamps: true,
        }
    }

    pub fn stdout(config: LoggerConfig) -> Self {
        Self::new(std::io::stdout(), config)
    }

    /// Drop the time prefix.
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.config.no_color {
            text.to_string()
        } else {
            text.color(color).to_string()
        }
    }

    fn label(&self, buf: &mut String, name: &str, value: impl std::fmt::Display) {
        let _ = write!(buf, "{}={value}", self.paint(&format!(" {name}"), Color::BrightBlue));
    }

    /// Format one entry, without the time prefix.
    pub fn format(&self, stats: &QueryStats) -> String {
        let config = &self.config;
        let mut buf = String::new();

        if stats.is_ok() {
            buf.push_str(&self.paint("[OK]", Color::BrightGreen));
        } else {
            buf.push_str(&self.paint("[FAIL]", Color::BrightRed));
        }

        if config.hide_args {
            let _ = write!(buf, " {};", stats.query);
        } else if !config.interpolate_verbose {
            if stats.is_ok() {
                let (mut query, error) = stats.interpolated();
                if let Some(e) = error {
                    let _ = write!(query, " {e}");
                }
                let _ = write!(buf, " {query};");
            } else {
                let _ = write!(buf, " {};", stats.query);
                if !stats.args.is_empty() {
                    let args: Vec<String> = stats.args.iter().map(|a| format!("{a:?}")).collect();
                    let _ = write!(buf, " [{}]", args.join(", "));
                }
            }
        }

        if let Some(error) = &stats.error {
            // single-line errors only
            if !error.contains('\n') {
                let _ = write!(buf, "{}={{{error}}}", self.paint(" err", Color::BrightBlue));
            }
        }
        if config.show_time_taken {
            self.label(&mut buf, "timeTaken", format_args!("{:?}", stats.time_taken));
        }
        if let Some(n) = stats.row_count {
            self.label(&mut buf, "rowCount", n);
        }
        if let Some(n) = stats.rows_affected {
            self.label(&mut buf, "rowsAffected", n);
        }
        if let Some(id) = stats.last_insert_id {
            self.label(&mut buf, "lastInsertId", id);
        }
        if let Some(exists) = stats.exists {
            self.label(&mut buf, "exists", exists);
        }
        if config.show_caller {
            self.label(
                &mut buf,
                "caller",
                format_args!("{}:{}", stats.caller_file, stats.caller_line),
            );
        }

        if !config.hide_args && config.interpolate_verbose {
            let _ = write!(
                buf,
                "\n{}\n{}; {:?}",
                self.paint("----[ Executing query ]----", Color::BrightMagenta),
                stats.query,
                stats.args
            );
            let (mut query, error) = stats.interpolated();
            query.push(';');
            if let Some(e) = error {
                let _ = write!(query, " {e}");
            }
            let _ = write!(
                buf,
                "\n{}\n{query}",
                self.paint("----[ with bind values ]----", Color::BrightMagenta)
            );
        }

        if config.show_results > 0 && stats.is_ok() {
            let _ = write!(
                buf,
                "\n{}{}",
                self.paint("----[ Fetched result ]----", Color::BrightMagenta),
                stats.results
            );
            let row_count = stats.row_count.unwrap_or(0);
            if row_count > config.show_results as i64 {
                let _ = write!(buf, "\n...\n(Fetched {row_count} rows)");
            }
        }
        buf
    }
}

impl QueryLogger for TextLogger {
    fn log_settings(&self) -> LogSettings {
        LogSettings {
            log_asynchronously: self.config.log_asynchronously,
            include_time: self.config.show_time_taken,
            include_caller: self.config.show_caller,
            include_results: self.config.show_results,
        }
    }

    fn log_query(&self, stats: &QueryStats) {
        let mut line = String::new();
        if self.timestamps {
            let _ = write!(line, "{} ", chrono::Local::now().format("%Y/%m/%d %H:%M:%S"));
        }
        line.push_str(&self.format(stats));
        line.push('\n');
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.write_all(line.as_bytes());
            let _ = writer.flush();
        }
    }
}
