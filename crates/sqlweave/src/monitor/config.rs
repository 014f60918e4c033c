/// Configuration for [`TextLogger`](super::TextLogger).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Dispatch logging without blocking the caller.
    pub log_asynchronously: bool,
    pub show_time_taken: bool,
    /// Show the file and line that ran the statement.
    pub show_caller: bool,
    /// Number of fetched rows to show; 0 shows none.
    pub show_results: usize,
    /// Plain text output without ANSI colors.
    pub no_color: bool,
    /// Also show the query before interpolation, with its raw arguments.
    pub interpolate_verbose: bool,
    /// Show only the placeholders, never the argument values.
    pub hide_args: bool,
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default configuration: time taken and caller.
    pub fn standard() -> Self {
        Self::new().show_time_taken(true).show_caller(true)
    }

    /// [`standard`](Self::standard) plus bind values and five result rows.
    pub fn verbose() -> Self {
        Self::standard().show_results(5).interpolate_verbose(true)
    }

    /// Apply the `NO_COLOR` environment variable.
    pub fn from_env(mut self) -> Self {
        if no_color_from_env() {
            self.no_color = true;
        }
        self
    }

    pub fn log_asynchronously(mut self, enabled: bool) -> Self {
        self.log_asynchronously = enabled;
        self
    }

    pub fn show_time_taken(mut self, enabled: bool) -> Self {
        self.show_time_taken = enabled;
        self
    }

    pub fn show_caller(mut self, enabled: bool) -> Self {
        self.show_caller = enabled;
        self
    }

    pub fn show_results(mut self, rows: usize) -> Self {
        self.show_results = rows;
        self
    }

    pub fn no_color(mut self, enabled: bool) -> Self {
        self.no_color = enabled;
        self
    }

    pub fn interpolate_verbose(mut self, enabled: bool) -> Self {
        self.interpolate_verbose = enabled;
        self
    }

    pub fn hide_args(mut self, enabled: bool) -> Self {
        self.hide_args = enabled;
        self
    }
}

/// `NO_COLOR` set to a true value (`1`, `t`, `true`, ...).
fn no_color_from_env() -> bool {
    std::env::var("NO_COLOR").is_ok_and(|v| parse_bool(&v))
}

fn parse_bool(s: &str) -> bool {
    matches!(s, "1" | "t" | "T" | "TRUE" | "true" | "True")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let standard = LoggerConfig::standard();
        assert!(standard.show_time_taken && standard.show_caller);
        assert_eq!(standard.show_results, 0);

        let verbose = LoggerConfig::verbose();
        assert_eq!(verbose.show_results, 5);
        assert!(verbose.interpolate_verbose);
    }

    #[test]
    fn no_color_accepts_true_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool("True"));
        assert!(!parse_bool("yes"));
        assert!(!parse_bool(""));
    }
}
