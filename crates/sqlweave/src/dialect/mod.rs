//! SQL dialects and their capability table.
//!
//! Every per-dialect fact the builder and renderer consult lives here:
//! placeholder style, identifier quoting, reserved keywords and the clause
//! feature flags used during statement validation.

mod keywords;

use std::fmt;
use std::str::FromStr;

/// The SQL variant a statement is rendered for.
///
/// Unknown or empty dialect names fall back to [`Dialect::Generic`], which
/// uses `?` placeholders and double-quote identifier quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    Sqlite,
    Postgres,
    MySql,
    SqlServer,
    #[default]
    Generic,
}

impl Dialect {
    /// All named dialects, in a stable order.
    pub const ALL: [Dialect; 4] = [
        Dialect::Sqlite,
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::SqlServer,
    ];

    /// Resolve a dialect identifier (`sqlite`, `postgres`, `mysql`, `sqlserver`).
    pub fn from_name(name: &str) -> Self {
        match name {
            "sqlite" => Dialect::Sqlite,
            "postgres" => Dialect::Postgres,
            "mysql" => Dialect::MySql,
            "sqlserver" => Dialect::SqlServer,
            _ => Dialect::Generic,
        }
    }

    /// The dialect identifier.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::SqlServer => "sqlserver",
            Dialect::Generic => "generic",
        }
    }

    /// Write the positional marker for the 1-based argument `position`.
    pub(crate) fn write_placeholder(self, buf: &mut String, position: usize) {
        match self {
            Dialect::Sqlite | Dialect::Postgres => {
                buf.push('$');
                buf.push_str(&position.to_string());
            }
            Dialect::SqlServer => {
                buf.push_str("@p");
                buf.push_str(&position.to_string());
            }
            Dialect::MySql | Dialect::Generic => buf.push('?'),
        }
    }

    /// Whether `{N}` ordinals can be bound once and referenced by number.
    pub(crate) fn numbered_placeholders(self) -> bool {
        matches!(
            self,
            Dialect::Sqlite | Dialect::Postgres | Dialect::SqlServer
        )
    }

    /// Opening and closing identifier quote characters.
    pub fn quote_chars(self) -> (char, char) {
        match self {
            Dialect::MySql => ('`', '`'),
            Dialect::SqlServer => ('[', ']'),
            _ => ('"', '"'),
        }
    }

    /// Whether `word` is reserved in this dialect (case-insensitive).
    pub fn is_keyword(self, word: &str) -> bool {
        let table = match self {
            Dialect::Sqlite => keywords::SQLITE,
            Dialect::Postgres => keywords::POSTGRES,
            Dialect::MySql => keywords::MYSQL,
            Dialect::SqlServer => keywords::SQLSERVER,
            Dialect::Generic => return false,
        };
        table.binary_search(&word.to_lowercase().as_str()).is_ok()
    }

    // ==================== Capability flags ====================

    /// `RETURNING` on INSERT/UPDATE/DELETE.
    pub fn supports_returning(self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::Sqlite)
    }

    /// `FROM` on UPDATE (multi-table update via FROM rather than JOIN).
    pub fn supports_update_from(self) -> bool {
        self != Dialect::MySql
    }

    /// Joins on UPDATE need a FROM table to attach to.
    pub fn update_join_requires_from(self) -> bool {
        self != Dialect::MySql
    }

    /// `ORDER BY` and `LIMIT` on UPDATE/DELETE.
    pub fn supports_order_limit_on_mutation(self) -> bool {
        self == Dialect::MySql
    }

    /// `USING` on DELETE.
    pub fn supports_delete_using(self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::MySql)
    }

    /// `ON CONFLICT` upserts.
    pub fn supports_on_conflict(self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::Sqlite)
    }

    /// `ON DUPLICATE KEY UPDATE` upserts.
    pub fn supports_on_duplicate_key(self) -> bool {
        self == Dialect::MySql
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_fall_back_to_generic() {
        assert_eq!(Dialect::from_name(""), Dialect::Generic);
        assert_eq!(Dialect::from_name("oracle"), Dialect::Generic);
        assert_eq!("sqlserver".parse::<Dialect>(), Ok(Dialect::SqlServer));
    }

    #[test]
    fn placeholders_per_dialect() {
        let render = |d: Dialect| {
            let mut buf = String::new();
            d.write_placeholder(&mut buf, 3);
            buf
        };
        assert_eq!(render(Dialect::Sqlite), "$3");
        assert_eq!(render(Dialect::Postgres), "$3");
        assert_eq!(render(Dialect::SqlServer), "@p3");
        assert_eq!(render(Dialect::MySql), "?");
        assert_eq!(render(Dialect::Generic), "?");
    }

    #[test]
    fn keyword_tables_are_sorted() {
        for table in [
            keywords::SQLITE,
            keywords::POSTGRES,
            keywords::MYSQL,
            keywords::SQLSERVER,
        ] {
            assert!(table.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn keyword_lookup_ignores_case() {
        assert!(Dialect::Postgres.is_keyword("ORDER"));
        assert!(Dialect::SqlServer.is_keyword("within group"));
        assert!(!Dialect::MySql.is_keyword("actor_id"));
        assert!(!Dialect::Generic.is_keyword("select"));
    }
}
