//! Raw statements written in the placeholder language.

use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::field::Field;
use crate::query::Query;
use crate::render::{Output, SqlWriter};
use crate::value::Value;

/// A verbatim statement. Row mappers read it through static rows since the
/// selected columns are unknown until the driver reports them.
#[derive(Debug, Clone)]
pub struct RawQuery {
    dialect: Dialect,
    format: String,
    values: Vec<Value>,
}

impl RawQuery {
    pub fn new<I, V>(dialect: Dialect, format: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            dialect,
            format: format.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

impl SqlWriter for RawQuery {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        out.writef(&self.format, &self.values)
    }
}

impl Query for RawQuery {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn set_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    fn fetchable_fields(&self) -> &[Field] {
        &[]
    }

    fn set_fetchable_fields(self, _fields: Vec<Field>) -> (Self, bool) {
        (self, false)
    }
}

impl From<RawQuery> for Value {
    fn from(q: RawQuery) -> Self {
        Value::sql(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{WireValue, param};

    #[test]
    fn renders_named_params_per_dialect() {
        let q = Dialect::Postgres.queryf(
            "SELECT * FROM film WHERE rating = {r} OR {r} IS NULL LIMIT {}",
            [Value::from(10), Value::from(param("r", "PG"))],
        );
        let r = q.build().unwrap();
        assert_eq!(r.sql, "SELECT * FROM film WHERE rating = $1 OR $1 IS NULL LIMIT $2");
        assert_eq!(r.args, vec![WireValue::Text("PG".into()), WireValue::Int(10)]);

        let r = q.set_dialect(Dialect::MySql).build().unwrap();
        assert_eq!(r.sql, "SELECT * FROM film WHERE rating = ? OR ? IS NULL LIMIT ?");
        assert_eq!(r.args.len(), 3);
    }

    #[test]
    fn never_accepts_fetchable_fields() {
        let q = Dialect::Sqlite.queryf("SELECT 1", Vec::<Value>::new());
        let (q, ok) = q.set_fetchable_fields(vec![Field::from(crate::field::expr("1"))]);
        assert!(!ok);
        assert!(q.fetchable_fields().is_empty());
    }
}
