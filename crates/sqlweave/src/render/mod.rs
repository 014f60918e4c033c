//! SQL text rendering.
//!
//! [`Output`] accumulates SQL text, bound arguments and the bind-name map
//! while nodes write themselves into it. Templates use a small placeholder
//! language understood by [`Output::writef`]:
//!
//! - `{}` consumes the next value in order
//! - `{N}` refers to the N-th value (1-based); on dialects with numbered
//!   placeholders a plain value is bound once and referenced again by number
//! - `{name}` refers to a named [`Parameter`](crate::Parameter) among the values
//! - `{{` writes a literal `{`
//!
//! The diagnostic interpolation in [`interpolate`] renders literal values into
//! SQL text for display only. Never execute its output.

pub mod interpolate;


use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::value::{Parameter, Value, WireValue};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Anything that can render itself into an [`Output`].
pub trait SqlWriter: Send + Sync + fmt::Debug {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()>;
}

/// A fully rendered statement, ready for the execution collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub dialect: Dialect,
    pub sql: String,
    pub args: Vec<WireValue>,
    /// Bind name to argument indices.
    pub params: BTreeMap<String, Vec<usize>>,
}

impl Rendered {
    /// Interpolate the arguments into the SQL text for display.
    pub fn interpolate(&self) -> SqlResult<String> {
        interpolate::sprintf(self.dialect, &self.sql, &self.args, &self.params)
    }
}

/// Render a writer into a fresh [`Rendered`] statement.
pub fn render(dialect: Dialect, writer: &dyn SqlWriter) -> SqlResult<Rendered> {
    let mut out = Output::new(dialect);
    writer.write_sql(&mut out)?;
    Ok(out.into_rendered())
}

/// Buffer that nodes render into.
#[derive(Debug)]
pub struct Output {
    dialect: Dialect,
    sql: String,
    args: Vec<WireValue>,
    params: BTreeMap<String, Vec<usize>>,
}

impl Output {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            args: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[WireValue] {
        &self.args
    }

    pub fn push_str(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    pub fn push(&mut self, c: char) {
        self.sql.push(c);
    }

    /// Write an identifier, quoting it if the dialect requires.
    pub fn write_identifier(&mut self, identifier: &str) {
        let quoted = quote_identifier(self.dialect, identifier);
        self.sql.push_str(&quoted);
    }

    pub fn into_rendered(self) -> Rendered {
        Rendered {
            dialect: self.dialect,
            sql: self.sql,
            args: self.args,
            params: self.params,
        }
    }

    fn bind(&mut self, value: WireValue) -> usize {
        self.args.push(value);
        self.args.len() - 1
    }

    fn write_placeholder(&mut self, index: usize) {
        self.dialect.write_placeholder(&mut self.sql, index + 1);
    }

    /// Render `format`, substituting `{}`, `{N}` and `{name}` with `values`.
    pub fn writef(&mut self, format: &str, values: &[Value]) -> SqlResult<()> {
        if !format.contains('{') {
            self.sql.push_str(format);
            return Ok(());
        }

        let mut named: BTreeMap<&str, &Parameter> = BTreeMap::new();
        for value in values {
            if let Value::Named(p) = value {
                if named.insert(p.name.as_str(), p).is_some() {
                    return Err(SqlError::render(format!(
                        "named parameter {{{}}} provided more than once",
                        p.name
                    )));
                }
            }
        }

        // ordinal -> bound argument index, for dialects that can refer back
        let mut ordinals: HashMap<usize, usize> = HashMap::new();
        let mut running = 0;
        let mut rest = format;
        while let Some(pos) = rest.find('{') {
            self.sql.push_str(&rest[..pos]);
            rest = &rest[pos..];
            if let Some(tail) = rest.strip_prefix("{{") {
                self.sql.push('{');
                rest = tail;
                continue;
            }
            let end = rest
                .find('}')
                .ok_or_else(|| SqlError::render("no '}' found"))?;
            let name = &rest[1..end];
            rest = &rest[end + 1..];

            if !name.chars().all(|c| c == '_' || c.is_alphanumeric()) {
                return Err(SqlError::render(format!(
                    "{name:?} is not a valid param name (only letters, digits and '_' are allowed)"
                )));
            }

            if name.is_empty() {
                let value = values.get(running).ok_or_else(|| {
                    SqlError::render(format!(
                        "too few values passed in to writef, expected more than {running}"
                    ))
                })?;
                running += 1;
                self.write_value(value)?;
                continue;
            }

            if let Ok(ordinal) = name.parse::<usize>() {
                let value = ordinal
                    .checked_sub(1)
                    .and_then(|index| values.get(index))
                    .ok_or_else(|| {
                        SqlError::render(format!(
                            "ordinal parameter {{{ordinal}}} is out of bounds"
                        ))
                    })?;
                match value {
                    Value::Named(_) | Value::Sql(_) | Value::List(_) => self.write_value(value)?,
                    _ if self.dialect.numbered_placeholders() => {
                        let index = match ordinals.get(&ordinal) {
                            Some(&index) => index,
                            None => {
                                let wire = value.to_wire(self.dialect)?;
                                let index = self.bind(wire);
                                ordinals.insert(ordinal, index);
                                index
                            }
                        };
                        self.write_placeholder(index);
                    }
                    _ => self.write_value(value)?,
                }
                continue;
            }

            let Some(p) = named.get(name) else {
                let available: Vec<&str> = named.keys().copied().collect();
                return Err(SqlError::render(format!(
                    "named parameter {{{name}}} not provided (available params: {})",
                    available.join(", ")
                )));
            };
            self.write_named(p)?;
        }
        self.sql.push_str(rest);
        Ok(())
    }

    /// Render one value: self-rendering nodes write themselves, lists expand,
    /// everything else is bound and replaced by a placeholder.
    pub fn write_value(&mut self, value: &Value) -> SqlResult<()> {
        match value {
            Value::Named(p) => self.write_named(p),
            Value::Sql(writer) => writer.write_sql(self),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.write_value(item)?;
                }
                Ok(())
            }
            other => {
                let wire = other.to_wire(self.dialect)?;
                let index = self.bind(wire);
                self.write_placeholder(index);
                Ok(())
            }
        }
    }

    fn write_named(&mut self, p: &Parameter) -> SqlResult<()> {
        if matches!(
            *p.value,
            Value::Sql(_) | Value::List(_) | Value::Named(_)
        ) {
            return self.write_value(&p.value);
        }
        let wire = p.value.to_wire(self.dialect)?;

        if let Some(indices) = self.params.get(&p.name).cloned() {
            match self.dialect {
                Dialect::Sqlite | Dialect::SqlServer => {
                    if let Some(&index) = indices.first() {
                        self.args[index] = wire;
                    }
                    self.write_bind_name(&p.name);
                    return Ok(());
                }
                Dialect::Postgres => {
                    if let Some(&index) = indices.first() {
                        self.args[index] = wire;
                        self.write_placeholder(index);
                        return Ok(());
                    }
                }
                Dialect::MySql | Dialect::Generic => {
                    for &index in &indices {
                        self.args[index] = wire.clone();
                    }
                }
            }
        }

        let index = self.bind(wire);
        match self.dialect {
            Dialect::Sqlite | Dialect::SqlServer => {
                self.params.insert(p.name.clone(), vec![index]);
                self.write_bind_name(&p.name);
            }
            Dialect::Postgres => {
                self.params.insert(p.name.clone(), vec![index]);
                self.write_placeholder(index);
            }
            Dialect::MySql | Dialect::Generic => {
                self.params.entry(p.name.clone()).or_default().push(index);
                self.sql.push('?');
            }
        }
        Ok(())
    }

    fn write_bind_name(&mut self, name: &str) {
        self.sql
            .push(if self.dialect == Dialect::SqlServer { '@' } else { '$' });
        self.sql.push_str(name);
    }
}

/// Pseudo-tables that are referenced verbatim in upserts and triggers.
const NEVER_QUOTED: [&str; 5] = ["EXCLUDED", "INSERTED", "DELETED", "NEW", "OLD"];

/// Quote `identifier` if it is empty, starts with a digit, contains anything
/// outside `[a-z0-9_]`, or is a reserved keyword of `dialect`.
pub fn quote_identifier(dialect: Dialect, identifier: &str) -> Cow<'_, str> {
    if NEVER_QUOTED.contains(&identifier) {
        return Cow::Borrowed(identifier);
    }
    let needs_quoting = identifier.is_empty()
        || identifier.starts_with(|c: char| c.is_ascii_digit())
        || !identifier
            .chars()
            .all(|c| c == '_' || c.is_ascii_digit() || c.is_ascii_lowercase())
        || dialect.is_keyword(identifier);
    if !needs_quoting {
        return Cow::Borrowed(identifier);
    }
    let (open, close) = dialect.quote_chars();
    let escaped = escape_quote(identifier, close);
    let mut quoted = String::with_capacity(escaped.len() + 2);
    quoted.push(open);
    quoted.push_str(&escaped);
    quoted.push(close);
    Cow::Owned(quoted)
}

/// Double every `quote` in `s`. A quote that is already doubled is kept as is.
pub fn escape_quote(s: &str, quote: char) -> Cow<'_, str> {
    if !s.contains(quote) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 2);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == quote {
            out.push(quote);
            if chars.peek() == Some(&quote) {
                chars.next();
            }
        }
    }
    Cow::Owned(out)
}
