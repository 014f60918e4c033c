//! Literal interpolation for logging.
//!
//! The escaping here is deliberately naive. The output is for humans reading
//! logs and must never be sent to a database.

use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::value::WireValue;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::{BTreeMap, HashMap};

/// Substitute every placeholder in `query` with the literal form of its argument.
pub fn sprintf(
    dialect: Dialect,
    query: &str,
    args: &[WireValue],
    params: &BTreeMap<String, Vec<usize>>,
) -> SqlResult<String> {
    let mut buf = String::with_capacity(query.len());
    interpolate_into(&mut buf, dialect, query, args, params)?;
    Ok(buf)
}

/// Like [`sprintf`], but keeps the text interpolated up to the failure.
pub fn sprintf_partial(
    dialect: Dialect,
    query: &str,
    args: &[WireValue],
    params: &BTreeMap<String, Vec<usize>>,
) -> (String, Option<SqlError>) {
    let mut buf = String::with_capacity(query.len());
    let error = interpolate_into(&mut buf, dialect, query, args, params).err();
    (buf, error)
}

fn interpolate_into(
    buf: &mut String,
    dialect: Dialect,
    query: &str,
    args: &[WireValue],
    params: &BTreeMap<String, Vec<usize>>,
) -> SqlResult<()> {
    if args.is_empty() {
        buf.push_str(query);
        return Ok(());
    }
    let named: HashMap<&str, usize> = params
        .iter()
        .filter_map(|(name, indices)| indices.first().map(|&i| (name.as_str(), i)))
        .collect();

    let bytes = query.as_bytes();
    let mut running = 0;
    let mut must_write_at: Option<usize> = None;
    let mut opening_quote: Option<char> = None;
    let mut param_name = String::new();

    for (i, c) in query.char_indices() {
        if must_write_at == Some(i) {
            buf.push(c);
            continue;
        }

        if let Some(open) = opening_quote {
            buf.push(c);
            let close = if open == '[' { ']' } else { open };
            if c == close {
                if bytes.get(i + 1) == Some(&(close as u8)) {
                    must_write_at = Some(i + 1);
                } else {
                    opening_quote = None;
                }
            }
            continue;
        }

        if c == '\''
            || c == '"'
            || (c == '`' && dialect == Dialect::MySql)
            || (c == '[' && dialect == Dialect::SqlServer)
        {
            opening_quote = Some(c);
            buf.push(c);
            continue;
        }

        if !param_name.is_empty() {
            if c == '_' || c.is_alphanumeric() {
                param_name.push(c);
            } else {
                buf.push_str(&lookup_param(dialect, args, &param_name, &named, running)?);
                buf.push(c);
                if param_name == "?" {
                    running += 1;
                }
                param_name.clear();
            }
            continue;
        }

        if (c == '$' && matches!(dialect, Dialect::Sqlite | Dialect::Postgres))
            || (c == ':' && dialect == Dialect::Sqlite)
            || (c == '@' && matches!(dialect, Dialect::Sqlite | Dialect::SqlServer))
        {
            param_name.push(c);
            continue;
        }

        if c == '?' && dialect != Dialect::Postgres {
            // sqlite also accepts ?NNN and ?name
            if dialect == Dialect::Sqlite {
                param_name.push(c);
                continue;
            }
            let arg = args.get(running).ok_or_else(|| {
                SqlError::render(format!(
                    "too few args provided, expected more than {}",
                    running + 1
                ))
            })?;
            buf.push_str(&sprint(dialect, arg));
            running += 1;
            continue;
        }

        buf.push(c);
    }

    if !param_name.is_empty() {
        buf.push_str(&lookup_param(dialect, args, &param_name, &named, running)?);
    }
    if opening_quote.is_some() {
        return Err(SqlError::render("unclosed string or identifier"));
    }
    Ok(())
}

fn lookup_param(
    dialect: Dialect,
    args: &[WireValue],
    param_name: &str,
    named: &HashMap<&str, usize>,
    running: usize,
) -> SqlResult<String> {
    let mut chars = param_name.chars();
    let sigil = chars.next().unwrap_or_default();
    let name = chars.as_str();
    let maybe_num = match name.strip_prefix(['p', 'P']) {
        Some(num) if sigil == '@' && dialect == Dialect::SqlServer => num,
        _ => name,
    };

    if maybe_num.is_empty() {
        if sigil != '?' {
            return Err(SqlError::render("parameter name missing"));
        }
        let arg = args.get(running).ok_or_else(|| {
            SqlError::render(format!(
                "too few args provided, expected more than {}",
                running + 1
            ))
        })?;
        return Ok(sprint(dialect, arg));
    }

    if maybe_num.bytes().all(|b| b.is_ascii_digit()) {
        let ordinal: usize = maybe_num.parse().unwrap_or(usize::MAX);
        return ordinal
            .checked_sub(1)
            .and_then(|index| args.get(index))
            .map(|arg| sprint(dialect, arg))
            .ok_or_else(|| SqlError::render(format!("args index {ordinal} out of bounds")));
    }

    if matches!(dialect, Dialect::Postgres | Dialect::MySql) {
        return Err(SqlError::render(format!(
            "{dialect} does not support {param_name} named parameter"
        )));
    }
    named
        .get(name)
        .and_then(|&index| args.get(index))
        .map(|arg| sprint(dialect, arg))
        .ok_or_else(|| SqlError::render(format!("named parameter {param_name} not provided")))
}

/// The SQL literal for a single value.
pub fn sprint(dialect: Dialect, value: &WireValue) -> String {
    match value {
        WireValue::Null => "NULL".to_string(),
        WireValue::Bool(b) => match (dialect, *b) {
            (Dialect::SqlServer, true) => "1".to_string(),
            (Dialect::SqlServer, false) => "0".to_string(),
            (_, true) => "TRUE".to_string(),
            (_, false) => "FALSE".to_string(),
        },
        WireValue::Bytes(bytes) => {
            let hex = to_hex(bytes);
            match dialect {
                Dialect::Postgres => format!("'\\x{hex}'"),
                Dialect::SqlServer => format!("0x{hex}"),
                _ => format!("x'{hex}'"),
            }
        }
        WireValue::Text(s) => sprint_string(dialect, s),
        WireValue::Time(t) => sprint_time(dialect, t),
        WireValue::Int(n) => n.to_string(),
        WireValue::Float(f) => format_float(*f),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn sprint_string(dialect: Dialect, s: &str) -> String {
    let quote = |segment: &str| format!("'{}'", segment.replace('\'', "''"));
    if !s.contains(['\r', '\n']) {
        return quote(s);
    }

    let concat = matches!(dialect, Dialect::MySql | Dialect::SqlServer);
    let sep = if concat { ", " } else { " || " };
    let chr = if dialect == Dialect::Postgres { "CHR" } else { "CHAR" };
    let mut out = String::new();
    if concat {
        out.push_str("CONCAT(");
    }
    let mut rest = s;
    while let Some(i) = rest.find(['\r', '\n']) {
        if i > 0 {
            out.push_str(&quote(&rest[..i]));
            out.push_str(sep);
        }
        let code = if rest.as_bytes()[i] == b'\r' { 13 } else { 10 };
        out.push_str(&format!("{chr}({code})"));
        rest = &rest[i + 1..];
        if !rest.is_empty() {
            out.push_str(sep);
        }
    }
    if !rest.is_empty() {
        out.push_str(&quote(rest));
    }
    if concat {
        out.push(')');
    }
    out
}

fn sprint_time(dialect: Dialect, t: &DateTime<FixedOffset>) -> String {
    if !matches!(dialect, Dialect::Postgres | Dialect::SqlServer) {
        return format!("'{}'", t.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S"));
    }
    // up to 7 fractional digits, trailing zeros dropped
    let fraction = format!("{:07}", t.timestamp_subsec_nanos() / 100);
    let fraction = fraction.trim_end_matches('0');
    let dot = if fraction.is_empty() { "" } else { "." };
    format!(
        "'{}{dot}{fraction}{}'",
        t.format("%Y-%m-%d %H:%M:%S"),
        t.format("%:z")
    )
}

/// Shortest `%g` formatting: exponent form when the decimal exponent is
/// below -4 or at least 6.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "-1.234567e6"
    let sci = format!("{f:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(m) => ("-", m),
        None => ("", mantissa),
    };

    if exp < -4 || exp >= 6 {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}e{exp_sign}{:02}", exp.abs());
    }

    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let point = exp + 1;
    let body = if point <= 0 {
        format!("0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
    } else {
        let point = point as usize;
        if digits.len() <= point {
            format!("{digits}{}", "0".repeat(point - digits.len()))
        } else {
            format!("{}.{}", &digits[..point], &digits[point..])
        }
    };
    format!("{sign}{body}")
}
