//! Boolean expression trees for WHERE/HAVING/ON clauses, and SET assignments.
//!
//! Groups render without parentheses at the top level and with parentheses
//! when nested inside another multi-child group. Empty groups never produce
//! invalid SQL: an empty AND is `1 = 1`, an empty OR is `1 = 0`.

use crate::error::SqlResult;
use crate::field::{Expression, Field};
use crate::render::{Output, SqlWriter};
use crate::value::Value;

/// Predicate node.
#[derive(Clone, Debug)]
pub enum Predicate {
    /// AND group: all conditions must hold.
    And(Vec<Predicate>),

    /// OR group: at least one condition must hold.
    Or(Vec<Predicate>),

    /// NOT: negate the inner predicate.
    Not(Box<Predicate>),

    /// `left op right`
    Compare {
        left: Value,
        op: &'static str,
        right: Value,
    },

    /// `operand IS [NOT] NULL`
    IsNull { operand: Value, negated: bool },

    /// `operand [NOT] IN (values...)`
    In {
        operand: Value,
        values: Vec<Value>,
        negated: bool,
    },

    /// `operand [NOT] BETWEEN low AND high`
    Between {
        operand: Value,
        low: Value,
        high: Value,
        negated: bool,
    },

    /// Template rendered through the placeholder language.
    Expr(Expression),
}

/// AND all predicates together.
pub fn and<I: IntoIterator<Item = Predicate>>(predicates: I) -> Predicate {
    Predicate::And(predicates.into_iter().collect())
}

/// OR all predicates together.
pub fn or<I: IntoIterator<Item = Predicate>>(predicates: I) -> Predicate {
    Predicate::Or(predicates.into_iter().collect())
}

/// Negate a predicate.
pub fn not(predicate: Predicate) -> Predicate {
    Predicate::Not(Box::new(predicate))
}

impl Predicate {
    /// `self AND other`, flattening into an existing AND group.
    pub fn and_with(self, other: Predicate) -> Predicate {
        match self {
            Predicate::And(mut children) => {
                children.push(other);
                Predicate::And(children)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    /// `self OR other`, flattening into an existing OR group.
    pub fn or_with(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Or(mut children) => {
                children.push(other);
                Predicate::Or(children)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    /// True for AND/OR groups without any non-empty child.
    pub fn is_empty_group(&self) -> bool {
        match self {
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().all(Predicate::is_empty_group)
            }
            _ => false,
        }
    }

    pub(crate) fn write(&self, out: &mut Output, nested: bool) -> SqlResult<()> {
        match self {
            Predicate::And(children) => write_group(out, children, " AND ", "1 = 1", nested),
            Predicate::Or(children) => write_group(out, children, " OR ", "1 = 0", nested),
            Predicate::Not(inner) => {
                out.push_str("NOT (");
                inner.write(out, false)?;
                out.push(')');
                Ok(())
            }
            Predicate::Compare { left, op, right } => {
                out.write_value(left)?;
                out.push(' ');
                out.push_str(op);
                out.push(' ');
                out.write_value(right)
            }
            Predicate::IsNull { operand, negated } => {
                out.write_value(operand)?;
                out.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
                Ok(())
            }
            Predicate::In {
                operand,
                values,
                negated,
            } => {
                if values.is_empty() {
                    out.push_str(if *negated { "1 = 1" } else { "1 = 0" });
                    return Ok(());
                }
                out.write_value(operand)?;
                out.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.write_value(value)?;
                }
                out.push(')');
                Ok(())
            }
            Predicate::Between {
                operand,
                low,
                high,
                negated,
            } => {
                out.write_value(operand)?;
                out.push_str(if *negated {
                    " NOT BETWEEN "
                } else {
                    " BETWEEN "
                });
                out.write_value(low)?;
                out.push_str(" AND ");
                out.write_value(high)
            }
            Predicate::Expr(e) => e.write_sql(out),
        }
    }
}

fn write_group(
    out: &mut Output,
    children: &[Predicate],
    sep: &str,
    empty: &str,
    nested: bool,
) -> SqlResult<()> {
    let live: Vec<&Predicate> = children.iter().filter(|p| !p.is_empty_group()).collect();
    match live.as_slice() {
        [] => {
            out.push_str(empty);
            Ok(())
        }
        [only] => only.write(out, nested),
        many => {
            if nested {
                out.push('(');
            }
            for (i, child) in many.iter().enumerate() {
                if i > 0 {
                    out.push_str(sep);
                }
                child.write(out, true)?;
            }
            if nested {
                out.push(')');
            }
            Ok(())
        }
    }
}

impl SqlWriter for Predicate {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        self.write(out, false)
    }
}

impl From<Expression> for Predicate {
    fn from(e: Expression) -> Self {
        Predicate::Expr(e)
    }
}

/// A predicate in value position, e.g. the right side of a comparison.
/// Always parenthesized so its operators cannot bind to the outer one.
#[derive(Debug)]
struct Operand(Predicate);

impl SqlWriter for Operand {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        out.push('(');
        self.0.write(out, false)?;
        out.push(')');
        Ok(())
    }
}

impl From<Predicate> for Value {
    fn from(p: Predicate) -> Self {
        Value::sql(Operand(p))
    }
}

/// One `field = value` pair of an UPDATE SET list or upsert.
#[derive(Clone, Debug)]
pub enum Assignment {
    Set { field: Field, value: Value },

    /// Raw template, e.g. `exprf("count = count + {}", [1])`.
    Raw(Expression),
}

impl Assignment {
    pub fn set(field: Field, value: impl Into<Value>) -> Self {
        Assignment::Set {
            field,
            value: value.into(),
        }
    }

    /// The assigned field, if this is not a raw template.
    pub fn field(&self) -> Option<&Field> {
        match self {
            Assignment::Set { field, .. } => Some(field),
            Assignment::Raw(_) => None,
        }
    }
}

/// Column names on the left of SET are unqualified, except on MySQL where
/// multi-table UPDATE needs the qualifier.
impl SqlWriter for Assignment {
    fn write_sql(&self, out: &mut Output) -> SqlResult<()> {
        match self {
            Assignment::Set { field, value } => {
                if out.dialect() == crate::dialect::Dialect::MySql {
                    field.write_sql(out)?;
                } else {
                    field.write_unqualified(out)?;
                }
                out.push_str(" = ");
                out.write_value(value)
            }
            Assignment::Raw(e) => e.write_sql(out),
        }
    }
}

impl From<Expression> for Assignment {
    fn from(e: Expression) -> Self {
        Assignment::Raw(e)
    }
}

/// Write assignments separated by `, `.
pub(crate) fn write_assignments(out: &mut Output, assignments: &[Assignment]) -> SqlResult<()> {
    for (i, assignment) in assignments.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        assignment.write_sql(out)?;
    }
    Ok(())
}
