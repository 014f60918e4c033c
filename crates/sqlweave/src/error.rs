//! Error types for sqlweave

use crate::dialect::Dialect;
use thiserror::Error;

/// Result type alias for sqlweave operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Error types for building, rendering and decoding statements
#[derive(Debug, Error)]
pub enum SqlError {
    /// Structurally impossible statement (missing table, nothing to set)
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    /// Valid composition that the active dialect cannot express
    #[error("{clause} is not supported by {dialect}")]
    UnsupportedByDialect { dialect: Dialect, clause: String },

    /// Failure while rendering a node or substituting placeholders
    #[error("Render error: {0}")]
    Render(String),

    /// Fetched value cannot be converted to the requested type
    #[error("Coercion error on column '{column}': {message}")]
    Coercion { column: String, message: String },

    /// Row or column accessor used in the wrong mode
    #[error("Mode error: {0}")]
    Mode(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failure reported by the execution collaborator
    #[error("Execution error: {0}")]
    Execution(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SqlError {
    /// Create an invalid statement error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidStatement(message.into())
    }

    /// Create an unsupported-by-dialect error for a clause
    pub fn unsupported(dialect: Dialect, clause: impl Into<String>) -> Self {
        Self::UnsupportedByDialect {
            dialect,
            clause: clause.into(),
        }
    }

    /// Create a render error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    /// Create a coercion error for a specific column
    pub fn coercion(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Coercion {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a mode error
    pub fn mode(message: impl Into<String>) -> Self {
        Self::Mode(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Prefix the message with the statement being built, keeping the variant.
    pub(crate) fn in_statement(self, statement: &str) -> Self {
        match self {
            Self::Render(msg) => Self::Render(format!("{statement}: {msg}")),
            Self::InvalidStatement(msg) => Self::InvalidStatement(format!("{statement}: {msg}")),
            Self::Serialization(msg) => Self::Serialization(format!("{statement}: {msg}")),
            Self::Other(msg) => Self::Other(format!("{statement}: {msg}")),
            other => other,
        }
    }

    /// Check if this is an invalid statement error
    pub fn is_invalid_statement(&self) -> bool {
        matches!(self, Self::InvalidStatement(_))
    }

    /// Check if this is an unsupported-by-dialect error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedByDialect { .. })
    }

    /// Check if this is a render error
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }

    /// Check if this is a coercion error
    pub fn is_coercion(&self) -> bool {
        matches!(self, Self::Coercion { .. })
    }

    /// Check if this is a mode error
    pub fn is_mode(&self) -> bool {
        matches!(self, Self::Mode(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Builder, renderer and coercion failures are deterministic, so only
    /// collaborator-side execution failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}

impl From<serde_json::Error> for SqlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_context_keeps_variant() {
        let err = SqlError::render("no '}' found").in_statement("UPDATE");
        assert!(err.is_render());
        assert_eq!(err.to_string(), "Render error: UPDATE: no '}' found");

        let err = SqlError::unsupported(Dialect::MySql, "RETURNING").in_statement("UPDATE");
        assert_eq!(err.to_string(), "RETURNING is not supported by mysql");
    }

    #[test]
    fn only_execution_errors_are_retryable() {
        assert!(SqlError::execution("connection reset").is_retryable());
        assert!(!SqlError::coercion("id", "bad").is_retryable());
        assert!(!SqlError::mode("static row").is_retryable());
    }
}
