//! Error types for Bileto
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! is [`BiletoError`]. Library errors from the storage, serialization and
//! templating layers are wrapped transparently so that `?` works across
//! module boundaries.

use thiserror::Error;

/// Convenient result alias used throughout the crate
pub type Result<T> = std::result::Result<T, BiletoError>;

/// Main error type for Bileto operations
#[derive(Error, Debug)]
pub enum BiletoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Prompt error: {0}")]
    Dialog(#[from] dialoguer::Error),

    #[error("Project not initialized. Run 'bileto init' first")]
    ProjectNotInitialized,

    #[error("Project already initialized at {path}")]
    ProjectAlreadyInitialized { path: String },

    #[error("Ticket not found: {id}")]
    TicketNotFound { id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("No session user. Pass --as <email> or set session.user in the configuration")]
    NoSession,

    #[error("Permission denied: {permission} is required")]
    PermissionDenied { permission: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid search query at position {position}: {message}")]
    Query { position: usize, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("{0}")]
    Custom(String),
}

impl BiletoError {
    /// Build a free-form error
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Build a "not found" error for an entity kind
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Build a permission error
    pub fn denied(permission: impl Into<String>) -> Self {
        Self::PermissionDenied {
            permission: permission.into(),
        }
    }

    /// Build a query syntax error
    pub fn query(position: usize, message: impl Into<String>) -> Self {
        Self::Query {
            position,
            message: message.into(),
        }
    }

    /// Whether the error means the requested record does not exist
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::TicketNotFound { .. })
    }

    /// A hint displayed under the error message, when one helps
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ProjectNotInitialized => Some("Run 'bileto init --admin-email <email>' to create a project"),
            Self::NoSession => Some("Example: bileto --as alix@example.com ticket list"),
            Self::PermissionDenied { .. } => {
                Some("Ask an administrator to grant you a role with this permission")
            },
            Self::Query { .. } => Some(
                "Queries look like: status:open assignee:@me \"printer\" OR (org:Acme -label:spam)",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = BiletoError::not_found("Organization", "Acme");
        assert_eq!(err.to_string(), "Organization not found: Acme");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_query_error_display() {
        let err = BiletoError::query(7, "unknown qualifier 'foo'");
        assert_eq!(
            err.to_string(),
            "Invalid search query at position 7: unknown qualifier 'foo'"
        );
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BiletoError = io.into();
        assert!(matches!(err, BiletoError::Io(_)));
        assert!(!err.is_not_found());
    }
}
