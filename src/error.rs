//! Error types for malsearch.
//!
//! Error codes are organized by category:
//!
//! - **MWS-E100 to MWS-E199**: Query compilation errors (client errors)
//! - **MWS-E900 to MWS-E999**: Storage and serialization errors
//!
//! Every query error is raised while compiling, before anything is executed.
//! `ObjectNotFound` is deliberately worded the same whether the entity is
//! missing or hidden from the requesting principal.

use thiserror::Error;

/// Main error type for search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Query text is not valid Lucene syntax.
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        /// Character offset of the offending token, when known.
        offset: Option<usize>,
    },

    /// Syntactically valid construct the target field does not support.
    #[error("Unsupported grammar: {message}")]
    UnsupportedGrammar { message: String },

    /// Field path cannot be resolved, or has subfields it cannot accept.
    #[error("Field not queryable: {message}")]
    FieldNotQueryable { message: String },

    /// Query binds two different concrete object types.
    #[error("Multiple object types in query: {message}")]
    MultipleObjectsQuery { message: String },

    /// Referenced group, user, attribute or object does not exist or is not
    /// visible to the caller.
    #[error("{message}")]
    ObjectNotFound { message: String },

    /// SQLite error occurred.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON (de)serialization error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        SearchError::UnsupportedGrammar {
            message: message.into(),
        }
    }

    pub(crate) fn not_queryable(message: impl Into<String>) -> Self {
        SearchError::FieldNotQueryable {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        SearchError::ObjectNotFound {
            message: message.into(),
        }
    }

    /// Returns the error code for this error.
    pub const fn error_code(&self) -> &'static str {
        match self {
            SearchError::Parse { .. } => "MWS-E101",
            SearchError::UnsupportedGrammar { .. } => "MWS-E102",
            SearchError::FieldNotQueryable { .. } => "MWS-E103",
            SearchError::MultipleObjectsQuery { .. } => "MWS-E104",
            SearchError::ObjectNotFound { .. } => "MWS-E105",
            SearchError::Sqlite(_) => "MWS-E901",
            SearchError::Json(_) => "MWS-E902",
            SearchError::Io(_) => "MWS-E903",
        }
    }

    /// Returns the severity level for this error.
    pub const fn severity(&self) -> &'static str {
        if self.is_client_error() {
            "warning"
        } else {
            "error"
        }
    }

    /// True for errors caused by the query itself (a "bad request").
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            SearchError::Parse { .. }
                | SearchError::UnsupportedGrammar { .. }
                | SearchError::FieldNotQueryable { .. }
                | SearchError::MultipleObjectsQuery { .. }
                | SearchError::ObjectNotFound { .. }
        )
    }

    /// Character offset into the query text, for parse errors.
    pub const fn offset(&self) -> Option<usize> {
        match self {
            SearchError::Parse { offset, .. } => *offset,
            _ => None,
        }
    }

    /// Returns remediation hints for this error, if available.
    pub const fn remediation(&self) -> Option<&'static str> {
        match self {
            SearchError::Parse { .. } => {
                Some("Check quoting, parentheses and range brackets in the query.")
            }
            SearchError::UnsupportedGrammar { .. } => {
                Some("Ranges and wildcards are only allowed on fields that support them.")
            }
            SearchError::FieldNotQueryable { .. } => {
                Some("Prefix every term with a known field, e.g. file.name:foo or tag:bar.")
            }
            SearchError::MultipleObjectsQuery { .. } => {
                Some("Search one object type at a time (file, static, blob or object).")
            }
            SearchError::ObjectNotFound { .. } => None,
            SearchError::Sqlite(_) => {
                Some("The database may be locked or missing its schema. Try init-db.")
            }
            SearchError::Json(_) => Some("A stored JSON document could not be decoded."),
            SearchError::Io(_) => Some("Check file permissions and disk space."),
        }
    }
}
