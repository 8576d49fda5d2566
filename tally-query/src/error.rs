//! Error types for query and preload operations with actionable messages.
//!
//! Every error carries an [`ErrorCode`] for programmatic handling, a
//! human-readable message, and optional context (model, association, SQL,
//! suggestions).
//!
//! # Error Codes
//!
//! Error codes follow a pattern: P{category}{number}
//! - 1xxx: Query errors (unknown model, unknown or unsupported association)
//! - 3xxx: Connection errors
//! - 5xxx: Execution errors (syntax, params, driver failures)
//! - 6xxx: Data errors (result decoding)
//! - 7xxx: Configuration errors
//!
//! ```rust
//! use tally_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::unsupported_association("Comment", "post", "belongs_to");
//! assert_eq!(err.code, ErrorCode::UnsupportedAssociation);
//! assert!(err.to_string().contains("belongs_to"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Query errors (1xxx)
    /// Unknown model, association, or malformed select (P1004).
    InvalidSelect = 1004,
    /// Association kind cannot be count-preloaded (P1006).
    UnsupportedAssociation = 1006,

    // Connection errors (3xxx)
    /// Database connection failed (P3001).
    ConnectionFailed = 3001,

    // Query execution errors (5xxx)
    /// Invalid parameter (P5003).
    InvalidParameter = 5003,
    /// General database error (P5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Deserialization error (P6003).
    DeserializationError = 6003,

    // Configuration errors (7xxx)
    /// Invalid configuration (P7001).
    InvalidConfiguration = 7001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "P1006").
    pub fn code(&self) -> String {
        format!("P{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidSelect => "Invalid select or association",
            Self::UnsupportedAssociation => "Unsupported association kind",
            Self::ConnectionFailed => "Database connection failed",
            Self::InvalidParameter => "Invalid parameter",
            Self::DatabaseError => "Database error",
            Self::DeserializationError => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
        }
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The association involved.
    pub association: Option<String>,
    /// The SQL query (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during query and preload operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the association.
    pub fn with_association(mut self, association: impl Into<String>) -> Self {
        self.context.association = Some(association.into());
        self
    }

    /// Set the SQL query.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create an error for a model that is not registered in the schema.
    pub fn unknown_model(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::InvalidSelect,
            format!("Model {} is not registered in the schema", model),
        )
        .with_model(&model)
        .with_suggestion("Register the model with Schema::model() before querying it")
    }

    /// Create an error for an association the owner model does not declare.
    pub fn unknown_association(model: impl Into<String>, association: impl Into<String>) -> Self {
        let model = model.into();
        let association = association.into();
        Self::new(
            ErrorCode::InvalidSelect,
            format!("Association named '{}' was not found on {}", association, model),
        )
        .with_model(&model)
        .with_association(&association)
        .with_suggestion("Check for typos in the association name")
    }

    /// Create an error for an association kind that cannot be count-preloaded.
    pub fn unsupported_association(
        model: impl Into<String>,
        association: impl Into<String>,
        kind: impl fmt::Display,
    ) -> Self {
        let model = model.into();
        let association = association.into();
        Self::new(
            ErrorCode::UnsupportedAssociation,
            format!(
                "Counts cannot be preloaded for {} association '{}' on {}",
                kind, association, model
            ),
        )
        .with_model(&model)
        .with_association(&association)
        .with_help("Only has_many and has_many :through associations support count preloading")
    }

    /// Create an invalid input error.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        Self::new(
            ErrorCode::InvalidParameter,
            format!("Invalid input for {}: {}", field, message),
        )
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConnectionFailed, format!("Connection error: {}", message))
            .with_suggestion("Check that the database file exists and is readable")
            .with_suggestion("Verify the connection URL is correct")
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::DeserializationError, format!("Failed to deserialize result: {}", message))
            .with_suggestion("Check that the model matches the database schema")
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::DatabaseError, message)
            .with_suggestion("Check the database logs for more details")
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    // ============== Error Checks ==============

    /// Check if this is an unsupported association error.
    pub fn is_unsupported_association(&self) -> bool {
        self.code == ErrorCode::UnsupportedAssociation
    }

    /// Check if this error was raised while resolving a model or association.
    pub fn is_invalid_select(&self) -> bool {
        self.code == ErrorCode::InvalidSelect
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        self.code == ErrorCode::ConnectionFailed
    }

    // ============== Display Functions ==============

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref association) = self.context.association {
            output.push_str(&format!("  → Association: {}\n", association));
        }

        // SQL (truncated if too long)
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.len() > 200 {
                let cut = (0..=200).rev().find(|i| sql.is_char_boundary(*i)).unwrap_or(0);
                format!("{}...", &sql[..cut])
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}
