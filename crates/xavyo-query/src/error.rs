//! Query engine error types
//!
//! Errors raised while executing a table query. Whether an error stops the
//! query is decided by [`crate::classify::ErrorTable`], not by the variant
//! alone.

use thiserror::Error;

/// Error that can occur while executing a query against a remote resource.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request never produced an HTTP response (DNS, TLS, socket, timeout).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote API answered with an error response.
    #[error("api error{}: {message}", format_api_context(*status, code.as_deref()))]
    Api {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// The response could not be interpreted (bad JSON, stuck cursor, ...).
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    /// Engine or client configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The requested table is not part of the catalog.
    #[error("unknown table: {name}")]
    UnknownTable { name: String },

    /// Internal error.
    #[error("internal error: {message}")]
    Internal { message: String },
}

fn format_api_context(status: Option<u16>, code: Option<&str>) -> String {
    match (status, code) {
        (Some(status), Some(code)) => format!(" ({status} {code})"),
        (Some(status), None) => format!(" ({status})"),
        (None, Some(code)) => format!(" ({code})"),
        (None, None) => String::new(),
    }
}

impl QueryError {
    /// Get an error code for classification and logging.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            QueryError::Transport { .. } => "TRANSPORT_ERROR",
            QueryError::Api { .. } => "API_ERROR",
            QueryError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            QueryError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            QueryError::UnknownTable { .. } => "UNKNOWN_TABLE",
            QueryError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// HTTP status of an API error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            QueryError::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Provider-specific error code of an API error, if any.
    #[must_use]
    pub fn api_code(&self) -> Option<&str> {
        match self {
            QueryError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Message text without the variant prefix.
    #[must_use]
    pub fn message_text(&self) -> String {
        match self {
            QueryError::Transport { message, .. }
            | QueryError::Api { message, .. }
            | QueryError::MalformedResponse { message }
            | QueryError::InvalidConfiguration { message }
            | QueryError::Internal { message } => message.clone(),
            QueryError::UnknownTable { name } => name.clone(),
        }
    }

    // Convenience constructors

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        QueryError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error with source.
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        QueryError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an API error.
    pub fn api(status: Option<u16>, code: Option<String>, message: impl Into<String>) -> Self {
        QueryError::Api {
            status,
            code,
            message: message.into(),
        }
    }

    /// Create an API error carrying only an HTTP status.
    pub fn status_only(status: u16, message: impl Into<String>) -> Self {
        Self::api(Some(status), None, message)
    }

    /// Create a malformed response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        QueryError::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        QueryError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        QueryError::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::malformed(err.to_string())
    }
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
