//! Common types shared across the shovel crates.
//!
//! This crate holds the error taxonomy every other crate reports through and
//! the observability helpers binaries and tests use to wire up `tracing`. It
//! stays small so that everything else can depend on it cheaply.
//!
//! # Overview
//!
//! - [`ShovelError`] and [`Result`]: shared error handling
//! - [`BoxError`]: the erased cause carried by transport failures
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use shovel_common::ShovelError;
//!
//! let err = ShovelError::HttpStatus {
//!     url: "https://example.com/missing".into(),
//!     status: 404,
//!     body: "not here".into(),
//! };
//! assert!(err.is_fetch_failure());
//! assert!(!ShovelError::ElementNotFound("#main".into()).is_fetch_failure());
//! ```

pub mod observability;

/// Type-erased error used as the cause of a [`ShovelError::Transport`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types used across the shovel workspace.
#[derive(thiserror::Error, Debug)]
pub enum ShovelError {
    /// The GET could not be completed (bad URL, connect, timeout, closed client).
    #[error("error happened when trying to fetch '{url}': {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    /// A response arrived but its status was outside the 2xx class.
    #[error("failed to fetch '{url}': {status}\n{body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// A helper that needs exactly one element found none.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// A structural accessor expected an element the document does not have.
    #[error("document does not have a {0} element")]
    IllegalDocumentStructure(&'static str),

    /// The HTML parser rejected a selector.
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// Client configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ShovelError {
    /// Whether this error is one of the two failures a fetch can produce.
    ///
    /// The `*_or_none` fetch helpers discard exactly these.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::HttpStatus { .. })
    }

    /// HTTP status carried by an [`ShovelError::HttpStatus`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenient alias for results that use [`ShovelError`].
pub type Result<T> = std::result::Result<T, ShovelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_message_names_url_and_cause() {
        let err = ShovelError::Transport {
            url: "http://unreachable.invalid/".into(),
            source: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("http://unreachable.invalid/"));
        assert!(msg.contains("connection refused"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn status_only_for_http_status() {
        let err = ShovelError::HttpStatus {
            url: "u".into(),
            status: 302,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(302));
        assert_eq!(ShovelError::IllegalDocumentStructure("body").status(), None);
    }

    #[test]
    fn structure_error_reads_naturally() {
        assert_eq!(
            ShovelError::IllegalDocumentStructure("head").to_string(),
            "document does not have a head element"
        );
    }
}
