//! Error types for booksync-core

use thiserror::Error;

/// Result type alias using booksync-core's Error
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while reconciling bookings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Spreadsheet locator could not be resolved to an identifier
    #[error("Invalid spreadsheet locator: {0}")]
    InvalidLocator(String),

    /// Operation requires a spreadsheet but none was given
    #[error("Valid Spreadsheet ID or URL is required")]
    MissingLocator,

    /// Unknown or missing action discriminator
    #[error("{0}")]
    InvalidAction(String),

    /// Credential or configuration problem with the spreadsheet backend
    #[error("{0}")]
    Authentication(String),

    /// Database or spreadsheet remote call failure
    #[error("{0}")]
    Backend(String),

    /// A single import row failed required-field checks
    #[error("{0}")]
    Validation(String),
}

impl SyncError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn authentication(message: impl std::fmt::Display) -> Self {
        Self::Authentication(format!("Authentication failed: {message}"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Prefix the error with the operation it interrupted.
    ///
    /// Request errors (locator/action) are returned unchanged; they describe
    /// the invocation rather than a failed operation.
    #[must_use]
    pub fn context(self, operation: &str) -> Self {
        match self {
            Self::Authentication(message) => {
                Self::Authentication(format!("{operation} failed: {message}"))
            }
            Self::Backend(message) => Self::Backend(format!("{operation} failed: {message}")),
            Self::Validation(message) => {
                Self::Validation(format!("{operation} failed: {message}"))
            }
            other => other,
        }
    }

    /// Whether the error was caused by the request rather than a backend.
    pub const fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidLocator(_) | Self::MissingLocator | Self::InvalidAction(_)
        )
    }
}

/// Errors raised while loading startup configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
