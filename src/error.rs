//! Error handling for the clinic content client

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Unified error type for the clinic content client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The backend answered with a non-success status
    #[error("API error: {message} (Status: {status})")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    /// Any other failed remote call
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Realtime subscription errors
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Local required-field check failed before any remote call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Missing or invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A gateway call did not finish in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The owner of the operation was torn down before it completed
    #[error("Operation cancelled")]
    Cancelled,
}

/// Coarse classification of [`Error`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Gateway,
    Validation,
    Config,
    Auth,
    Cancelled,
}

impl Error {
    /// Create a new gateway error
    pub fn gateway<T: fmt::Display>(msg: T) -> Self {
        Error::Gateway(msg.to_string())
    }

    /// Create a new realtime error
    pub fn realtime<T: fmt::Display>(msg: T) -> Self {
        Error::Realtime(msg.to_string())
    }

    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http(_)
            | Error::Json(_)
            | Error::Url(_)
            | Error::Api { .. }
            | Error::Gateway(_)
            | Error::Realtime(_)
            | Error::Timeout(_) => ErrorKind::Gateway,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Config(_) => ErrorKind::Config,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_gateway(&self) -> bool {
        self.kind() == ErrorKind::Gateway
    }
}

/// What is wrong with a single form field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    Missing,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub problem: Problem,
}

/// Collected field issues from a local form check
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("{}", describe(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `field` as missing when `value` is blank
    pub fn require(&mut self, field: &'static str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.issues.push(FieldIssue {
                field,
                problem: Problem::Missing,
            });
        }
        self
    }

    pub fn invalid(&mut self, field: &'static str) -> &mut Self {
        self.issues.push(FieldIssue {
            field,
            problem: Problem::Invalid,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

fn describe(issues: &[FieldIssue]) -> String {
    let missing: Vec<&str> = issues
        .iter()
        .filter(|i| i.problem == Problem::Missing)
        .map(|i| i.field)
        .collect();
    let invalid: Vec<&str> = issues
        .iter()
        .filter(|i| i.problem == Problem::Invalid)
        .map(|i| i.field)
        .collect();

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing required field(s): {}", missing.join(", ")));
    }
    if !invalid.is_empty() {
        parts.push(format!("invalid value(s) for: {}", invalid.join(", ")));
    }
    parts.join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_fields() {
        let mut v = ValidationError::new();
        v.require("name", "  ").require("email", "a@b.c").invalid("reason");
        assert!(v.mentions("name"));
        assert!(!v.mentions("email"));
        assert_eq!(
            v.to_string(),
            "missing required field(s): name; invalid value(s) for: reason"
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(Error::gateway("x").kind(), ErrorKind::Gateway);
        assert_eq!(
            Error::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Gateway
        );
        assert_eq!(Error::config("x").kind(), ErrorKind::Config);
        assert!(ValidationError::new().into_result().is_ok());
    }
}
