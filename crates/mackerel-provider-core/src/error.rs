//! Error types for the Mackerel provider
//!
//! This module defines the error taxonomy surfaced to the orchestrator and
//! the error type of the remote client handle.

use crate::value::AttributePath;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the provider
///
/// Every variant maps onto one diagnostic category through [`Error::category`].
#[derive(Error, Debug)]
pub enum Error {
    /// Schema or validator rejection, raised before any remote call
    #[error("Configuration error: {}", render_diagnostics(.0))]
    Configuration(Vec<Diagnostic>),

    /// An operation ran before the provider was configured
    #[error("Unconfigured Mackerel Client: {0}")]
    ClientUnavailable(String),

    /// Remote create failed
    #[error("Unable to create {type_name}: {message}")]
    Create {
        /// Resource type name
        type_name: String,
        /// Remote message, verbatim
        message: String,
    },

    /// Remote read failed
    #[error("Unable to read {type_name}: {id}: {message}")]
    Read {
        /// Resource type name
        type_name: String,
        /// Identity that was read
        id: String,
        /// Remote message, verbatim
        message: String,
    },

    /// Remote update failed
    #[error("Unable to update {type_name}: {id}: {message}")]
    Update {
        /// Resource type name
        type_name: String,
        /// Identity that was updated
        id: String,
        /// Remote message, verbatim
        message: String,
    },

    /// Remote delete failed
    #[error("Unable to delete {type_name}: {id}: {message}")]
    Delete {
        /// Resource type name
        type_name: String,
        /// Identity that was deleted
        id: String,
        /// Remote message, verbatim
        message: String,
    },

    /// Update invoked on a type (or field) that cannot change in place
    #[error("Unable to update {type_name}: {message}")]
    UnsupportedOperation {
        /// Resource type name
        type_name: String,
        /// Explanation for the operator
        message: String,
    },

    /// Remote response or stored state is malformed
    #[error("Decode error: {0}")]
    Decode(String),

    /// Import target does not exist
    #[error("Cannot import non-existent remote object: {type_name} {id}")]
    ImportNotFound {
        /// Resource type name
        type_name: String,
        /// Identity supplied for import
        id: String,
    },

    /// A type name is not served by this provider
    #[error("Unknown {kind} type: {name}")]
    UnknownType {
        /// "resource" or "data source"
        kind: &'static str,
        /// Requested type name
        name: String,
    },

    /// A type name is registered twice
    #[error("Duplicate {kind} type: {name}")]
    DuplicateType {
        /// "resource" or "data source"
        kind: &'static str,
        /// Colliding type name
        name: String,
    },

    /// Provider construction errors (environment options, client setup)
    #[error("Setup error: {0}")]
    Setup(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error for a single attribute
    pub fn configuration(path: Option<AttributePath>, detail: impl Into<String>) -> Self {
        Self::Configuration(vec![Diagnostic::error("Invalid Attribute Value", detail).with_path(path)])
    }

    /// Create an unconfigured-client error
    pub fn client_unavailable(msg: impl Into<String>) -> Self {
        Self::ClientUnavailable(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a setup error
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Short category label used as diagnostic summary
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "Configuration Error",
            Self::ClientUnavailable(_) => "Unconfigured Mackerel Client",
            Self::Create { .. } => "Create Error",
            Self::Read { .. } => "Read Error",
            Self::Update { .. } => "Update Error",
            Self::Delete { .. } => "Delete Error",
            Self::UnsupportedOperation { .. } => "Unsupported Operation",
            Self::Decode(_) => "Decode Error",
            Self::ImportNotFound { .. } => "Import Not Found",
            Self::UnknownType { .. } => "Unknown Type",
            Self::DuplicateType { .. } => "Duplicate Type",
            Self::Setup(_) => "Setup Error",
            Self::Other(_) => "Error",
        }
    }

    /// Convert into the diagnostics attached to an operation response
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            Self::Configuration(diagnostics) => diagnostics,
            other => vec![Diagnostic::from(&other)],
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A structured diagnostic returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Short category label
    pub summary: String,
    /// Underlying message (remote messages are carried verbatim)
    pub detail: String,
    /// Attribute the diagnostic points at, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_path(mut self, path: Option<AttributePath>) -> Self {
        self.attribute = path.map(|p| p.to_string());
        self
    }
}

impl From<&Error> for Diagnostic {
    fn from(err: &Error) -> Self {
        let detail = match err {
            Error::Create { message, .. }
            | Error::Read { message, .. }
            | Error::Update { message, .. }
            | Error::Delete { message, .. }
            | Error::UnsupportedOperation { message, .. } => message.clone(),
            Error::ClientUnavailable(msg)
            | Error::Decode(msg)
            | Error::Setup(msg)
            | Error::Other(msg) => msg.clone(),
            other => other.to_string(),
        };
        let summary = match err {
            Error::Create { type_name, .. } => format!("Unable to create {type_name}"),
            Error::Read { type_name, id, .. } => format!("Unable to read {type_name}: {id}"),
            Error::Update { type_name, id, .. } => format!("Unable to update {type_name}: {id}"),
            Error::Delete { type_name, id, .. } => format!("Unable to delete {type_name}: {id}"),
            Error::UnsupportedOperation { type_name, .. } => format!("Unable to update {type_name}"),
            other => other.category().to_string(),
        };
        Diagnostic::error(summary, detail)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(path) => write!(f, "{} ({}): {}", self.summary, path, self.detail),
            None => write!(f, "{}: {}", self.summary, self.detail),
        }
    }
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by the remote client handle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The remote entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The API answered with a non-success status
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Remote message, verbatim
        message: String,
    },

    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Create an API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Returns `true` if the remote entity is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
