//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use miette::Diagnostic;
use opbundle_core::CoreError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Validation failed (manifest or package)
    #[error("Validation failed: {message}")]
    #[diagnostic(code(opbundle::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// An uploaded file could not be used
    #[error("Upload failed: {message}")]
    #[diagnostic(code(opbundle::cli::upload))]
    Upload {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Session missing or unreadable
    #[error("Session error: {message}")]
    #[diagnostic(code(opbundle::cli::session))]
    Session {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid command line input
    #[error("Invalid input: {message}")]
    #[diagnostic(code(opbundle::cli::usage))]
    Usage { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(opbundle::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(opbundle::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Upload { .. } => exit_codes::UPLOAD_ERROR,
            CliError::Session { .. } => exit_codes::SESSION_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an upload error
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            message: message.into(),
            help: None,
        }
    }

    /// Create a session error with help text
    pub fn session_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an input error (user provided invalid input)
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SessionNotFound { path } => CliError::session_with_help(
                format!("no session at {}", path),
                "Run `opbundle init` to start a new session",
            ),
            CoreError::Io(e) => CliError::from(e),
            CoreError::InvalidEdit { message } => CliError::usage(message),
            other => CliError::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<miette::Report> for CliError {
    fn from(err: miette::Report) -> Self {
        CliError::Other {
            message: format!("{:?}", err),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::upload("x").exit_code(), exit_codes::UPLOAD_ERROR);
        assert_eq!(
            CliError::validation_with_help("x", "y").exit_code(),
            exit_codes::VALIDATION_ERROR
        );
        assert_eq!(CliError::usage("x").exit_code(), exit_codes::USAGE_ERROR);
    }

    #[test]
    fn test_missing_session_maps_to_session_error() {
        let err = CliError::from(CoreError::SessionNotFound {
            path: ".opbundle/session.json".to_string(),
        });

        assert_eq!(err.exit_code(), exit_codes::SESSION_ERROR);
        assert!(err.to_string().contains(".opbundle/session.json"));
    }
}
