//! Error handling for the Little IR toolkit
//!
//! This module defines the common error type used by the IR builder,
//! the textual-form parser, the verifier, and the demo driver.

use crate::source_loc::TextLocation;
use thiserror::Error;

/// Main error type that encompasses all phases of IR handling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    #[error("Builder error: {message}")]
    Build { message: String },

    #[error("Parse error at {location}: {message}")]
    Parse {
        location: TextLocation,
        message: String,
    },

    #[error("Verification failed: {message}")]
    Verify { message: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl IrError {
    /// Create a builder error
    pub fn build_error(message: impl Into<String>) -> Self {
        IrError::Build {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse_error(message: impl Into<String>, location: TextLocation) -> Self {
        IrError::Parse {
            location,
            message: message.into(),
        }
    }

    /// Create a verification error
    pub fn verify_error(message: impl Into<String>) -> Self {
        IrError::Verify {
            message: message.into(),
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for IrError {
    fn from(err: std::io::Error) -> Self {
        IrError::Io {
            message: err.to_string(),
        }
    }
}

/// Convert from String (for simple error cases)
impl From<String> for IrError {
    fn from(message: String) -> Self {
        IrError::Internal { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IrError::build_error("no current block");
        assert_eq!(format!("{}", err), "Builder error: no current block");

        let err = IrError::parse_error("expected 'define'", TextLocation::new(3, 7));
        assert_eq!(format!("{}", err), "Parse error at 3:7: expected 'define'");
    }

    #[test]
    fn test_from_string() {
        let err: IrError = "something went wrong".to_string().into();
        assert_eq!(
            err,
            IrError::Internal {
                message: "something went wrong".to_string()
            }
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: IrError = io_err.into();
        assert!(matches!(err, IrError::Io { .. }));
    }
}
