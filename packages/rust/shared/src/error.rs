//! Error types for Phonescout.
//!
//! Library crates use [`PhonescoutError`] via `thiserror`.
//! App crates (cli/server) wrap this with `color-eyre` for rich diagnostics.
//! The lookup engine has its own tagged error type; only its rendered
//! message ever reaches a [`crate::PhoneLookupResult`].

use std::path::PathBuf;

/// Top-level error type for all Phonescout operations.
#[derive(Debug, thiserror::Error)]
pub enum PhonescoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Bad caller input: empty file, unsupported format, no usable values.
    #[error("input error: {message}")]
    Input { message: String },

    /// CSV encoding/decoding error.
    #[error("csv error: {0}")]
    Csv(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PhonescoutError>;

impl PhonescoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an input error from any displayable message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PhonescoutError::config("could not determine home directory");
        assert_eq!(
            err.to_string(),
            "config error: could not determine home directory"
        );

        let err = PhonescoutError::input("file contains no data rows");
        assert!(err.to_string().contains("no data rows"));
    }
}
