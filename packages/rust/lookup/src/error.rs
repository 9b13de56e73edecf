//! Failure taxonomy for the lookup engine.
//!
//! Callers never see these as errors. The engine renders the variant into the
//! `error` field of the returned result so a batch can keep going no matter
//! what a single item hit. The Display strings for the missing input field and
//! missing search button are part of the output contract and must not change.

use thiserror::Error;

/// A single failed step inside one lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// No browser session could be established within the retry budget.
    #[error("driver initialization failed after {attempts} attempts: {message}")]
    Session { attempts: u32, message: String },

    /// Navigation to the lookup page failed or timed out.
    #[error("failed to open {url}: {message}")]
    Navigation { url: String, message: String },

    /// No selector in the input-field chain matched a usable element.
    #[error("Could not find input field")]
    InputFieldNotFound,

    /// Filling the phone field failed after the element was located.
    #[error("failed to fill the phone field: {0}")]
    Fill(String),

    /// No selector in the submit-button chain matched a usable element.
    #[error("Could not find search button")]
    SearchButtonNotFound,

    /// Clicking the submit control failed after it was located.
    #[error("failed to submit the search form: {0}")]
    Submit(String),

    /// A result field could not be read from the response page.
    #[error("error extracting {field}: {message}")]
    Extraction { field: &'static str, message: String },

    /// The lookup was cancelled at a suspension point.
    #[error("lookup cancelled")]
    Cancelled,
}

impl LookupError {
    /// Create a navigation error.
    pub fn navigation(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an extraction error for a named result field.
    pub fn extraction(field: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Extraction {
            field,
            message: message.to_string(),
        }
    }
}

/// Raw failure reported by a page driver, without step context.
/// The engine wraps it into the matching [`LookupError`] variant.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PageError {
    message: String,
}

impl PageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<fantoccini::error::CmdError> for PageError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for PageError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_error_strings_are_stable() {
        assert_eq!(
            LookupError::InputFieldNotFound.to_string(),
            "Could not find input field"
        );
        assert_eq!(
            LookupError::SearchButtonNotFound.to_string(),
            "Could not find search button"
        );
    }

    #[test]
    fn session_error_reports_attempts() {
        let e = LookupError::Session {
            attempts: 3,
            message: "connection refused".into(),
        };
        assert_eq!(
            e.to_string(),
            "driver initialization failed after 3 attempts: connection refused"
        );
    }

    #[test]
    fn extraction_error_names_the_field() {
        let e = LookupError::extraction("location", "element never appeared");
        assert!(e.to_string().contains("location"));
        assert!(e.to_string().contains("element never appeared"));
    }
}
