//! Error types for valuation operations.
//!
//! This module defines [`DcfError`], a chained error carrying a message and an
//! optional cause. Every error renders as `"<Kind> Error: <message>"`, followed by
//! `". Caused by: <cause>"` when a cause is attached.

use thiserror::Error;

/// Boxed error used as the cause of a [`DcfError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while fetching data, valuing a security or writing a report.
#[derive(Error, Debug)]
pub enum DcfError {
    /// Invalid input parameters or a malformed upstream response.
    #[error("Validation Error: {}{}", .message, caused_by(.cause))]
    Validation {
        /// Description of the failure.
        message: String,
        /// Underlying cause, if any.
        #[source]
        cause: Option<BoxError>,
    },

    /// Upstream financial data is missing or the data API failed.
    #[error("Data Error: {}{}", .message, caused_by(.cause))]
    Data {
        /// Description of the failure.
        message: String,
        /// Underlying cause, if any.
        #[source]
        cause: Option<BoxError>,
    },

    /// Insufficient history or an economically invalid rate combination.
    #[error("Calculation Error: {}{}", .message, caused_by(.cause))]
    Calculation {
        /// Description of the failure.
        message: String,
        /// Underlying cause, if any.
        #[source]
        cause: Option<BoxError>,
    },

    /// Report template could not be read or the report could not be written.
    #[error("Report Error: {}{}", .message, caused_by(.cause))]
    Report {
        /// Description of the failure.
        message: String,
        /// Underlying cause, if any.
        #[source]
        cause: Option<BoxError>,
    },

    /// A directory could not be created.
    #[error("File System Error: {}{}", .message, caused_by(.cause))]
    FileSystem {
        /// Description of the failure.
        message: String,
        /// Underlying cause, if any.
        #[source]
        cause: Option<BoxError>,
    },
}

fn caused_by(cause: &Option<BoxError>) -> String {
    cause
        .as_ref()
        .map(|c| format!(". Caused by: {c}"))
        .unwrap_or_default()
}

impl DcfError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a data error.
    #[must_use]
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a calculation error.
    #[must_use]
    pub fn calculation(message: impl Into<String>) -> Self {
        Self::Calculation {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a report error.
    #[must_use]
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a file system error.
    #[must_use]
    pub fn file_system(message: impl Into<String>) -> Self {
        Self::FileSystem {
            message: message.into(),
            cause: None,
        }
    }

    /// Attaches a cause, replacing any previous one.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        let slot = match &mut self {
            Self::Validation { cause, .. }
            | Self::Data { cause, .. }
            | Self::Calculation { cause, .. }
            | Self::Report { cause, .. }
            | Self::FileSystem { cause, .. } => cause,
        };
        *slot = Some(cause.into());
        self
    }

    /// Returns the error message without the kind prefix or cause.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::Data { message, .. }
            | Self::Calculation { message, .. }
            | Self::Report { message, .. }
            | Self::FileSystem { message, .. } => message,
        }
    }
}

/// Result type alias using [`DcfError`].
pub type Result<T> = std::result::Result<T, DcfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_without_cause() {
        assert_eq!(
            DcfError::validation("Cannot do XYZ").to_string(),
            "Validation Error: Cannot do XYZ"
        );
        assert_eq!(
            DcfError::calculation("Cannot do XYZ").to_string(),
            "Calculation Error: Cannot do XYZ"
        );
        assert_eq!(
            DcfError::data("Cannot do XYZ").to_string(),
            "Data Error: Cannot do XYZ"
        );
        assert_eq!(
            DcfError::report("Cannot do XYZ").to_string(),
            "Report Error: Cannot do XYZ"
        );
        assert_eq!(
            DcfError::file_system("Cannot do XYZ").to_string(),
            "File System Error: Cannot do XYZ"
        );
    }

    #[test]
    fn test_display_with_string_cause() {
        let err = DcfError::validation("Cannot do XYZ").with_cause("Some Error");
        assert_eq!(
            err.to_string(),
            "Validation Error: Cannot do XYZ. Caused by: Some Error"
        );
    }

    #[test]
    fn test_display_with_chained_cause() {
        let root = DcfError::data("Root Cause");
        let err = DcfError::validation("Cannot do XYZ").with_cause(root);
        assert_eq!(
            err.to_string(),
            "Validation Error: Cannot do XYZ. Caused by: Data Error: Root Cause"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_message_accessor() {
        let err = DcfError::report("bad template").with_cause("io");
        assert_eq!(err.message(), "bad template");
    }
}
