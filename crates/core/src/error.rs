//! Error types for document extraction.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extracting a document.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// ZIP package error (for OOXML files).
    #[error("Package error: {0}")]
    Package(String),

    /// XML parsing error (for OOXML parts).
    #[error("XML parsing error: {0}")]
    Xml(String),

    /// Invalid or corrupted file.
    #[error("Invalid or corrupted file: {0}")]
    CorruptedFile(String),

    /// A required external program is not installed.
    #[error("Required tool not found: {0}")]
    MissingTool(String),

    /// An external program ran but reported failure.
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// An external program did not finish in time.
    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    /// Format conversion through the office suite failed.
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// The text service is temporarily unavailable (retryable).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The text service rejected the request.
    #[error("Service error: {0}")]
    Service(String),

    /// Failed to extract content from a unit.
    #[error("Extraction error: {0}")]
    Extraction(String),
}

impl Error {
    /// Whether retrying the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::ServiceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Timeout {
            tool: "soffice".into(),
            seconds: 120,
        };
        assert_eq!(err.to_string(), "soffice timed out after 120s");

        let err = Error::MissingTool("pdftoppm".into());
        assert_eq!(err.to_string(), "Required tool not found: pdftoppm");
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(Error::ServiceUnavailable("503".into()).is_transient());
        assert!(!Error::Service("400".into()).is_transient());
        assert!(!Error::MissingTool("tesseract".into()).is_transient());
    }
}
