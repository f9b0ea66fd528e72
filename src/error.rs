//! Error types for lenscrl.

use std::io;
use thiserror::Error;

/// Result type alias for lenscrl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while loading, analysing or extracting.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading the source or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as a PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The document structure is corrupted or malformed.
    #[error("Corrupted document: {0}")]
    Corrupted(String),

    /// An embedded image payload could not be decoded.
    #[error("Corrupt embedded image on page {page}: {reason}")]
    CorruptImage {
        /// Page index (0-based)
        page: usize,
        /// What was wrong with the payload
        reason: String,
    },

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// Page geometry cannot support layout analysis.
    #[error("Layout analysis failed on page {page}: {reason}")]
    Layout {
        /// Page index (0-based)
        page: usize,
        /// Reason
        reason: String,
    },

    /// Adaptive structure analysis failed. Always recovered by the detector.
    #[error("Section detection degraded: {0}")]
    Detection(String),

    /// Writing one extracted image failed.
    #[error("Failed to persist {filename}: {source}")]
    Persist {
        /// Target filename
        filename: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error means the document itself could not be read.
    ///
    /// Structural errors abort a run; everything else is recovered locally.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::UnknownFormat
                | Error::UnsupportedVersion(_)
                | Error::PdfParse(_)
                | Error::Corrupted(_)
                | Error::CorruptImage { .. }
                | Error::PageOutOfRange(..)
                | Error::Layout { .. }
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::CorruptImage {
            page: 2,
            reason: "truncated samples".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Corrupt embedded image on page 2: truncated samples"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_structural());
    }

    #[test]
    fn test_recoverable_errors_are_not_structural() {
        assert!(!Error::Detection("no candidates".into()).is_structural());
        let persist = Error::Persist {
            filename: "CRL-X-1.png".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!persist.is_structural());
        assert!(!Error::Config("bad".into()).is_structural());
    }
}
