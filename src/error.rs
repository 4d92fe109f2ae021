//! Error types for the conformance harness
//!
//! Assertion mismatches and probe exceptions are never errors: they become
//! failed [`TestCase`](crate::testcase::TestCase) records. The types here cover
//! misuse of the harness itself (bad configuration, a runner invoked twice, a
//! worker channel that went away).

use thiserror::Error;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be parsed or failed validation
    #[error("InvalidConfig: {0}")]
    InvalidConfig(String),

    /// A regular expression handed to the harness did not compile
    #[error("InvalidPattern: {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The worker side of a message channel was dropped
    #[error("ChannelClosed: worker '{0}' is no longer connected")]
    ChannelClosed(String),

    /// The synchronous runner was asked to run a suite a second time
    #[error("RunnerAlreadyInvoked: suite '{0}' has already been reported")]
    RunnerAlreadyInvoked(String),

    /// JSON (de)serialization error
    #[error("JsonError: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// IO error
    #[error("IOError: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig(message.into())
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for the harness
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::invalid_config("tolerance must be finite").to_string(),
            "InvalidConfig: tolerance must be finite"
        );
        assert_eq!(
            Error::invalid_pattern("(", "unclosed group").to_string(),
            "InvalidPattern: (: unclosed group"
        );
        assert_eq!(
            Error::ChannelClosed("w1".into()).to_string(),
            "ChannelClosed: worker 'w1' is no longer connected"
        );
    }

    #[test]
    fn test_io_error_converts() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(Error::Io { .. })));
    }
}
