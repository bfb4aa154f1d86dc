//! Error types for ledframe

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ledframe operations
pub type Result<T> = std::result::Result<T, Error>;

/// ledframe error type
#[derive(Error, Debug)]
pub enum Error {
    // Source errors
    #[error("Input file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Could not open video source: {0}")]
    SourceUnopenable(String),

    #[error("No video stream in source")]
    NoVideoStream,

    #[error("Decode error: {0}")]
    Decode(String),

    // FFmpeg errors
    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    // Frame errors
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    // Output errors
    #[error("Output initialization failed: {0}")]
    OutputInit(String),

    #[error("File output error: {0}")]
    FileOutput(String),

    // General errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Missing or undecodable input: abort before any output exists
    pub fn is_fatal_source(&self) -> bool {
        matches!(
            self,
            Error::SourceNotFound(_) | Error::SourceUnopenable(_) | Error::NoVideoStream
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_source_classification() {
        assert!(Error::SourceNotFound(PathBuf::from("a.mov")).is_fatal_source());
        assert!(Error::SourceUnopenable("bad".into()).is_fatal_source());
        assert!(!Error::Decode("eof".into()).is_fatal_source());
        assert!(!Error::Config("x".into()).is_fatal_source());
    }

    #[test]
    fn test_not_found_message_names_path() {
        let e = Error::SourceNotFound(PathBuf::from("clips/intro.mov"));
        assert_eq!(e.to_string(), "Input file not found: clips/intro.mov");
    }
}
