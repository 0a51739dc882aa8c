//! # Error Types
//!
//! Error handling for the refactoring detection pipeline.
//! Only parse failures and I/O-level problems surface as errors; anomalies
//! inside a syntax tree are reported to the observer and skipped.

use std::fmt;
use std::path::PathBuf;

/// Error types that can occur while loading, parsing or configuring a detection run.
#[derive(Debug)]
pub enum ServiceError {
    /// A source file could not be parsed into a syntax tree
    Parse {
        file: String,
        line: usize,
        message: String,
    },
    /// No front-end is registered for the file's extension
    UnsupportedLanguage(String),
    /// Internal error with custom message
    Internal(String),
    /// I/O error reading files
    Io(std::io::Error),
    /// Error walking directory trees while loading a snapshot
    WalkDir(walkdir::Error),
    /// Error parsing YAML configuration
    SerdeYaml(serde_yaml::Error),
    /// Error producing JSON output
    SerdeJson(serde_json::Error),
    /// Requested file or directory not found
    FileNotFound(PathBuf),
    /// Glob pattern compilation error
    Glob(globset::Error),
}

impl ServiceError {
    pub fn parse(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        ServiceError::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Whether this error only concerns a single source file
    pub fn is_file_local(&self) -> bool {
        matches!(
            self,
            ServiceError::Parse { .. } | ServiceError::UnsupportedLanguage(_)
        )
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Parse {
                file,
                line,
                message,
            } => write!(f, "Parse error in {file} at line {}: {message}", line + 1),
            ServiceError::UnsupportedLanguage(file) => {
                write!(f, "No language front-end for file: {file}")
            }
            ServiceError::Internal(msg) => write!(f, "Internal error: {msg}"),
            ServiceError::Io(err) => write!(f, "IO error: {err}"),
            ServiceError::WalkDir(err) => write!(f, "Directory traversal error: {err}"),
            ServiceError::SerdeYaml(err) => write!(f, "YAML parsing error: {err}"),
            ServiceError::SerdeJson(err) => write!(f, "JSON error: {err}"),
            ServiceError::FileNotFound(path) => write!(f, "File not found: {}", path.display()),
            ServiceError::Glob(err) => write!(f, "Glob error: {err}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Io(err)
    }
}

impl From<walkdir::Error> for ServiceError {
    fn from(err: walkdir::Error) -> Self {
        ServiceError::WalkDir(err)
    }
}

impl From<serde_yaml::Error> for ServiceError {
    fn from(err: serde_yaml::Error) -> Self {
        ServiceError::SerdeYaml(err)
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerdeJson(err)
    }
}

impl From<globset::Error> for ServiceError {
    fn from(err: globset::Error) -> Self {
        ServiceError::Glob(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_is_one_based() {
        let err = ServiceError::parse("pkg/mod.py", 4, "unexpected token");
        assert_eq!(
            err.to_string(),
            "Parse error in pkg/mod.py at line 5: unexpected token"
        );
        assert!(err.is_file_local());
    }

    #[test]
    fn test_io_error_is_not_file_local() {
        let err = ServiceError::from(std::io::Error::other("disk"));
        assert!(!err.is_file_local());
    }
}
