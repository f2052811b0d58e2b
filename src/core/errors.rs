//! Shared error types for the application

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for errfix operations
#[derive(Debug, Error)]
pub enum Error {
    /// File system errors with the path that failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Go source that does not parse
    #[error("Parse error in {}:{line}:{column}: {message}", file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// The program could not be assembled into typed units
    #[error("Load error: {0}")]
    Load(String),

    /// The destination tree diverged from the analysis tree
    #[error(
        "Mapping error in {} at depth {depth}: expected {expected}, found {found}",
        file.display()
    )]
    Mapping {
        file: PathBuf,
        depth: usize,
        expected: String,
        found: String,
    },

    /// Replacement code could not be produced for one point
    #[error("Generation error: {0}")]
    Generation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed failure template
    #[error("Template error: {0}")]
    Template(String),

    /// Pattern errors
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error with location
    pub fn parse(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Attach the file a mapping failure happened in
    pub fn in_file(self, path: &Path) -> Self {
        match self {
            Self::Mapping {
                depth,
                expected,
                found,
                ..
            } => Self::Mapping {
                file: path.to_path_buf(),
                depth,
                expected,
                found,
            },
            other => other,
        }
    }

    /// Whether the whole run has to stop. Generation failures only skip
    /// the point they came from.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Generation(_) | Self::Template(_))
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_errors_name_file_and_kinds() {
        let err = Error::Mapping {
            file: PathBuf::new(),
            depth: 3,
            expected: "Call".into(),
            found: "Ident".into(),
        }
        .in_file(Path::new("main.go"));
        assert_eq!(
            err.to_string(),
            "Mapping error in main.go at depth 3: expected Call, found Ident"
        );
        assert!(err.is_fatal());
        assert!(!Error::Generation("no zero value".into()).is_fatal());
    }
}
