//! Error types

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors that can occur during a notification run
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error {status} from {url}: {message}")]
    ApiError { url: String, status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response from {url}: {message}")]
    Protocol { url: String, message: String },

    #[error("Diff tool failed: {0}")]
    DiffTool(String),

    #[error("Cannot access {path}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl NotifyError {
    /// Check if this error came from one of the remote services
    pub fn is_remote(&self) -> bool {
        matches!(self, NotifyError::ApiError { .. } | NotifyError::Network(_))
    }

    /// HTTP status of a remote failure, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            NotifyError::ApiError { status, .. } => Some(*status),
            NotifyError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NotifyError::FileAccess {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        NotifyError::Parse {
            path: path.into(),
            source,
        }
    }
}

/// Shorten a response body for an error message
pub(crate) fn excerpt(text: &str) -> String {
    const MAX: usize = 200;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message() {
        let err = NotifyError::ApiError {
            url: "https://api.github.com/repos/o/r/issues".to_string(),
            status: 401,
            message: "Bad credentials".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Bad credentials"));
        assert!(err.is_remote());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_local_errors_are_not_remote() {
        assert!(!NotifyError::Config("files is empty".to_string()).is_remote());
        assert!(!NotifyError::DiffTool("exit status 2".to_string()).is_remote());

        let err = NotifyError::Protocol {
            url: "https://hg.example/json-log/tip/a".to_string(),
            message: "no entries".to_string(),
        };
        assert!(!err.is_remote());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_file_access_keeps_path() {
        let err = NotifyError::file_access(
            "/state/status.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/state/status.json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short"), "short");
        let cut = excerpt(&"x".repeat(500));
        assert_eq!(cut.len(), 203);
        assert!(cut.ends_with("..."));
    }
}
