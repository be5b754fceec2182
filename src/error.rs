//! Error types shared across the crate.
//!
//! Each layer owns one enum: [`ConfigError`] for startup configuration,
//! [`ArchiveError`] for local packaging, [`ApiError`] for remote calls, and
//! [`ToolError`] at the dispatcher boundary where everything is rendered
//! into a tool response.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failure while packaging a local project into an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to create archive {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to add {entry} to archive: {source}")]
    Entry {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive task aborted: {0}")]
    Join(String),
}

/// Classification of a failed remote call.
///
/// Produced only by [`crate::client::classify`]; callers match on it for
/// display purposes, never for control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The service answered with a non-success status.
    Remote { status: u16, message: String },
    /// The request went out but no response came back (connect failure, timeout).
    Transport { detail: String },
    /// The request could not be built or its response could not be decoded.
    RequestSetup { message: String },
}

impl ApiErrorKind {
    /// Human-readable cause, the text shown to the assistant.
    pub fn cause(&self) -> &str {
        match self {
            Self::Remote { message, .. } => message,
            Self::Transport { .. } => "No response from server",
            Self::RequestSetup { message } => message,
        }
    }
}

/// A failed call to the remote analysis service.
#[derive(Debug, Clone, Error)]
#[error("{operation} failed: {}", kind.cause())]
pub struct ApiError {
    pub operation: &'static str,
    pub kind: ApiErrorKind,
}

impl ApiError {
    pub fn new(operation: &'static str, kind: ApiErrorKind) -> Self {
        Self { operation, kind }
    }
}

/// Errors surfaced by the tool dispatcher.
///
/// Everything except [`ToolError::UnknownTool`] is rendered into an
/// `isError: true` tool response; an unknown tool is a protocol error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn remote_error_displays_server_message() {
        let err = ApiError::new(
            "analyzeRepository",
            ApiErrorKind::Remote {
                status: 422,
                message: "Repository not reachable".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "analyzeRepository failed: Repository not reachable"
        );
    }

    #[test]
    fn transport_error_hides_low_level_detail() {
        let err = ApiError::new(
            "fetchFindings",
            ApiErrorKind::Transport {
                detail: "tcp connect error".into(),
            },
        );
        assert_eq!(err.to_string(), "fetchFindings failed: No response from server");
    }

    #[test]
    fn tool_error_wraps_api_error_transparently() {
        let err: ToolError = ApiError::new(
            "generateScript",
            ApiErrorKind::RequestSetup {
                message: "builder error".into(),
            },
        )
        .into();
        assert_eq!(err.to_string(), "generateScript failed: builder error");
    }
}
