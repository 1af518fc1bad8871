use std::path::PathBuf;

use thiserror::Error;

/// Failure categories surfaced by every pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Network,
    Parse,
    Io,
    Cancelled,
}

/// Error returned by the sniffer, the inference client, the parser and the
/// label writer.
///
/// None of the variants carry image content; messages are safe to log.
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// Empty or unreadable image, unrecognized media type, missing or
    /// malformed endpoint.
    #[error("input error: {0}")]
    Input(String),

    /// Transport failure, or a status outside 200..=299 (`status` is set).
    #[error("network error: {message}")]
    Network {
        status: Option<u16>,
        message: String,
    },

    /// Response body or label file could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Reading the image or writing the label file failed.
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A background annotation was cancelled before it wrote anything.
    #[error("annotation cancelled")]
    Cancelled,
}

impl AnnotateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnnotateError::Input(_) => ErrorKind::Input,
            AnnotateError::Network { .. } => ErrorKind::Network,
            AnnotateError::Parse(_) => ErrorKind::Parse,
            AnnotateError::Io { .. } => ErrorKind::Io,
            AnnotateError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn input(message: impl Into<String>) -> Self {
        AnnotateError::Input(message.into())
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        AnnotateError::Parse(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnnotateError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type AnnotateResult<T> = Result<T, AnnotateError>;
