//! Error types for the read stream watcher.

use std::io::ErrorKind;
use thiserror::Error;

/// The main error type for read stream watcher operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The caller passed a path or option that can never work.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// I/O errors when opening or reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watching errors from the notify crate.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Writing piped content into the destination failed.
    #[error("Pipe destination error: {0}")]
    Pipe(#[source] std::io::Error),

    /// Pass-through mode needs a tokio runtime to drive its pump task.
    #[error("No tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    /// Stream has been closed.
    #[error("Stream closed")]
    StreamClosed,
}

/// A convenient Result type for read stream watcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], independent of which side raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    PermissionDenied,
    Other,
}

/// The sub-resource an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The content-read side.
    Read,
    /// The filesystem-watch side.
    Watch,
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Classifies the error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Error::Io(e) | Error::Pipe(e) => code_for_io_kind(e.kind()),
            Error::Watcher(e) => match &e.kind {
                notify::ErrorKind::PathNotFound => ErrorCode::NotFound,
                notify::ErrorKind::Io(io) => code_for_io_kind(io.kind()),
                _ => ErrorCode::Other,
            },
            Error::Runtime(_) | Error::StreamClosed => ErrorCode::Other,
        }
    }

    /// Which sub-resource raised the error, if any.
    pub fn origin(&self) -> Option<Origin> {
        match self {
            Error::Io(_) => Some(Origin::Read),
            Error::Watcher(_) => Some(Origin::Watch),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }
}

fn code_for_io_kind(kind: ErrorKind) -> ErrorCode {
    match kind {
        ErrorKind::NotFound => ErrorCode::NotFound,
        ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
        ErrorKind::InvalidInput => ErrorCode::InvalidArgument,
        _ => ErrorCode::Other,
    }
}
