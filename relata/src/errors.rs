use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

use crate::collection::Document;

/// Error kinds for relata operations.
///
/// Each kind names one category of failure so callers can branch on
/// [`RelataError::kind`] instead of parsing messages.
///
/// # Examples
///
/// ```rust
/// use relata::errors::{ErrorKind, RelataError, RelataResult};
///
/// fn example() -> RelataResult<()> {
///     Err(RelataError::new("field is required", ErrorKind::InvalidArgument))
/// }
///
/// assert_eq!(example().unwrap_err().kind(), &ErrorKind::InvalidArgument);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// An item lacks the configured primary key field
    MissingKey,
    /// One or more items of a `put` could not be persisted
    SaveFailed,
    /// A query tree is malformed (missing field, bad arity, unknown operator)
    InvalidQuery,
    /// An argument passed to an operation is not acceptable
    InvalidArgument,
    /// The storage adapter failed or refused the operation
    StorageError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::MissingKey => write!(f, "Missing key"),
            ErrorKind::SaveFailed => write!(f, "Save failed"),
            ErrorKind::InvalidQuery => write!(f, "Invalid query"),
            ErrorKind::InvalidArgument => write!(f, "Invalid argument"),
            ErrorKind::StorageError => write!(f, "Storage error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// The saved/failed split reported by a failed `put`.
///
/// Items in `saved` were written and stay written; items in `failed` were not.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SavePartition {
    saved: Vec<Document>,
    failed: Vec<Document>,
}

impl SavePartition {
    pub fn new(saved: Vec<Document>, failed: Vec<Document>) -> Self {
        SavePartition { saved, failed }
    }

    pub fn saved(&self) -> &[Document] {
        &self.saved
    }

    pub fn failed(&self) -> &[Document] {
        &self.failed
    }
}

/// Custom relata error type.
///
/// `RelataError` carries a message, a kind, an optional cause and, for
/// [`ErrorKind::SaveFailed`], the [`SavePartition`] needed to resume or
/// report a partial batch precisely.
///
/// # Examples
///
/// ```rust
/// use relata::errors::{ErrorKind, RelataError};
///
/// let cause = RelataError::new("disk unplugged", ErrorKind::StorageError);
/// let err = RelataError::new_with_cause("write failed", ErrorKind::StorageError, cause);
/// assert!(err.cause().is_some());
/// ```
#[derive(Clone)]
pub struct RelataError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<RelataError>>,
    partition: Option<Box<SavePartition>>,
    backtrace: Arc<Backtrace>,
}

impl RelataError {
    /// Creates a new `RelataError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        RelataError {
            message: message.to_string(),
            error_kind,
            cause: None,
            partition: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `RelataError` chained to the error that caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: RelataError) -> Self {
        RelataError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            partition: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a [`ErrorKind::SaveFailed`] error carrying the saved/failed split
    /// and the last underlying failure, if any.
    pub fn save_failed(
        saved: Vec<Document>,
        failed: Vec<Document>,
        cause: Option<RelataError>,
    ) -> Self {
        let message = match &cause {
            Some(cause) => format!("Error saving items! ({})", cause),
            None => "Error saving items!".to_string(),
        };
        RelataError {
            message,
            error_kind: ErrorKind::SaveFailed,
            cause: cause.map(Box::new),
            partition: Some(Box::new(SavePartition::new(saved, failed))),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&RelataError> {
        self.cause.as_deref()
    }

    /// The saved/failed split of a failed `put`, if this error carries one.
    pub fn partition(&self) -> Option<&SavePartition> {
        self.partition.as_deref()
    }
}

impl Display for RelataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for RelataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace),
        }
    }
}

impl Error for RelataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for relata operations.
pub type RelataResult<T> = Result<T, RelataError>;

impl From<std::fmt::Error> for RelataError {
    fn from(err: std::fmt::Error) -> Self {
        RelataError::new(
            &format!("Formatting error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<String> for RelataError {
    fn from(msg: String) -> Self {
        RelataError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for RelataError {
    fn from(msg: &str) -> Self {
        RelataError::new(msg, ErrorKind::InternalError)
    }
}
