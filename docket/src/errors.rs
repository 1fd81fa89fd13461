use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::{atomic, Atomic};

/// Error kinds for Docket operations.
///
/// The first group describes what the access layer was doing when it failed
/// (`BackendRead`, `BackendWrite`). The second group describes what the
/// backend reported; those kinds usually sit in the cause chain and decide
/// whether the failure is worth retrying (see [FaultClass]).
///
/// # Examples
///
/// ```rust,ignore
/// use docket::errors::{DocketError, ErrorKind, DocketResult};
///
/// fn example() -> DocketResult<()> {
///     Err(DocketError::new("Collection name cannot be empty", ErrorKind::InvalidCollectionName))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Access layer errors - the operation that failed
    /// A read (get, get_all, subscribe) failed in the backend
    BackendRead,
    /// A write (create, update, delete, batch, field removal) failed in the backend
    BackendWrite,

    // Backend fault kinds - reported by the document store or blob store
    /// The backend could not be reached
    Unavailable,
    /// The backend did not answer in time
    Timeout,
    /// The caller is not allowed to perform the operation
    PermissionDenied,
    /// A backend quota or rate limit was hit
    QuotaExceeded,
    /// The backend aborted the operation because of contention
    Aborted,
    /// The backend rejected the request as malformed
    InvalidArgument,

    // Validation errors
    /// Generic validation error
    ValidationError,
    /// Invalid collection name or path
    InvalidCollectionName,
    /// Invalid field name
    InvalidFieldName,
    /// Local edits conflict with a remote change that has not been resolved
    Conflict,

    // Data encoding errors - import/export and value conversion
    /// Error encoding or decoding data
    EncodingError,

    // Blob storage errors
    /// Upload or download URL retrieval failed
    StorageError,

    // Lifecycle errors
    /// The client has been closed
    ClientClosed,
    /// The store has not been opened
    StoreNotInitialized,
    /// The store has already been closed
    StoreAlreadyClosed,

    // Event errors
    /// Error in event processing
    EventError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl ErrorKind {
    /// Returns the fault class of this kind when it is the root cause of a failure.
    pub fn fault_class(&self) -> FaultClass {
        match self {
            ErrorKind::Unavailable
            | ErrorKind::Timeout
            | ErrorKind::Aborted
            | ErrorKind::QuotaExceeded => FaultClass::Transient,
            _ => FaultClass::Permanent,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::BackendRead => write!(f, "Backend read error"),
            ErrorKind::BackendWrite => write!(f, "Backend write error"),
            ErrorKind::Unavailable => write!(f, "Backend unavailable"),
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::QuotaExceeded => write!(f, "Quota exceeded"),
            ErrorKind::Aborted => write!(f, "Aborted"),
            ErrorKind::InvalidArgument => write!(f, "Invalid argument"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::InvalidCollectionName => write!(f, "Invalid collection name"),
            ErrorKind::InvalidFieldName => write!(f, "Invalid field name"),
            ErrorKind::Conflict => write!(f, "Unresolved conflict"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::StorageError => write!(f, "Storage error"),
            ErrorKind::ClientClosed => write!(f, "Client closed"),
            ErrorKind::StoreNotInitialized => write!(f, "Store not initialized"),
            ErrorKind::StoreAlreadyClosed => write!(f, "Store already closed"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Whether a failure may succeed if the same request is issued again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Network, timeout, contention or quota failures
    Transient,
    /// Permission, validation and malformed-data failures
    Permanent,
}

/// Progress of a chunked batch write at the moment one chunk failed.
///
/// Chunks before `failed_chunk` are committed and stay committed; the batch
/// write is atomic per chunk only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Zero-based index of the chunk whose commit failed
    pub failed_chunk: usize,
    /// Total number of chunks the input was split into
    pub total_chunks: usize,
    /// Ids of the documents written by the committed chunks
    pub committed_ids: Vec<String>,
}

impl BatchFailure {
    /// Number of chunks that were committed before the failure.
    pub fn committed_chunks(&self) -> usize {
        self.failed_chunk
    }
}

/// Custom Docket error type.
///
/// `DocketError` carries a message, an [ErrorKind], an optional cause and a
/// captured backtrace. Access layer failures wrap the backend fault as the
/// cause so that [DocketError::fault_class] can look at the root.
///
/// # Examples
///
/// ```rust,ignore
/// use docket::errors::{DocketError, ErrorKind};
///
/// let cause = DocketError::new("connection reset", ErrorKind::Unavailable);
/// let err = DocketError::new_with_cause("Failed to add document to 'Lists'", ErrorKind::BackendWrite, cause);
/// assert!(err.is_retryable());
/// ```
#[derive(Clone)]
pub struct DocketError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<DocketError>>,
    batch_failure: Option<BatchFailure>,
    backtrace: Atomic<Backtrace>,
}

impl DocketError {
    /// Creates a new `DocketError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        DocketError {
            message: message.to_string(),
            error_kind,
            cause: None,
            batch_failure: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `DocketError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for debugging
    /// and for fault classification.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: DocketError) -> Self {
        DocketError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            batch_failure: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Attaches batch progress to this error.
    pub fn with_batch_failure(mut self, batch_failure: BatchFailure) -> Self {
        self.batch_failure = Some(batch_failure);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&DocketError> {
        self.cause.as_deref()
    }

    pub fn batch_failure(&self) -> Option<&BatchFailure> {
        self.batch_failure.as_ref()
    }

    /// Returns the innermost error of the cause chain, or `self` when there is none.
    pub fn root_cause(&self) -> &DocketError {
        let mut current = self;
        while let Some(cause) = current.cause() {
            current = cause;
        }
        current
    }

    /// Classifies the failure by the kind of its root cause.
    pub fn fault_class(&self) -> FaultClass {
        self.root_cause().kind().fault_class()
    }

    /// Returns true when reissuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.fault_class() == FaultClass::Transient
    }
}

impl Display for DocketError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for DocketError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for DocketError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for Docket operations.
pub type DocketResult<T> = Result<T, DocketError>;

impl From<std::io::Error> for DocketError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => ErrorKind::Unavailable,
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::InvalidInput => {
                ErrorKind::EncodingError
            }
            _ => ErrorKind::InternalError,
        };
        DocketError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<serde_json::Error> for DocketError {
    fn from(err: serde_json::Error) -> Self {
        DocketError::new(&format!("JSON error: {}", err), ErrorKind::EncodingError)
    }
}

impl From<csv::Error> for DocketError {
    fn from(err: csv::Error) -> Self {
        DocketError::new(&format!("CSV error: {}", err), ErrorKind::EncodingError)
    }
}

impl From<std::string::FromUtf8Error> for DocketError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        DocketError::new(
            &format!("UTF-8 encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<String> for DocketError {
    fn from(msg: String) -> Self {
        DocketError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for DocketError {
    fn from(msg: &str) -> Self {
        DocketError::new(msg, ErrorKind::InternalError)
    }
}
