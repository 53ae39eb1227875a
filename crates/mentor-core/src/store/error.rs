//! Tagged failures reported by document store adapters.

use thiserror::Error;

/// The closed set of failure classes a [`DocumentStore`](super::DocumentStore)
/// adapter may report.
///
/// Adapters map their vendor responses onto these kinds once; gateway code
/// decides its fallback policy from the kind alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// The query needs a server-side composite index that does not exist (yet).
    FailedPrecondition,
    /// The caller is not allowed to read or write the document.
    PermissionDenied,
    /// The store is unreachable, overloaded, or timed out.
    Unavailable,
    /// The addressed document does not exist.
    NotFound,
    /// The request was rejected as malformed.
    InvalidArgument,
    /// Anything else.
    Other,
}

impl StoreErrorKind {
    /// Returns a short stable label, used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailedPrecondition => "failed-precondition",
            Self::PermissionDenied => "permission-denied",
            Self::Unavailable => "unavailable",
            Self::NotFound => "not-found",
            Self::InvalidArgument => "invalid-argument",
            Self::Other => "other",
        }
    }
}

/// A classified document store failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Store error ({}): {message}", .kind.as_str())]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::FailedPrecondition, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::PermissionDenied, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unavailable, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, message)
    }

    pub fn is_failed_precondition(&self) -> bool {
        self.kind == StoreErrorKind::FailedPrecondition
    }

    pub fn is_permission_denied(&self) -> bool {
        self.kind == StoreErrorKind::PermissionDenied
    }
}

/// Result alias used by store adapters.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
