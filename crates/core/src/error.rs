//! Unified error type for item-sync
//!
//! Covers `BadToken`, `BadRequest`, `ReadOnly`, `ConflictingItem`,
//! `Transient` (retry-safe), `Fatal`. Save-loop errors on a single item
//! never surface through this type — they become
//! [`crate::item::ItemConflict`] entries instead. This type is for
//! everything else: token decoding, request-shape validation, and
//! repository/collaborator failures.

use thiserror::Error;

/// Result alias for item-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for item-sync operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A sync or cursor token failed to decode. Callers should restart the
    /// sync with no token.
    #[error("bad sync token: {0}")]
    BadToken(String),

    /// The request shape itself was invalid (e.g. a malformed item hash).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The session only has read-only access; writes were rejected.
    #[error("read-only access")]
    ReadOnly,

    /// A single item could not be saved due to a conflict. Carries the same
    /// classification as [`crate::item::ConflictKind`] for callers that
    /// only have this error type to inspect.
    #[error("conflicting item: {0}")]
    ConflictingItem(String),

    /// A retry-safe failure in a collaborator (repository, event publisher,
    /// shared-vault lookup).
    #[error("transient failure: {0}")]
    Transient(String),

    /// A non-retryable failure.
    #[error("fatal error: {0}")]
    Fatal(String),
}

impl Error {
    /// Construct a `BadToken` error.
    pub fn bad_token(message: impl Into<String>) -> Self {
        Error::BadToken(message.into())
    }

    /// Construct a `BadRequest` error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest(message.into())
    }

    /// Construct a `Transient` error.
    pub fn transient(message: impl Into<String>) -> Self {
        Error::Transient(message.into())
    }

    /// Construct a `Fatal` error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Error::Fatal(message.into())
    }

    /// True if the caller may retry the same operation unmodified.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient(_))
    }

    /// True if the error indicates a bug or unrecoverable state, rather
    /// than bad input or a transient collaborator failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }

    /// True if the caller should restart sync with no token.
    pub fn is_bad_token(&self) -> bool {
        matches!(self, Error::BadToken(_))
    }

    /// True if a single item was rejected due to a conflict, as opposed to
    /// the request as a whole failing.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ConflictingItem(_))
    }
}
