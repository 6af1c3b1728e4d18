//! Typed error enums for the router's codec and registration boundaries.
//!
//! Protocol-level failures (404/403/400, malformed frames) are not
//! represented here: per the error handling design, those are always
//! surfaced as reply envelopes or silently dropped, never as a `Result`
//! crossing a public API boundary.

use thiserror::Error;

/// Errors raised while parsing or emitting a wire envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The byte slice is not valid JSON, or is missing a required field.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The envelope has both a `method` and a `result`/`error` body.
    #[error("envelope has both a method and a result/error body")]
    ConflictingBody,
}

/// Errors raised by router-level registration operations.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A handler is already registered for this method name.
    #[error("a handler is already registered for method {0:?}")]
    DuplicateHandler(String),
    /// The envelope for this operation could not be built.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
