//! Error types for the todo API client.
//!
//! # Design
//! `ApiError` covers the three ways a round-trip can fail: the transport
//! gave up, the server answered with a non-2xx status, or the body did not
//! have the expected shape. `NotFound` is split out of the status family
//! because callers of the per-item endpoints want to tell it apart.

use thiserror::Error;

/// Errors raised by a `Transport` while executing a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    Request(String),

    /// A response arrived but its body could not be read.
    #[error("reading response body failed: {0}")]
    Body(String),
}

/// Errors returned by `TodoClient` parse methods and by the list component.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}
