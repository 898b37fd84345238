//! Error types for the burrow client.
//!
//! # Design
//! Each stage of the pipeline has its own error enum so callers can tell a
//! bad construction option from a failed exchange. `ClientError` is what
//! `Client::request` returns and wraps the per-stage errors.
//!
//! HTTP 4xx/5xx responses are deliberately absent: they come back as normal
//! envelopes and the caller branches on `Envelope::status`.

use thiserror::Error;

/// Invalid construction options passed to `ClientConfig::from_options`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("client options must be a JSON object")]
    OptionsNotObject,

    #[error("`baseUrl` must be a string")]
    BaseUrlNotString,

    #[error("`object` must be a boolean")]
    ObjectNotBool,

    #[error("`headers` must be an object")]
    HeadersNotMap,

    #[error("header `{key}` must have a string value")]
    HeaderValueNotString { key: String },

    #[error("`timeoutMs` must be a non-negative integer")]
    TimeoutNotInteger,
}

/// Raised when both the primary attempt and the TLS fallback fail.
///
/// `status` is the last HTTP status observed, 0 when no response arrived.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("HTTP transport failed (status {status}): {message}")]
pub struct TransportError {
    pub message: String,
    pub status: u16,
}

/// Failures while turning options into a wire request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("unsupported HTTP method '{0}', expected one of GET, POST, PUT, PATCH, DELETE")]
    UnsupportedMethod(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned by `Client` operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The envelope data could not be rendered into the requested type.
    #[error("deserialization failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Argument checks performed by the read-only collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("page number must be greater than 0")]
    InvalidPage,

    #[error("id cannot be empty")]
    EmptyId,

    #[error("id {0:?} may only contain ASCII letters, digits, '-' and '_'")]
    InvalidId(String),
}
