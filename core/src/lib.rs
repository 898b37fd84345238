//! Synchronous JSON HTTP client core.
//!
//! # Overview
//! A request flows through four stages: `request` builds a `WireRequest` from
//! the client configuration and per-call options, `transport` executes it
//! (retrying once without TLS verification if the exchange fails), `response`
//! splits and decodes the raw response, and `normalize` rewrites keys to
//! camel case when the client is in object mode. `Client` ties them together
//! and returns an `Envelope` of headers, data and status.
//!
//! # Design
//! - Parsed data is always a `serde_json::Value`; `Envelope::data_as` renders
//!   it into a caller-defined struct when static fields are wanted.
//! - `Transport` is a trait so tests and embedders can supply their own;
//!   `UreqTransport` is the default.
//! - HTTP error statuses are data, not errors. Only a failed exchange is.
//! - The library logs through `tracing` and installs no subscriber.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod lobsters;
pub mod normalize;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{Client, Envelope};
pub use config::ClientConfig;
pub use error::{ClientError, ConfigError, RequestError, TransportError, ValidationError};
pub use headers::HeaderMap;
pub use http::{HttpMethod, RawExchange, RawResponse, RequestOptions, WireRequest};
pub use lobsters::{Item, Lobsters, LobstersError};
pub use normalize::{camel_case_keys, to_camel_case, to_object, OutputMode};
pub use response::ResponseParser;
pub use transport::{execute_with_fallback, CancelToken, Transport, UreqTransport};
