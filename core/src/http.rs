//! HTTP request and response types described as plain data.
//!
//! # Design
//! The pipeline passes owned values between stages: `RequestOptions` goes in,
//! the builder produces a `WireRequest`, the transport reports a
//! `RawExchange`, and the parser works on the `RawResponse` split out of it.
//! None of these outlive a single `Client::request` call.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::RequestError;
use crate::headers::HeaderMap;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Mutating verbs always carry a JSON content type.
    pub fn forces_json_content_type(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl FromStr for HttpMethod {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(RequestError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call options for `Client::request`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: HeaderMap,
    pub data: Option<Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A fully resolved, transport-ready request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub url: String,
    pub method: HttpMethod,
    /// `"Key: value"` lines in merge order.
    pub header_lines: Vec<String>,
    /// JSON text; `{}` when the call supplied no data.
    pub body: String,
}

impl WireRequest {
    /// Header lines split back into name/value pairs for transports that
    /// take them separately.
    pub fn header_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header_lines.iter().filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim(), value.trim()))
        })
    }
}

/// What a transport reports for one completed exchange.
///
/// `bytes` holds the header block followed by the body; `header_len` is the
/// byte length of the header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawExchange {
    pub bytes: Vec<u8>,
    pub header_len: usize,
    pub status: u16,
}

/// Raw response split into its header block and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub header_block: String,
    pub body: String,
    pub status: u16,
}

impl RawResponse {
    /// Split an exchange at the reported header length. A length beyond the
    /// buffer is clamped to it.
    pub fn from_exchange(exchange: &RawExchange) -> Self {
        let split = exchange.header_len.min(exchange.bytes.len());
        let (head, body) = exchange.bytes.split_at(split);
        Self {
            header_block: String::from_utf8_lossy(head).into_owned(),
            body: String::from_utf8_lossy(body).into_owned(),
            status: exchange.status,
        }
    }
}
