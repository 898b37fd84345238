//! Decoding raw responses into headers and a JSON body.
//!
//! # Design
//! Neither step can fail. Header lines without a colon are skipped and a body
//! that is empty or not JSON decodes to an empty object, so a request that
//! completed at the transport level always yields an envelope.

use serde_json::{Map, Value};

use crate::headers::HeaderMap;
use crate::http::RawResponse;
use crate::normalize::{normalize_body, normalize_headers, OutputMode};

/// Parse a CR-delimited header block into lower-cased name/value pairs.
///
/// The status line and the blank terminator carry no usable colon and are
/// dropped. A repeated header overwrites the earlier value in place.
pub fn parse_headers(block: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for line in block.split('\r') {
        // A colon at index 0 leaves no name to key on.
        let Some(colon) = line.find(':').filter(|&i| i > 0) else {
            continue;
        };
        let key = line[..colon].trim().to_lowercase();
        let value = line[colon + 1..].trim().to_lowercase();
        if !key.is_empty() {
            headers.insert(key, value);
        }
    }
    headers
}

/// Decode a JSON body. Empty or malformed input yields `{}`.
pub fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Object(Map::new());
    }
    match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "response body is not JSON, using an empty object");
            Value::Object(Map::new())
        }
    }
}

/// Parser bound to one output mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser {
    output: OutputMode,
}

impl ResponseParser {
    pub fn new(output: OutputMode) -> Self {
        Self { output }
    }

    pub fn headers(&self, block: &str) -> HeaderMap {
        normalize_headers(parse_headers(block), self.output)
    }

    pub fn body(&self, body: &str) -> Value {
        normalize_body(parse_body(body), self.output)
    }

    /// Parse both halves of a raw response.
    pub fn parse(&self, raw: &RawResponse) -> (HeaderMap, Value) {
        (self.headers(&raw.header_block), self.body(&raw.body))
    }
}
