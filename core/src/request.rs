//! Turning client configuration and per-call options into a `WireRequest`.

use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::RequestError;
use crate::headers::{title_case, HeaderMap};
use crate::http::{RequestOptions, WireRequest};

/// Join the base URL and an endpoint.
///
/// The endpoint loses its leading and trailing slashes; the joined URL loses
/// trailing slashes again. An empty base URL leaves the endpoint on its own.
pub fn join_url(base_url: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim_matches('/');
    let url = if base_url.is_empty() {
        endpoint.to_string()
    } else {
        format!("{}/{endpoint}", base_url.trim_end_matches('/'))
    };
    url.trim_end_matches('/').to_string()
}

/// Merge default and per-call headers into `"Key: value"` lines.
///
/// Keys are title-cased before they are compared, so `content-type` in the
/// call replaces `Content-Type` from the defaults in its original position.
pub fn make_headers(defaults: &HeaderMap, extra: &HeaderMap) -> Vec<String> {
    let mut merged = HeaderMap::new();
    for (key, value) in defaults.iter().chain(extra.iter()) {
        merged.insert(title_case(key), value);
    }
    merged
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect()
}

/// Serialize the payload; no payload becomes `{}`.
pub fn serialize_body(data: Option<&Value>) -> Result<String, RequestError> {
    match data {
        Some(value) => Ok(serde_json::to_string(value)?),
        None => Ok("{}".to_string()),
    }
}

/// Build the wire request for one call.
pub fn build_request(
    config: &ClientConfig,
    endpoint: &str,
    options: &RequestOptions,
) -> Result<WireRequest, RequestError> {
    let method = options.method;

    let mut call_headers = options.headers.clone();
    if method.forces_json_content_type() {
        // Drop any spelling of the caller's content type before forcing ours.
        let existing: Vec<String> = call_headers
            .keys()
            .filter(|k| title_case(k) == "Content-Type")
            .map(str::to_string)
            .collect();
        for key in existing {
            call_headers.remove(&key);
        }
        call_headers.insert("Content-Type", "application/json");
    }

    Ok(WireRequest {
        url: join_url(&config.base_url, endpoint),
        method,
        header_lines: make_headers(&config.headers, &call_headers),
        body: serialize_body(options.data.as_ref())?,
    })
}
