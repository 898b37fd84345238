//! Key normalization for parsed responses.
//!
//! # Design
//! Response bodies and headers arrive with whatever key convention the server
//! uses (`content-type`, `comment_count`, `Test Header`). In object mode every
//! key is rewritten to lower camel case so callers see one convention.
//!
//! The rewrite is a pure transform over `serde_json::Value`: it consumes the
//! input and builds a new tree. With `serde_json`'s `preserve_order` feature
//! the renamed key lands in the same slot the original key occupied.

use serde_json::{Map, Value};

use crate::headers::HeaderMap;

/// How `Client::request` shapes parsed responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// camelCase every key, headers and body alike.
    #[default]
    Object,
    /// Leave the body as decoded and the headers lower-cased.
    Map,
}

impl OutputMode {
    pub fn from_object_flag(object: bool) -> Self {
        if object {
            OutputMode::Object
        } else {
            OutputMode::Map
        }
    }

    pub fn is_object(self) -> bool {
        self == OutputMode::Object
    }
}

/// All ASCII alphanumeric and not starting with an uppercase letter. A
/// leading digit counts, since lower-casing it is a no-op.
fn is_camel_case(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first.is_ascii_digit() => {
            chars.all(|c| c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

/// Convert an arbitrary key to lower camel case.
///
/// Runs of characters outside `[a-zA-Z0-9]` act as word separators and digits
/// count as word characters, so `text-123` becomes `text123`. Strings already
/// in camel case come back unchanged.
pub fn to_camel_case(s: &str) -> String {
    let s = s.trim();
    if s.is_empty() || is_camel_case(s) {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    for word in s
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let lower = word.to_ascii_lowercase();
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }

    let mut chars = out.chars();
    match chars.next() {
        Some(first) => {
            let mut camel = String::with_capacity(out.len());
            camel.push(first.to_ascii_lowercase());
            camel.push_str(chars.as_str());
            camel
        }
        None => out,
    }
}

/// Rewrite every map key at every depth with `to_camel_case`.
///
/// Arrays are walked so maps nested inside them are rewritten too; scalars
/// pass through. When two keys collapse to the same camel form the later
/// value wins and keeps the earlier slot.
pub fn camel_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(to_camel_case(&key), camel_case_keys(value));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(camel_case_keys).collect()),
        scalar => scalar,
    }
}

/// Prepare a decoded value for nominal rendering: keys are camelCased so a
/// `#[serde(rename_all = "camelCase")]` struct can be read out of it.
pub fn to_object(value: Value) -> Value {
    camel_case_keys(value)
}

/// Apply the output mode to a decoded body.
pub fn normalize_body(value: Value, mode: OutputMode) -> Value {
    match mode {
        OutputMode::Object => to_object(value),
        OutputMode::Map => value,
    }
}

/// Apply the output mode to parsed headers, which are already lower-cased.
pub fn normalize_headers(headers: HeaderMap, mode: OutputMode) -> HeaderMap {
    match mode {
        OutputMode::Object => headers
            .into_iter()
            .map(|(k, v)| (to_camel_case(&k), v))
            .collect(),
        OutputMode::Map => headers,
    }
}
