//! Client configuration.
//!
//! # Design
//! `ClientConfig` is the typed form. `from_options` accepts the loosely typed
//! JSON option object (`baseUrl`, `object`, `headers`, `timeoutMs`) and
//! rejects wrong types field by field, so a bad option never produces a
//! partially usable client.

use std::time::Duration;

use serde_json::Value;

use crate::error::ConfigError;
use crate::headers::HeaderMap;
use crate::normalize::OutputMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix joined with every endpoint. Empty means endpoints are full URLs.
    pub base_url: String,
    pub output: OutputMode,
    /// Default headers sent with every request.
    pub headers: HeaderMap,
    /// Per-request timeout; `None` leaves the transport's own defaults.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            output: OutputMode::Object,
            headers: HeaderMap::json_default(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate a JSON option object. Missing or `null` fields use defaults.
    pub fn from_options(options: &Value) -> Result<Self, ConfigError> {
        let options = match options {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            _ => return Err(ConfigError::OptionsNotObject),
        };
        let field = |name: &str| options.get(name).filter(|v| !v.is_null());

        let mut config = Self::default();

        if let Some(base_url) = field("baseUrl") {
            config.base_url = base_url
                .as_str()
                .ok_or(ConfigError::BaseUrlNotString)?
                .to_string();
        }

        if let Some(object) = field("object").or_else(|| field("outputAsObject")) {
            let object = object.as_bool().ok_or(ConfigError::ObjectNotBool)?;
            config.output = OutputMode::from_object_flag(object);
        }

        if let Some(headers) = field("headers") {
            let headers = headers.as_object().ok_or(ConfigError::HeadersNotMap)?;
            let mut parsed = HeaderMap::new();
            for (key, value) in headers {
                let value = value
                    .as_str()
                    .ok_or_else(|| ConfigError::HeaderValueNotString { key: key.clone() })?;
                parsed.insert(key.as_str(), value);
            }
            config.headers = parsed;
        }

        if let Some(timeout) = field("timeoutMs") {
            let millis = timeout.as_u64().ok_or(ConfigError::TimeoutNotInteger)?;
            config.timeout = Some(Duration::from_millis(millis));
        }

        Ok(config)
    }
}
