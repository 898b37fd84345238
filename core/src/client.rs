//! The client façade.
//!
//! # Design
//! `Client` owns its configuration and its transport. `request` is the one
//! path through the pipeline: build the wire request, execute it with the TLS
//! fallback, split and parse the raw response, then shape it per the output
//! mode. The verb shortcuts only fill in the method.
//!
//! The transport is owned by the client and dropped with it. Option
//! validation in `from_options` runs before any transport exists.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::headers::HeaderMap;
use crate::http::{HttpMethod, RawResponse, RequestOptions};
use crate::normalize::OutputMode;
use crate::request::{build_request, make_headers};
use crate::response::ResponseParser;
use crate::transport::{execute_with_fallback, CancelToken, Transport, UreqTransport};

/// Result of one request: parsed headers, parsed body, HTTP status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub headers: HeaderMap,
    pub data: Value,
    pub status: u16,
}

impl Envelope {
    /// Render `data` as a nominal type.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        T::deserialize(&self.data).map_err(ClientError::Decode)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Synchronous JSON HTTP client.
pub struct Client {
    config: ClientConfig,
    transport: Box<dyn Transport>,
    cancel: CancelToken,
}

impl Client {
    /// Client backed by the native ureq transport.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Box::new(transport),
            cancel: CancelToken::new(),
        }
    }

    /// Validate a JSON option object and build a client from it.
    pub fn from_options(options: &Value) -> Result<Self, ClientError> {
        Ok(Self::new(ClientConfig::from_options(options)?))
    }

    /// Replace the cancellation token; clones of `cancel` can stop this client.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn output(&self) -> OutputMode {
        self.config.output
    }

    pub fn is_object(&self) -> bool {
        self.config.output.is_object()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.config.headers
    }

    /// Replace the whole default header set.
    pub fn set_headers(&mut self, headers: HeaderMap) {
        self.config.headers = headers;
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.config.headers.insert(key, value);
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.config.headers.get(key)
    }

    pub fn remove_header(&mut self, key: &str) {
        self.config.headers.remove(key);
    }

    /// Default headers merged with `extra`, formatted as wire lines.
    pub fn make_headers(&self, extra: &HeaderMap) -> Vec<String> {
        make_headers(&self.config.headers, extra)
    }

    pub fn get(&self, endpoint: &str, options: RequestOptions) -> Result<Envelope, ClientError> {
        self.request(endpoint, options.method(HttpMethod::Get))
    }

    pub fn post(&self, endpoint: &str, options: RequestOptions) -> Result<Envelope, ClientError> {
        self.request(endpoint, options.method(HttpMethod::Post))
    }

    pub fn put(&self, endpoint: &str, options: RequestOptions) -> Result<Envelope, ClientError> {
        self.request(endpoint, options.method(HttpMethod::Put))
    }

    pub fn patch(&self, endpoint: &str, options: RequestOptions) -> Result<Envelope, ClientError> {
        self.request(endpoint, options.method(HttpMethod::Patch))
    }

    pub fn delete(&self, endpoint: &str, options: RequestOptions) -> Result<Envelope, ClientError> {
        self.request(endpoint, options.method(HttpMethod::Delete))
    }

    /// Send a request and parse the response into an `Envelope`.
    ///
    /// 4xx/5xx responses come back as envelopes; only a failed exchange
    /// (after the TLS fallback) is an error.
    pub fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Envelope, ClientError> {
        let wire = build_request(&self.config, endpoint, &options)?;
        tracing::debug!(method = %wire.method, url = %wire.url, "sending request");

        let exchange = execute_with_fallback(self.transport.as_ref(), &wire, &self.cancel)?;
        let raw = RawResponse::from_exchange(&exchange);

        let (headers, data) = ResponseParser::new(self.config.output).parse(&raw);
        let status = if raw.status == 0 { 200 } else { raw.status };
        tracing::debug!(method = %wire.method, url = %wire.url, status, "request completed");

        Ok(Envelope {
            headers,
            data,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::{ConfigError, TransportError};
    use crate::http::RawExchange;
    use crate::transport::tests::{exchange, fail, ScriptedTransport};
    use serde::Deserialize;
    use serde_json::json;

    const BASE_URL: &str = "https://jsonplaceholder.typicode.com/posts";
    const HEAD: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json; charset=utf-8\r\nX-Powered-By: Express\r\n\r\n";

    type Outcome = Result<RawExchange, TransportError>;

    fn client(output: OutputMode, outcomes: Vec<Outcome>) -> (Client, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(outcomes));
        let config = ClientConfig::new(BASE_URL).with_output(output);
        (Client::with_transport(config, transport.clone()), transport)
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Post {
        id: u64,
        user_id: u64,
        title: String,
    }

    #[test]
    fn get_as_map() {
        let body = r#"{"userId": 1, "id": 1, "title": "sunt aut facere", "created_at": "x"}"#;
        let (client, transport) = client(OutputMode::Map, vec![Ok(exchange(HEAD, body, 200))]);
        let envelope = client.get("1", RequestOptions::new()).unwrap();

        assert_eq!(envelope.status, 200);
        assert_eq!(envelope.data["title"], "sunt aut facere");
        assert_eq!(envelope.data["created_at"], "x");
        assert_eq!(envelope.headers.get("content-type"), Some("application/json; charset=utf-8"));
        assert_eq!(envelope.headers.get("x-powered-by"), Some("express"));

        let attempts = transport.attempts.lock().unwrap();
        let (wire, verify) = &attempts[0];
        assert_eq!(wire.url, format!("{BASE_URL}/1"));
        assert_eq!(wire.method, HttpMethod::Get);
        assert!(*verify);
    }

    #[test]
    fn get_as_object() {
        let body = r#"{"userId": 1, "id": 1, "title": "sunt aut facere", "created_at": "x"}"#;
        let (client, _) = client(OutputMode::Object, vec![Ok(exchange(HEAD, body, 200))]);
        let envelope = client.get("/1/", RequestOptions::new()).unwrap();

        assert_eq!(envelope.data["createdAt"], "x");
        assert_eq!(envelope.headers.get("xPoweredBy"), Some("express"));
        let post: Post = envelope.data_as().unwrap();
        assert_eq!(post.id, 1);
        assert_eq!(post.user_id, 1);
        assert_eq!(post.title, "sunt aut facere");
    }

    #[test]
    fn post_forces_json_and_serializes_data() {
        let body = r#"{"title":"foo","body":"bar","userId":1,"id":101}"#;
        let (client, transport) = client(OutputMode::Map, vec![Ok(exchange(HEAD, body, 201))]);
        let options = RequestOptions::new()
            .header("Content-Type", "text/plain")
            .data(json!({ "title": "foo", "body": "bar", "userId": 1 }));
        let envelope = client.post("", options).unwrap();

        assert_eq!(envelope.status, 201);
        assert_eq!(envelope.data["body"], "bar");
        let attempts = transport.attempts.lock().unwrap();
        let (wire, _) = &attempts[0];
        assert_eq!(wire.url, BASE_URL);
        assert_eq!(wire.method, HttpMethod::Post);
        assert_eq!(wire.header_lines, vec!["Content-Type: application/json"]);
        assert_eq!(wire.body, r#"{"title":"foo","body":"bar","userId":1}"#);
    }

    #[test]
    fn verb_shortcuts_set_method() {
        let ok = || Ok(exchange("\r\n", "{}", 200));
        let (client, transport) = client(OutputMode::Map, vec![ok(), ok(), ok(), ok(), ok()]);
        client.get("1", RequestOptions::new()).unwrap();
        client.post("1", RequestOptions::new()).unwrap();
        client.put("1", RequestOptions::new()).unwrap();
        client.patch("1", RequestOptions::new()).unwrap();
        client.delete("1", RequestOptions::new().method(HttpMethod::Post)).unwrap();

        let methods: Vec<_> = transport
            .attempts
            .lock()
            .unwrap()
            .iter()
            .map(|(wire, _)| wire.method)
            .collect();
        assert_eq!(
            methods,
            vec![
                HttpMethod::Get,
                HttpMethod::Post,
                HttpMethod::Put,
                HttpMethod::Patch,
                HttpMethod::Delete
            ]
        );
    }

    #[test]
    fn delete_with_empty_body_yields_empty_data() {
        let (client, _) = client(OutputMode::Map, vec![Ok(exchange(HEAD, "", 200))]);
        let envelope = client.delete("1", RequestOptions::new()).unwrap();
        assert_eq!(envelope.data, json!({}));
    }

    #[test]
    fn http_errors_are_envelopes() {
        let (client, _) = client(OutputMode::Object, vec![Ok(exchange(HEAD, "{}", 404))]);
        let envelope = client.get("999", RequestOptions::new()).unwrap();
        assert_eq!(envelope.status, 404);
        assert!(!envelope.is_success());
    }

    #[test]
    fn missing_status_defaults_to_200() {
        let (client, _) = client(OutputMode::Object, vec![Ok(exchange("\r\n", "{}", 0))]);
        assert_eq!(client.get("1", RequestOptions::new()).unwrap().status, 200);
    }

    #[test]
    fn tls_fallback_success_returns_envelope() {
        let (client, transport) = client(
            OutputMode::Object,
            vec![Err(fail("invalid peer certificate", 0)), Ok(exchange(HEAD, r#"{"id":1}"#, 200))],
        );
        let envelope = client.get("1", RequestOptions::new()).unwrap();
        assert_eq!(envelope.data["id"], 1);
        assert_eq!(transport.verify_flags(), vec![true, false]);
    }

    #[test]
    fn double_failure_is_transport_error() {
        let (client, _) = client(
            OutputMode::Object,
            vec![Err(fail("tls", 0)), Err(fail("dns failure", 0))],
        );
        let err = client.get("1", RequestOptions::new()).unwrap_err();
        match err {
            ClientError::Transport(e) => {
                assert_eq!(e.message, "dns failure");
                assert_eq!(e.status, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cancelled_client_does_not_send() {
        let (client, transport) = client(OutputMode::Object, vec![Ok(exchange("\r\n", "{}", 200))]);
        let cancel = CancelToken::new();
        let client = client.with_cancel_token(cancel.clone());
        cancel.cancel();
        assert!(matches!(
            client.get("1", RequestOptions::new()),
            Err(ClientError::Transport(_))
        ));
        assert!(transport.verify_flags().is_empty());
    }

    #[test]
    fn header_mutators_are_consistent() {
        let (mut client, _) = client(OutputMode::Map, Vec::new());
        client.set_header("X", "1");
        assert_eq!(client.get_header("X"), Some("1"));
        client.remove_header("X");
        assert_eq!(client.get_header("X"), None);
        assert_eq!(client.get_header("Unknown"), None);
    }

    #[test]
    fn set_headers_replaces_everything() {
        let (mut client, _) = client(OutputMode::Map, Vec::new());
        client.set_headers(HeaderMap::from([("Accept", "application/json")]));
        assert_eq!(client.get_header("Accept"), Some("application/json"));
        assert_eq!(client.get_header("Content-Type"), None);
        assert_eq!(client.make_headers(&HeaderMap::new()), vec!["Accept: application/json"]);
    }

    #[test]
    fn make_headers_merges_defaults_and_extra() {
        let (client, _) = client(OutputMode::Map, Vec::new());
        let lines = client.make_headers(&HeaderMap::from([
            ("Content-Type", "text/html"),
            ("Accept", "application/json"),
        ]));
        assert_eq!(lines, vec!["Content-Type: text/html", "Accept: application/json"]);
    }

    #[test]
    fn default_headers_are_sent() {
        let (mut client, transport) = client(OutputMode::Map, vec![Ok(exchange("\r\n", "{}", 200))]);
        client.set_header("accept", "application/json");
        client.get("1", RequestOptions::new()).unwrap();
        let attempts = transport.attempts.lock().unwrap();
        assert_eq!(
            attempts[0].0.header_lines,
            vec!["Content-Type: application/json", "Accept: application/json"]
        );
    }

    #[test]
    fn from_options_rejects_bad_types() {
        let err = Client::from_options(&json!({ "object": 1 })).err().unwrap();
        assert!(matches!(err, ClientError::Config(ConfigError::ObjectNotBool)));
    }

    #[test]
    fn from_options_builds_client() {
        let client = Client::from_options(&json!({ "baseUrl": BASE_URL, "object": false })).unwrap();
        assert_eq!(client.base_url(), BASE_URL);
        assert!(!client.is_object());
        assert_eq!(client.output(), OutputMode::Map);
    }

    #[test]
    fn data_as_reports_shape_mismatch() {
        let envelope = Envelope {
            headers: HeaderMap::new(),
            data: json!({ "id": "not a number" }),
            status: 200,
        };
        assert!(matches!(envelope.data_as::<Post>(), Err(ClientError::Decode(_))));
    }
}
