//! Executing wire requests.
//!
//! # Design
//! `Transport` performs exactly one exchange. The retry policy lives in
//! `execute_with_fallback`, outside any particular transport: when the first
//! attempt fails at the transport level it is repeated once with TLS
//! certificate verification disabled. HTTP error statuses are not failures
//! and are never retried.
//!
//! `UreqTransport` is the native implementation. ureq hands back parsed
//! headers rather than the raw header block, so the block is re-serialized
//! (status line, `Name: value` lines, blank line) and its byte length is
//! reported alongside the body, the same shape a curl-style transport gives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use ureq::tls::TlsConfig;
use ureq::{Agent, RequestBuilder};

use crate::error::TransportError;
use crate::http::{HttpMethod, RawExchange, WireRequest};

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: u32 = 20;

/// One HTTP exchange against the network.
pub trait Transport: Send + Sync {
    /// Execute `request`. `verify_tls` is false only on the fallback attempt.
    fn execute(&self, request: &WireRequest, verify_tls: bool) -> Result<RawExchange, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &WireRequest, verify_tls: bool) -> Result<RawExchange, TransportError> {
        (**self).execute(request, verify_tls)
    }
}

/// Shared flag that stops a client from starting new attempts.
///
/// An attempt already blocked in the transport runs to completion; the flag
/// is checked before the first attempt and before the fallback.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

fn cancelled(status: u16) -> TransportError {
    TransportError {
        message: "request cancelled".to_string(),
        status,
    }
}

/// Run `request`, retrying once without TLS verification on failure.
pub fn execute_with_fallback(
    transport: &dyn Transport,
    request: &WireRequest,
    cancel: &CancelToken,
) -> Result<RawExchange, TransportError> {
    if cancel.is_cancelled() {
        return Err(cancelled(0));
    }

    let first = match transport.execute(request, true) {
        Ok(exchange) => return Ok(exchange),
        Err(e) => e,
    };
    tracing::warn!(
        method = %request.method,
        url = %request.url,
        error = %first.message,
        "request failed, retrying with TLS verification disabled"
    );

    if cancel.is_cancelled() {
        return Err(cancelled(first.status));
    }

    transport.execute(request, false).map_err(|retry| {
        let status = if retry.status != 0 { retry.status } else { first.status };
        tracing::error!(
            method = %request.method,
            url = %request.url,
            status,
            error = %retry.message,
            "request failed after TLS fallback"
        );
        TransportError {
            message: retry.message,
            status,
        }
    })
}

/// Transport backed by a blocking `ureq` agent.
///
/// The verification-disabled agent is only built if a fallback happens.
pub struct UreqTransport {
    agent: Agent,
    insecure: OnceLock<Agent>,
    timeout: Option<Duration>,
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            agent: build_agent(timeout, true),
            insecure: OnceLock::new(),
            timeout,
        }
    }

    fn agent(&self, verify_tls: bool) -> &Agent {
        if verify_tls {
            &self.agent
        } else {
            self.insecure.get_or_init(|| build_agent(self.timeout, false))
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

fn build_agent(timeout: Option<Duration>, verify_tls: bool) -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .max_redirects(MAX_REDIRECTS)
        .timeout_global(timeout)
        .tls_config(
            TlsConfig::builder()
                .disable_verification(!verify_tls)
                .build(),
        )
        .build()
        .new_agent()
}

fn with_headers<B>(mut builder: RequestBuilder<B>, request: &WireRequest) -> RequestBuilder<B> {
    for (name, value) in request.header_pairs() {
        builder = builder.header(name, value);
    }
    builder
}

fn failure(e: ureq::Error) -> TransportError {
    let status = match &e {
        ureq::Error::StatusCode(code) => *code,
        _ => 0,
    };
    TransportError {
        message: e.to_string(),
        status,
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &WireRequest, verify_tls: bool) -> Result<RawExchange, TransportError> {
        let agent = self.agent(verify_tls);
        let url = request.url.as_str();
        let body = request.body.as_bytes();

        let result = match request.method {
            HttpMethod::Get => with_headers(agent.get(url), request).call(),
            HttpMethod::Delete => with_headers(agent.delete(url), request).call(),
            HttpMethod::Post => with_headers(agent.post(url), request).send(body),
            HttpMethod::Put => with_headers(agent.put(url), request).send(body),
            HttpMethod::Patch => with_headers(agent.patch(url), request).send(body),
        };
        let mut response = result.map_err(failure)?;

        let status = response.status().as_u16();
        let mut head = format!("{:?} {}\r\n", response.version(), response.status());
        for (name, value) in response.headers() {
            head.push_str(name.as_str());
            head.push_str(": ");
            head.push_str(&String::from_utf8_lossy(value.as_bytes()));
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let body = response.body_mut().read_to_vec().map_err(failure)?;
        tracing::debug!(status, bytes = body.len(), verify_tls, "response received");

        let header_len = head.len();
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&body);
        Ok(RawExchange {
            bytes,
            header_len,
            status,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Transport that replays a scripted sequence of outcomes and records
    /// the `verify_tls` flag of every attempt.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Result<RawExchange, TransportError>>>,
        pub(crate) attempts: Mutex<Vec<(WireRequest, bool)>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(outcomes: Vec<Result<RawExchange, TransportError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                attempts: Mutex::default(),
            }
        }

        pub(crate) fn verify_flags(&self) -> Vec<bool> {
            self.attempts.lock().unwrap().iter().map(|(_, v)| *v).collect()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: &WireRequest, verify_tls: bool) -> Result<RawExchange, TransportError> {
            self.attempts.lock().unwrap().push((request.clone(), verify_tls));
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(fail("script exhausted", 0)))
        }
    }

    pub(crate) fn exchange(head: &str, body: &str, status: u16) -> RawExchange {
        RawExchange {
            bytes: format!("{head}{body}").into_bytes(),
            header_len: head.len(),
            status,
        }
    }

    pub(crate) fn fail(message: &str, status: u16) -> TransportError {
        TransportError {
            message: message.to_string(),
            status,
        }
    }

    fn request() -> WireRequest {
        WireRequest {
            url: "https://self-signed.local/posts".to_string(),
            method: HttpMethod::Get,
            header_lines: Vec::new(),
            body: "{}".to_string(),
        }
    }

    #[test]
    fn success_needs_one_attempt() {
        let transport = ScriptedTransport::new(vec![Ok(exchange("X: 1\r\n\r\n", "{}", 200))]);
        let out = execute_with_fallback(&transport, &request(), &CancelToken::new()).unwrap();
        assert_eq!(out.status, 200);
        assert_eq!(transport.verify_flags(), vec![true]);
    }

    #[test]
    #[traced_test]
    fn tls_failure_falls_back_once() {
        let transport = ScriptedTransport::new(vec![
            Err(fail("invalid peer certificate: UnknownIssuer", 0)),
            Ok(exchange("\r\n", "[]", 200)),
        ]);
        let out = execute_with_fallback(&transport, &request(), &CancelToken::new()).unwrap();
        assert_eq!(out.status, 200);
        assert_eq!(transport.verify_flags(), vec![true, false]);
        assert!(logs_contain("retrying with TLS verification disabled"));
    }

    #[test]
    #[traced_test]
    fn second_failure_surfaces_last_error() {
        let transport = ScriptedTransport::new(vec![
            Err(fail("invalid peer certificate", 0)),
            Err(fail("connection refused", 0)),
        ]);
        let err = execute_with_fallback(&transport, &request(), &CancelToken::new()).unwrap_err();
        assert_eq!(err, fail("connection refused", 0));
        assert_eq!(transport.verify_flags(), vec![true, false]);
        assert!(logs_contain("request failed after TLS fallback"));
    }

    #[test]
    fn last_observed_status_is_kept() {
        let transport = ScriptedTransport::new(vec![
            Err(fail("first", 502)),
            Err(fail("second", 0)),
        ]);
        let err = execute_with_fallback(&transport, &request(), &CancelToken::new()).unwrap_err();
        assert_eq!(err.status, 502);
        assert_eq!(err.message, "second");
    }

    #[test]
    fn http_error_status_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Ok(exchange("\r\n", "", 404))]);
        let out = execute_with_fallback(&transport, &request(), &CancelToken::new()).unwrap();
        assert_eq!(out.status, 404);
        assert_eq!(transport.verify_flags(), vec![true]);
    }

    #[test]
    fn cancelled_token_makes_no_attempt() {
        let transport = ScriptedTransport::new(vec![Ok(exchange("\r\n", "", 200))]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = execute_with_fallback(&transport, &request(), &cancel).unwrap_err();
        assert_eq!(err, fail("request cancelled", 0));
        assert!(transport.verify_flags().is_empty());
    }

    #[test]
    fn cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
