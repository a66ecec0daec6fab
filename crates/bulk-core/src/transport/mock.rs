//! In-memory transport for tests
//!
//! Responses are registered per `(method, url)` pair and consumed in FIFO
//! order, so a test can script an exact wire conversation and then assert
//! that every registered response was used.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use serde_json::Value;

use crate::{Error, Result};

use super::{Method, ParsedResponse, Transport, parse_link_header};

/// A scripted response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl MockResponse {
    /// A response with a JSON body.
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Some(body),
        }
    }

    /// A bodyless response.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Default)]
struct Inner {
    queues: HashMap<(Method, String), VecDeque<MockResponse>>,
    requests: Vec<(Method, String, Option<Vec<u8>>)>,
}

/// Shared-handle mock transport.
///
/// Clones share state, so a test can keep one handle for assertions after
/// moving another into the engine.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Rc<RefCell<Inner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response for the next request matching `(method, url)`.
    pub fn expect(&self, method: Method, url: impl Into<String>, response: MockResponse) {
        self.inner
            .borrow_mut()
            .queues
            .entry((method, url.into()))
            .or_default()
            .push_back(response);
    }

    /// Registered responses that have not been consumed yet.
    pub fn pending(&self) -> Vec<String> {
        let inner = self.inner.borrow();
        let mut out: Vec<String> = inner
            .queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|((method, url), queue)| format!("{method} {url} ({} left)", queue.len()))
            .collect();
        out.sort();
        out
    }

    /// Panic unless every registered response was consumed.
    ///
    /// The panic is deliberate; this only runs in tests.
    pub fn assert_consumed(&self) {
        let pending = self.pending();
        assert!(
            pending.is_empty(),
            "unconsumed mock responses:\n{}",
            pending.join("\n")
        );
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.inner
            .borrow()
            .requests
            .iter()
            .map(|(m, u, _)| (*m, u.clone()))
            .collect()
    }

    /// The body sent with the most recent request matching `(method, url)`.
    pub fn last_body(&self, method: Method, url: &str) -> Option<Vec<u8>> {
        self.inner
            .borrow()
            .requests
            .iter()
            .rev()
            .find(|(m, u, _)| *m == method && u == url)
            .and_then(|(_, _, body)| body.clone())
    }
}

impl Transport for MockTransport {
    fn send(&self, method: Method, url: &str, body: Option<&[u8]>) -> Result<ParsedResponse> {
        let mut inner = self.inner.borrow_mut();
        inner
            .requests
            .push((method, url.to_string(), body.map(<[u8]>::to_vec)));

        let response = inner
            .queues
            .get_mut(&(method, url.to_string()))
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| Error::http(url, format!("no mock response for {method} {url}")))?;

        let mut headers = BTreeMap::new();
        for (name, value) in &response.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }
        let links = headers
            .get("link")
            .map(|value| parse_link_header(value))
            .unwrap_or_default();

        Ok(ParsedResponse {
            status: response.status,
            headers,
            body: response.body,
            links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn responses_are_consumed_in_order() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, "https://x/1", MockResponse::json(200, json!(1)));
        mock.expect(Method::Get, "https://x/1", MockResponse::json(200, json!(2)));

        let first = mock.send(Method::Get, "https://x/1", None).unwrap();
        let second = mock.send(Method::Get, "https://x/1", None).unwrap();
        assert_eq!(first.body, Some(json!(1)));
        assert_eq!(second.body, Some(json!(2)));
    }

    #[test]
    fn unregistered_request_is_a_transport_error() {
        let mock = MockTransport::new();
        assert!(mock.send(Method::Get, "https://x/none", None).is_err());
    }

    #[test]
    #[should_panic(expected = "unconsumed mock responses")]
    fn assert_consumed_panics_on_leftovers() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, "https://x/1", MockResponse::status(200));
        mock.assert_consumed();
    }

    #[test]
    fn link_headers_are_parsed() {
        let mock = MockTransport::new();
        mock.expect(
            Method::Get,
            "https://x/1",
            MockResponse::json(200, json!({}))
                .with_header("Link", r#"</schema.json>; rel="describedby""#),
        );
        let response = mock.send(Method::Get, "https://x/1", None).unwrap();
        assert_eq!(response.link("describedby"), Some("/schema.json"));
    }

    #[test]
    fn clones_share_state() {
        let mock = MockTransport::new();
        let handle = mock.clone();
        mock.expect(Method::Delete, "https://x/1", MockResponse::status(204));
        handle.send(Method::Delete, "https://x/1", None).unwrap();
        mock.assert_consumed();
        assert_eq!(mock.requests().len(), 1);
    }
}
