//! HTTP transport interface
//!
//! The engine talks to remotes through the [`Transport`] trait so the HTTP
//! stack stays a swappable collaborator: [`AgentTransport`] is the
//! production implementation, [`MockTransport`] backs the tests. Responses
//! arrive pre-parsed: status, lower-cased headers, the body decoded to a
//! JSON tree, and Web Link relations extracted from the `Link` header.

mod agent;
mod mock;

pub use agent::AgentTransport;
pub use mock::{MockResponse, MockTransport};

use std::collections::BTreeMap;

use serde_json::Value;

use crate::Result;

/// HTTP method subset the engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response with the parts the engine cares about already extracted.
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    pub status: u16,
    /// Header names lower-cased
    pub headers: BTreeMap<String, String>,
    /// Body decoded as JSON, `None` when empty or not JSON
    pub body: Option<Value>,
    /// Web Link relations: rel -> target URIs in header order
    pub links: BTreeMap<String, Vec<String>>,
}

impl ParsedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// First target URI for a link relation, if present.
    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links.get(rel)?.first().map(String::as_str)
    }
}

/// A blocking HTTP client.
///
/// Requests are issued sequentially; a `Result::Err` means the request never
/// produced a response. Error *statuses* (4xx/5xx) come back as a normal
/// [`ParsedResponse`] so callers decide how to treat them per operation.
pub trait Transport {
    fn send(&self, method: Method, url: &str, body: Option<&[u8]>) -> Result<ParsedResponse>;
}

/// Parse an RFC 8288 `Link` header value into rel -> URIs.
///
/// Handles the common shape `<uri>; rel="name", <uri>; rel=name`. Entries
/// without a target or a rel parameter are ignored.
pub(crate) fn parse_link_header(value: &str) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in value.split(',') {
        let entry = entry.trim();
        let Some(rest) = entry.strip_prefix('<') else {
            continue;
        };
        let Some((uri, params)) = rest.split_once('>') else {
            continue;
        };
        for param in params.split(';') {
            let Some((name, raw)) = param.split_once('=') else {
                continue;
            };
            if name.trim() != "rel" {
                continue;
            }
            let rel = raw.trim().trim_matches('"');
            if !rel.is_empty() {
                out.entry(rel.to_string()).or_default().push(uri.to_string());
            }
        }
    }
    out
}
