//! ureq-backed transport

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use crate::{Error, Result};

use super::{Method, ParsedResponse, Transport, parse_link_header};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Responses larger than this are refused rather than buffered.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Production transport over a blocking [`ureq::Agent`].
pub struct AgentTransport {
    agent: ureq::Agent,
}

impl AgentTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }
}

impl Default for AgentTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for AgentTransport {
    fn send(&self, method: Method, url: &str, body: Option<&[u8]>) -> Result<ParsedResponse> {
        let request = self
            .agent
            .request(method.as_str(), url)
            .set("Accept", "application/json");

        let result = match body {
            Some(bytes) => request
                .set("Content-Type", "application/json")
                .send_bytes(bytes),
            None => request.call(),
        };

        let response = match result {
            Ok(response) => response,
            // Error statuses still carry a response worth parsing.
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(Error::http(url, e.to_string())),
        };

        parse_response(response, url)
    }
}

fn parse_response(response: ureq::Response, url: &str) -> Result<ParsedResponse> {
    let status = response.status();

    let mut headers = BTreeMap::new();
    for name in response.headers_names() {
        if let Some(value) = response.header(&name) {
            headers.insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    let links = headers
        .get("link")
        .map(|value| parse_link_header(value))
        .unwrap_or_default();

    let mut text = String::new();
    response
        .into_reader()
        .take(MAX_BODY_BYTES)
        .read_to_string(&mut text)
        .map_err(|e| Error::http(url, format!("failed to read response body: {e}")))?;

    let body = if text.trim().is_empty() {
        None
    } else {
        serde_json::from_str(&text).ok()
    };

    Ok(ParsedResponse {
        status,
        headers,
        body,
        links,
    })
}
