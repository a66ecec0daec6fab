//! Remote index walking
//!
//! The index endpoint returns an arbitrary JSON tree somewhere inside which
//! live descriptor objects, recognized by carrying the URL template's
//! placeholder names as keys. Each one becomes a [`RemoteDescriptor`];
//! candidates missing a placeholder value are skipped with a warning rather
//! than failing the pull.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::template::UrlTemplate;
use crate::transport::{Method, Transport};
use crate::{Error, Result};

/// Conventional member carrying the opaque version token.
const VERSION_KEY: &str = "version";

/// Conventional member carrying a schema URI for the resource.
const SCHEMA_KEY: &str = "schema";

/// One remote resource, as enumerated by the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    /// Relative working-copy path; the identity key
    pub path: String,
    /// Absolute resource URL
    pub url: String,
    /// Opaque version token; empty when the index carries none
    pub version: String,
    pub schema: Option<String>,
}

/// Fetch the index and produce one descriptor per remote resource,
/// keyed by path.
///
/// # Errors
///
/// `Error::Remote` on an index error status; a transport error when the
/// request fails outright. Both are fatal to the calling command.
pub fn pull_index(
    transport: &dyn Transport,
    index_url: &str,
    template: &UrlTemplate,
) -> Result<BTreeMap<String, RemoteDescriptor>> {
    let response = transport.send(Method::Get, index_url, None)?;
    if response.status >= 400 {
        return Err(Error::Remote {
            url: index_url.to_string(),
            status: response.status,
        });
    }
    let body = response
        .body
        .ok_or_else(|| Error::http(index_url, "index body was not JSON"))?;

    let mut out = BTreeMap::new();
    collect(&body, index_url, template, &mut out);
    Ok(out)
}

fn collect(
    value: &Value,
    base: &str,
    template: &UrlTemplate,
    out: &mut BTreeMap<String, RemoteDescriptor>,
) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect(item, base, template, out);
            }
        }
        Value::Object(map) => {
            let hits = template
                .placeholders()
                .iter()
                .filter(|name| map.contains_key(name.as_str()))
                .count();
            if hits == 0 {
                for nested in map.values() {
                    collect(nested, base, template, out);
                }
                return;
            }

            let mut values = BTreeMap::new();
            for name in template.placeholders() {
                match map.get(name.as_str()).and_then(scalar_string) {
                    Some(v) => {
                        values.insert(name.clone(), v);
                    }
                    None => {
                        warn!("index entry is missing placeholder '{name}', skipping");
                        return;
                    }
                }
            }

            // Both derivations hold every placeholder, so neither can miss.
            let (Some(path), Some(url)) = (
                template.local_path(&values),
                template.resource_url(base, &values),
            ) else {
                warn!("index entry does not fit template {}, skipping", template.as_str());
                return;
            };

            let version = map.get(VERSION_KEY).and_then(scalar_string).unwrap_or_default();
            let schema = map
                .get(SCHEMA_KEY)
                .and_then(Value::as_str)
                .map(str::to_string);

            out.insert(
                path.clone(),
                RemoteDescriptor {
                    path,
                    url,
                    version,
                    schema,
                },
            );
        }
        _ => {}
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockResponse, MockTransport};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const INDEX: &str = "https://example.com/all-items";

    fn template() -> UrlTemplate {
        UrlTemplate::parse("/users/{user}/items/{id}").unwrap()
    }

    fn pull(body: Value) -> BTreeMap<String, RemoteDescriptor> {
        let mock = MockTransport::new();
        mock.expect(Method::Get, INDEX, MockResponse::json(200, body));
        pull_index(&mock, INDEX, &template()).unwrap()
    }

    #[test]
    fn flat_array_of_descriptors() {
        let descriptors = pull(json!([
            {"user": "a", "id": "a1", "version": "a11"},
            {"user": "b", "id": "b1", "version": "b11"},
        ]));

        assert_eq!(descriptors.len(), 2);
        let a1 = &descriptors["a/items/a1.json"];
        assert_eq!(a1.url, "https://example.com/users/a/items/a1");
        assert_eq!(a1.version, "a11");
        assert_eq!(a1.schema, None);
    }

    #[test]
    fn descriptors_nested_inside_an_object_tree() {
        let descriptors = pull(json!({
            "meta": {"count": 2},
            "results": {
                "page": [
                    {"user": "a", "id": "a1", "version": "a11"},
                    {"user": "c", "id": "c1", "version": "c11"},
                ]
            }
        }));
        assert_eq!(descriptors.len(), 2);
        assert!(descriptors.contains_key("a/items/a1.json"));
        assert!(descriptors.contains_key("c/items/c1.json"));
    }

    #[test]
    fn missing_version_becomes_the_empty_token() {
        let descriptors = pull(json!([{"user": "a", "id": "a1"}]));
        assert_eq!(descriptors["a/items/a1.json"].version, "");
    }

    #[test]
    fn numeric_placeholder_values_are_stringified() {
        let descriptors = pull(json!([{"user": "a", "id": 7}]));
        assert!(descriptors.contains_key("a/items/7.json"));
    }

    #[test]
    fn partial_placeholders_skip_the_descriptor() {
        let descriptors = pull(json!([
            {"user": "a"},
            {"user": "b", "id": "b1"},
        ]));
        assert_eq!(descriptors.len(), 1);
        assert!(descriptors.contains_key("b/items/b1.json"));
    }

    #[test]
    fn schema_member_is_carried_through() {
        let descriptors = pull(json!([
            {"user": "a", "id": "a1", "schema": "https://example.com/schemas/item.json"},
        ]));
        assert_eq!(
            descriptors["a/items/a1.json"].schema.as_deref(),
            Some("https://example.com/schemas/item.json")
        );
    }

    #[test]
    fn index_error_status_is_fatal() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, INDEX, MockResponse::status(500));
        let err = pull_index(&mock, INDEX, &template()).unwrap_err();
        assert!(matches!(err, Error::Remote { status: 500, .. }));
    }
}
