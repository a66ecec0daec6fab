//! URL templates with named placeholders
//!
//! A template like `/users/{user}/items/{id}` drives three mappings: index
//! descriptors to resource URLs, descriptors to local working-copy paths,
//! and local paths back to placeholder values (needed when pushing a file
//! that was created locally). The local path is the template tail starting
//! at the first placeholder, with a `.json` extension: the template above
//! checks `{"user": "a", "id": "a1"}` out as `a/items/a1.json`.

use std::collections::BTreeMap;

use url::Url;

use crate::{Error, Result};

const LOCAL_EXT: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed URL template.
#[derive(Debug, Clone)]
pub struct UrlTemplate {
    raw: String,
    segments: Vec<Segment>,
    /// Index of the first placeholder segment
    first_placeholder: usize,
    placeholders: Vec<String>,
}

impl UrlTemplate {
    /// Parse a template path.
    ///
    /// # Errors
    ///
    /// Returns a config error when the template does not start with `/`,
    /// contains no placeholders, or mixes braces into literal segments.
    pub fn parse(raw: &str) -> Result<Self> {
        if !raw.starts_with('/') {
            return Err(Error::config(format!(
                "url template must start with '/': {raw}"
            )));
        }

        let mut segments = Vec::new();
        let mut placeholders = Vec::new();
        for part in raw.split('/').filter(|s| !s.is_empty()) {
            if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if name.is_empty() {
                    return Err(Error::config(format!("empty placeholder in template {raw}")));
                }
                placeholders.push(name.to_string());
                segments.push(Segment::Placeholder(name.to_string()));
            } else if part.contains('{') || part.contains('}') {
                return Err(Error::config(format!(
                    "malformed template segment '{part}' in {raw}"
                )));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        let first_placeholder = segments
            .iter()
            .position(|s| matches!(s, Segment::Placeholder(_)))
            .ok_or_else(|| Error::config(format!("url template has no placeholders: {raw}")))?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
            first_placeholder,
            placeholders,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Fill the template path, e.g. `/users/a/items/a1`.
    ///
    /// Returns `None` when a placeholder has no value.
    pub fn interpolate(&self, values: &BTreeMap<String, String>) -> Option<String> {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => out.push_str(values.get(name)?),
            }
        }
        Some(out)
    }

    /// Absolute resource URL for a descriptor, resolved against the base.
    pub fn resource_url(&self, base: &str, values: &BTreeMap<String, String>) -> Option<String> {
        let path = self.interpolate(values)?;
        let base = Url::parse(base).ok()?;
        Some(base.join(&path).ok()?.to_string())
    }

    /// Relative working-copy path for a descriptor, e.g. `a/items/a1.json`.
    pub fn local_path(&self, values: &BTreeMap<String, String>) -> Option<String> {
        let mut parts = Vec::new();
        for segment in &self.segments[self.first_placeholder..] {
            match segment {
                Segment::Literal(text) => parts.push(text.clone()),
                Segment::Placeholder(name) => parts.push(values.get(name)?.clone()),
            }
        }
        Some(format!("{}{LOCAL_EXT}", parts.join("/")))
    }

    /// Recover placeholder values from a working-copy path.
    ///
    /// Returns `None` for paths that do not have the template's shape; this
    /// is what keeps unrelated local files out of the tracked set.
    pub fn match_local_path(&self, rel: &str) -> Option<BTreeMap<String, String>> {
        let trimmed = rel.strip_suffix(LOCAL_EXT)?;
        let parts: Vec<&str> = trimmed.split('/').collect();
        let shape = &self.segments[self.first_placeholder..];
        if parts.len() != shape.len() {
            return None;
        }

        let mut values = BTreeMap::new();
        for (part, segment) in parts.iter().zip(shape) {
            if part.is_empty() {
                return None;
            }
            match segment {
                Segment::Literal(text) => {
                    if part != text {
                        return None;
                    }
                }
                Segment::Placeholder(name) => {
                    values.insert(name.clone(), (*part).to_string());
                }
            }
        }
        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_rejects_relative_and_empty_templates() {
        assert!(UrlTemplate::parse("users/{id}").is_err());
        assert!(UrlTemplate::parse("/users/items").is_err());
        assert!(UrlTemplate::parse("/users/{}").is_err());
        assert!(UrlTemplate::parse("/users/{id").is_err());
    }

    #[test]
    fn interpolates_the_full_path() {
        let template = UrlTemplate::parse("/users/{user}/items/{id}").unwrap();
        assert_eq!(
            template.interpolate(&values(&[("user", "a"), ("id", "a1")])),
            Some("/users/a/items/a1".to_string())
        );
        assert_eq!(template.interpolate(&values(&[("user", "a")])), None);
    }

    #[test]
    fn local_path_starts_at_the_first_placeholder() {
        let template = UrlTemplate::parse("/users/{user}/items/{id}").unwrap();
        assert_eq!(
            template.local_path(&values(&[("user", "a"), ("id", "a1")])),
            Some("a/items/a1.json".to_string())
        );
    }

    #[test]
    fn resource_url_resolves_against_the_base() {
        let template = UrlTemplate::parse("/users/{user}/items/{id}").unwrap();
        assert_eq!(
            template.resource_url(
                "https://example.com/all-items",
                &values(&[("user", "a"), ("id", "a1")])
            ),
            Some("https://example.com/users/a/items/a1".to_string())
        );
    }

    #[test]
    fn match_local_path_round_trips() {
        let template = UrlTemplate::parse("/users/{user}/items/{id}").unwrap();
        let matched = template.match_local_path("a/items/a1.json").unwrap();
        assert_eq!(matched, values(&[("user", "a"), ("id", "a1")]));
    }

    #[test]
    fn match_local_path_rejects_foreign_shapes() {
        let template = UrlTemplate::parse("/users/{user}/items/{id}").unwrap();
        assert_eq!(template.match_local_path("a/items/a1.txt"), None);
        assert_eq!(template.match_local_path("a/other/a1.json"), None);
        assert_eq!(template.match_local_path("a/items/x/a1.json"), None);
        assert_eq!(template.match_local_path("notes.json"), None);
    }
}
