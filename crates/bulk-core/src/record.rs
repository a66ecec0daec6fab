//! Tracked file records
//!
//! A [`FileRecord`] relates one remote resource to its working copy and
//! reference copy: the remote URL, the HTTP conditional-request tokens, the
//! version pair that drives remote change detection, and the fingerprint
//! that drives local change detection. Operations take the [`Layout`] and
//! [`Transport`] explicitly; records hold no global state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::canonical;
use crate::layout::Layout;
use crate::transport::{Method, Transport};
use crate::{Error, Result};

/// Metadata for one tracked file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Relative working-copy path, the primary key
    pub path: String,
    /// Absolute URL of the remote resource
    pub url: String,

    /// ETag header captured for conditional updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Last-Modified header captured for conditional updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,

    /// Version token observed during the last index pull
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version_remote: String,
    /// Version token of the copy materialized locally
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version_local: String,

    /// JSON Schema URL describing this resource, when advertised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Fingerprint of the canonical form of the last-written local content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            etag: None,
            last_modified: None,
            version_remote: String::new(),
            version_local: String::new(),
            schema: None,
            hash: None,
        }
    }

    /// Read the working-copy bytes; `Ok(None)` when the file is absent.
    pub fn get_data(&self, layout: &Layout) -> Result<Option<Vec<u8>>> {
        let path = layout.work_file(&self.path);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Whether the working copy differs from the last successful write.
    ///
    /// `ignore_deleted` controls whether an absent working copy counts as a
    /// change. A record with no hash has never been written and is never
    /// considered changed; a working copy that fails to parse as JSON is
    /// logged and treated as unchanged rather than corrupt.
    pub fn is_changed_local(&self, layout: &Layout, ignore_deleted: bool) -> bool {
        let Some(expected) = &self.hash else {
            return false;
        };
        let data = match self.get_data(layout) {
            Ok(Some(data)) => data,
            Ok(None) | Err(_) => return !ignore_deleted,
        };
        match canonical::canonical_fingerprint(&data) {
            Ok(actual) => &actual != expected,
            Err(e) => {
                warn!(path = %self.path, "unable to format {}: {e}", self.path);
                false
            }
        }
    }

    /// Whether the last index pull saw a version we have not materialized.
    pub fn is_changed_remote(&self) -> bool {
        self.version_local != self.version_remote
    }

    /// GET the remote resource and refresh the record.
    ///
    /// On success this captures the conditional-request headers, resolves
    /// the schema URL (a `describedby` link relation, falling back to the
    /// body's own `$schema` member), marks the remote version as
    /// materialized, and writes the reference copy. Returns the canonical
    /// body bytes; promoting them to the working copy is the caller's call.
    ///
    /// # Errors
    ///
    /// `Error::Remote` on HTTP >= 400; the record is left untouched.
    pub fn fetch(&mut self, layout: &Layout, transport: &dyn Transport) -> Result<Vec<u8>> {
        let response = transport.send(Method::Get, &self.url, None)?;
        if response.status >= 400 {
            return Err(Error::Remote {
                url: self.url.clone(),
                status: response.status,
            });
        }

        if let Some(etag) = response.header("etag") {
            self.etag = Some(etag.to_string());
        }
        if let Some(last_modified) = response.header("last-modified") {
            self.last_modified = Some(last_modified.to_string());
        }

        if let Some(uri) = response.link("describedby") {
            self.schema = resolve_reference(&self.url, uri);
        } else if let Some(Value::Object(map)) = &response.body {
            // $schema lives inside the document, so no resolution needed.
            if let Some(Value::String(uri)) = map.get("$schema") {
                self.schema = Some(uri.clone());
            }
        }

        let body = response
            .body
            .ok_or_else(|| Error::http(&self.url, "response body was not JSON"))?;
        let bytes = canonical::canonical_bytes(&body)?;

        self.version_local = self.version_remote.clone();
        self.write_reference(layout, &bytes)?;

        Ok(bytes)
    }

    /// Write the working copy and record its fingerprint.
    pub fn write(&mut self, layout: &Layout, data: &[u8]) -> Result<()> {
        self.hash = Some(canonical::fingerprint(data));
        layout.write_file(&layout.work_file(&self.path), data)
    }

    /// Write the reference copy under `.rshbulk/`.
    pub fn write_reference(&self, layout: &Layout, data: &[u8]) -> Result<()> {
        layout.write_file(&layout.ref_file(&self.path), data)
    }

    /// Read the reference copy.
    ///
    /// # Errors
    ///
    /// A config error when no reference copy exists.
    pub fn read_reference(&self, layout: &Layout) -> Result<Vec<u8>> {
        let path = layout.ref_file(&self.path);
        match std::fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::config(format!(
                "no reference copy for {}",
                self.path
            ))),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Overwrite the working copy with the reference copy.
    pub fn reset(&mut self, layout: &Layout) -> Result<()> {
        let cached = self.read_reference(layout)?;
        self.write(layout, &cached)
    }

    pub fn delete_working(&self, layout: &Layout) -> Result<()> {
        layout.remove_file(&layout.work_file(&self.path))
    }

    pub fn delete_reference(&self, layout: &Layout) -> Result<()> {
        layout.remove_file(&layout.ref_file(&self.path))
    }
}

fn resolve_reference(base: &str, uri: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    Some(base.join(uri).ok()?.to_string())
}
