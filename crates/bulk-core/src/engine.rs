//! The synchronization engine
//!
//! Composes the store, layout, template, and transport into the seven
//! commands. Every operation returns a structured report for the CLI to
//! render. Read-only operations (`status`, `list`, the diffs) never write
//! the store or either copy; mutating operations save the store exactly
//! once, after all per-file work, so a crash mid-command leaves the
//! previous state loadable and a rerun converges.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::canonical;
use crate::change::{self, ChangeReport};
use crate::diff;
use crate::index::{self, RemoteDescriptor};
use crate::layout::Layout;
use crate::query::{Filter, Projection, fetch_schema};
use crate::record::FileRecord;
use crate::store::MetaStore;
use crate::template::UrlTemplate;
use crate::transport::{Method, Transport};
use crate::{Error, Result};

/// Outcome of `pull` (and of the fetch phase of `init`).
#[derive(Debug, Clone, Default)]
pub struct PullReport {
    /// Fetched and written, both copies
    pub fetched: Vec<String>,
    /// Removed locally because the remote dropped them
    pub removed: Vec<String>,
    /// Removed remotely but kept because of local changes
    pub kept: Vec<String>,
    /// Fetch or write failed; records left untouched for the next run
    pub failed: Vec<String>,
}

/// Outcome of `push`.
#[derive(Debug, Clone, Default)]
pub struct PushReport {
    /// Uploaded and refreshed from the remote
    pub pushed: Vec<String>,
    /// Deleted remotely and untracked
    pub deleted: Vec<String>,
    /// Refused: changed both remotely and locally
    pub conflicts: Vec<String>,
    /// Upload or delete rejected; left pending
    pub failed: Vec<String>,
}

/// Outcome of `status`.
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// The index URL this checkout tracks
    pub base: String,
    pub remote: ChangeReport,
    pub local: ChangeReport,
}

#[derive(Debug, Clone)]
pub struct ListEntry {
    pub path: String,
    /// Projected fragment when `-f` was given
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ListReport {
    pub entries: Vec<ListEntry>,
    /// Schema type-check warnings, already `WARN:`-prefixed
    pub warnings: Vec<String>,
}

/// One rendered diff.
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub path: String,
    pub text: String,
}

/// A checkout plus the transport used to reach its remote.
pub struct Engine {
    layout: Layout,
    template: UrlTemplate,
    store: MetaStore,
    transport: Box<dyn Transport>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("layout", &self.layout)
            .field("template", &self.template)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create a checkout: validate the target and template, create
    /// `.rshbulk/`, then pull everything the index enumerates.
    ///
    /// # Errors
    ///
    /// Fails when the directory already holds a checkout, the target or
    /// template is malformed, or the index fetch fails. Per-file fetch
    /// failures are reported, not fatal.
    pub fn init(
        root: impl Into<std::path::PathBuf>,
        transport: Box<dyn Transport>,
        target: &str,
        template: &str,
    ) -> Result<(Self, PullReport)> {
        let layout = Layout::new(root);
        if layout.meta_dir().exists() {
            return Err(Error::config(format!(
                "{} already exists; this directory is already a bulk checkout",
                layout.meta_dir().display()
            )));
        }

        let base = parse_target(target)?;
        let parsed = UrlTemplate::parse(template)?;
        layout.create_meta_dir()?;

        let mut engine = Self {
            layout,
            template: parsed,
            store: MetaStore::new(base, template),
            transport,
        };
        let report = engine.pull()?;
        Ok((engine, report))
    }

    /// Open an existing checkout.
    pub fn open(root: impl Into<std::path::PathBuf>, transport: Box<dyn Transport>) -> Result<Self> {
        let layout = Layout::new(root);
        let store = MetaStore::load(&layout)?;
        let template = UrlTemplate::parse(&store.url_template)?;
        Ok(Self {
            layout,
            template,
            store,
            transport,
        })
    }

    pub fn store(&self) -> &MetaStore {
        &self.store
    }

    /// Pull the index and classify every path against the store.
    /// Read-only.
    pub fn status(&self) -> Result<StatusReport> {
        let descriptors = self.pull_index()?;
        Ok(StatusReport {
            base: self.store.base.clone(),
            remote: change::detect_remote(&self.store, &descriptors),
            local: change::detect_local(&self.store, &self.layout, &self.template)?,
        })
    }

    /// Materialize each tracked file, filter, and optionally project.
    /// Read-only; output is in path order.
    pub fn list(&self, filter: Option<&str>, projection: Option<&str>) -> Result<ListReport> {
        let filter = Filter::parse(filter.unwrap_or_default())?;
        let projection = projection.map(Projection::parse).transpose()?;

        let mut report = ListReport::default();
        let mut checked_schemas = BTreeSet::new();

        for (path, record) in &self.store.files {
            let data = match record.get_data(&self.layout) {
                Ok(Some(data)) => data,
                Ok(None) => continue,
                Err(e) => {
                    warn!("failed to read {path}: {e}");
                    continue;
                }
            };
            let body: Value = match serde_json::from_slice(&data) {
                Ok(body) => body,
                Err(e) => {
                    warn!("unable to parse {path}: {e}");
                    continue;
                }
            };

            if filter.is_selective()
                && let Some(schema_url) = &record.schema
                && checked_schemas.insert(schema_url.clone())
                && let Some(schema) = fetch_schema(self.transport.as_ref(), schema_url)
            {
                report.warnings.extend(filter.schema_warnings(&schema));
            }

            if !filter.matches(&body) {
                continue;
            }

            let value = match &projection {
                Some(projection) => match projection.apply(&body) {
                    Some(value) => Some(value),
                    None => continue,
                },
                None => None,
            };
            report.entries.push(ListEntry {
                path: path.clone(),
                value,
            });
        }

        Ok(report)
    }

    /// Diff local edits against the reference copies. Read-only.
    pub fn diff_local(&self) -> Result<Vec<FileDiff>> {
        let local = change::detect_local(&self.store, &self.layout, &self.template)?;
        let mut out = Vec::new();

        for (path, kind) in merge_categories(&local) {
            let (url, left) = match self.store.files.get(path) {
                Some(record) => (
                    record.url.clone(),
                    record.read_reference(&self.layout).unwrap_or_default(),
                ),
                // Locally added: no record, no reference copy.
                None => (self.added_url(path).unwrap_or_default(), Vec::new()),
            };
            let right = match kind {
                Category::Removed => Vec::new(),
                _ => self.working_canonical(path)?,
            };
            if let Some(text) = diff::render(
                &format!("remote {url}"),
                &format!("local {path}"),
                &left,
                &right,
            ) {
                out.push(FileDiff {
                    path: path.to_string(),
                    text,
                });
            }
        }

        Ok(out)
    }

    /// Diff remote changes against the reference copies, fetching remote
    /// bodies into ephemeral buffers only. Read-only; remote errors are
    /// fatal here.
    pub fn diff_remote(&self) -> Result<Vec<FileDiff>> {
        let descriptors = self.pull_index()?;
        let remote = change::detect_remote(&self.store, &descriptors);
        let mut out = Vec::new();

        for (path, kind) in merge_categories(&remote) {
            let left = match self.store.files.get(path) {
                Some(record) => record.read_reference(&self.layout).unwrap_or_default(),
                None => Vec::new(),
            };
            let (url, right) = match kind {
                Category::Removed => {
                    let url = self
                        .store
                        .files
                        .get(path)
                        .map(|r| r.url.clone())
                        .unwrap_or_default();
                    (url, Vec::new())
                }
                _ => {
                    // Added or modified: present in the fresh index.
                    let Some(descriptor) = descriptors.get(path) else {
                        continue;
                    };
                    (descriptor.url.clone(), self.fetch_ephemeral(&descriptor.url)?)
                }
            };
            if let Some(text) = diff::render(
                &format!("local {path}"),
                &format!("remote {url}"),
                &left,
                &right,
            ) {
                out.push(FileDiff {
                    path: path.to_string(),
                    text,
                });
            }
        }

        Ok(out)
    }

    /// Bring the checkout up to date with the remote.
    ///
    /// Remote-added and remote-modified files are fetched and written to
    /// both copies; a per-file failure leaves that record exactly as it
    /// was so the next run retries it. Remote-removed files are deleted
    /// locally unless they carry local changes.
    pub fn pull(&mut self) -> Result<PullReport> {
        let descriptors = self.pull_index()?;
        let remote = change::detect_remote(&self.store, &descriptors);
        let mut report = PullReport::default();

        for path in remote.added.iter().chain(remote.modified.iter()) {
            let Some(descriptor) = descriptors.get(path) else {
                continue;
            };
            let mut record = match self.store.files.get(path) {
                Some(existing) => existing.clone(),
                None => descriptor_record(descriptor),
            };
            record.url = descriptor.url.clone();
            record.version_remote = descriptor.version.clone();

            let result = record
                .fetch(&self.layout, self.transport.as_ref())
                .and_then(|bytes| record.write(&self.layout, &bytes));
            match result {
                Ok(()) => {
                    debug!("pulled {path}");
                    self.store.files.insert(path.clone(), record);
                    report.fetched.push(path.clone());
                }
                Err(e) => {
                    warn!("failed to pull {path}: {e}");
                    report.failed.push(path.clone());
                }
            }
        }

        for path in &remote.removed {
            let Some(record) = self.store.files.get(path) else {
                continue;
            };
            if record.is_changed_local(&self.layout, false) {
                warn!("{path} was removed remotely but has local changes, keeping it");
                report.kept.push(path.clone());
                continue;
            }
            let result = record
                .delete_working(&self.layout)
                .and_then(|()| record.delete_reference(&self.layout));
            match result {
                Ok(()) => {
                    debug!("removed {path}");
                    self.store.files.remove(path);
                    report.removed.push(path.clone());
                }
                Err(e) => {
                    warn!("failed to remove {path}: {e}");
                    report.failed.push(path.clone());
                }
            }
        }

        self.store.save(&self.layout)?;
        Ok(report)
    }

    /// Upload local changes.
    ///
    /// Pulls the index first so files that also changed remotely are
    /// refused instead of overwritten. Successful uploads are re-fetched
    /// afterwards (one more index pull for the new version tokens) so the
    /// working copy, reference copy, and version pair all match the
    /// server. Per-file failures are reported and left pending.
    pub fn push(&mut self) -> Result<PushReport> {
        let local = change::detect_local(&self.store, &self.layout, &self.template)?;
        let mut report = PushReport::default();
        if local.is_empty() {
            return Ok(report);
        }

        let descriptors = self.pull_index()?;
        let mut uploaded = Vec::new();

        for path in &local.modified {
            let Some(record) = self.store.files.get(path) else {
                continue;
            };
            if let Some(descriptor) = descriptors.get(path)
                && descriptor.version != record.version_local
            {
                warn!("{path} changed remotely and locally, refusing to push");
                report.conflicts.push(path.clone());
                continue;
            }
            match self.upload(path, &record.url) {
                Ok(true) => uploaded.push(path.clone()),
                Ok(false) => report.failed.push(path.clone()),
                Err(e) => {
                    warn!("failed to push {path}: {e}");
                    report.failed.push(path.clone());
                }
            }
        }

        for path in &local.added {
            if descriptors.contains_key(path) {
                warn!("{path} already exists remotely, refusing to push");
                report.conflicts.push(path.clone());
                continue;
            }
            let Some(url) = self.added_url(path) else {
                warn!("{path} does not fit the url template, skipping");
                continue;
            };
            match self.upload(path, &url) {
                Ok(true) => {
                    self.store
                        .files
                        .insert(path.clone(), FileRecord::new(path.clone(), url));
                    uploaded.push(path.clone());
                }
                Ok(false) => report.failed.push(path.clone()),
                Err(e) => {
                    warn!("failed to push {path}: {e}");
                    report.failed.push(path.clone());
                }
            }
        }

        for path in &local.removed {
            let Some(record) = self.store.files.get(path) else {
                continue;
            };
            if let Some(descriptor) = descriptors.get(path)
                && descriptor.version != record.version_local
            {
                warn!("{path} changed remotely but was deleted locally, refusing to push");
                report.conflicts.push(path.clone());
                continue;
            }
            match self.transport.send(Method::Delete, &record.url, None) {
                Ok(response) if response.is_success() => {
                    let _ = record.delete_reference(&self.layout);
                    self.store.files.remove(path);
                    report.deleted.push(path.clone());
                }
                Ok(response) => {
                    warn!("delete of {path} rejected with HTTP {}", response.status);
                    report.failed.push(path.clone());
                }
                Err(e) => {
                    warn!("failed to delete {path}: {e}");
                    report.failed.push(path.clone());
                }
            }
        }

        if !uploaded.is_empty() {
            match self.pull_index() {
                Ok(fresh) => {
                    for path in &uploaded {
                        self.refresh_after_push(path, &fresh);
                    }
                }
                Err(e) => warn!("failed to refresh the index after push: {e}"),
            }
            report.pushed = uploaded;
        }

        self.store.save(&self.layout)?;
        Ok(report)
    }

    /// Restore one working copy from its reference copy.
    pub fn reset(&mut self, path: &str) -> Result<()> {
        let Some(record) = self.store.files.get(path) else {
            return Err(Error::config(format!("{path} is not tracked")));
        };
        let mut record = record.clone();
        record.reset(&self.layout)?;
        self.store.files.insert(path.to_string(), record);
        self.store.save(&self.layout)
    }

    fn pull_index(&self) -> Result<BTreeMap<String, RemoteDescriptor>> {
        index::pull_index(self.transport.as_ref(), &self.store.base, &self.template)
    }

    /// PUT the canonical working copy; `Ok(true)` on a 2xx.
    fn upload(&self, path: &str, url: &str) -> Result<bool> {
        let work = self.layout.work_file(path);
        let data = std::fs::read(&work).map_err(|e| Error::io(work, e))?;
        let body = canonical::canonicalize(&data)?;
        let response = self.transport.send(Method::Put, url, Some(&body))?;
        if response.is_success() {
            debug!("pushed {path}");
            Ok(true)
        } else {
            warn!("push of {path} rejected with HTTP {}", response.status);
            Ok(false)
        }
    }

    /// After a successful PUT, learn the new version token and re-fetch so
    /// all three local artifacts match the server.
    fn refresh_after_push(&mut self, path: &str, fresh: &BTreeMap<String, RemoteDescriptor>) {
        let Some(mut record) = self.store.files.get(path).cloned() else {
            return;
        };
        if let Some(descriptor) = fresh.get(path) {
            record.version_remote = descriptor.version.clone();
            if record.schema.is_none() {
                record.schema = descriptor.schema.clone();
            }
        }
        let result = record
            .fetch(&self.layout, self.transport.as_ref())
            .and_then(|bytes| record.write(&self.layout, &bytes));
        if let Err(e) = result {
            // The upload itself succeeded; the next pull reconciles.
            warn!("failed to refresh {path} after push: {e}");
        }
        self.store.files.insert(path.to_string(), record);
    }

    /// GET a body without touching any record or copy.
    fn fetch_ephemeral(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.transport.send(Method::Get, url, None)?;
        if response.status >= 400 {
            return Err(Error::Remote {
                url: url.to_string(),
                status: response.status,
            });
        }
        let body = response
            .body
            .ok_or_else(|| Error::http(url, "response body was not JSON"))?;
        Ok(canonical::canonical_bytes(&body)?)
    }

    /// Resource URL for a locally-added path, recovered via the template.
    fn added_url(&self, path: &str) -> Option<String> {
        let values = self.template.match_local_path(path)?;
        self.template.resource_url(&self.store.base, &values)
    }

    /// Canonical working-copy bytes; raw bytes when the file will not
    /// parse, so the diff still shows something useful.
    fn working_canonical(&self, path: &str) -> Result<Vec<u8>> {
        let work = self.layout.work_file(path);
        let data = std::fs::read(&work).map_err(|e| Error::io(work, e))?;
        Ok(canonical::canonicalize(&data).unwrap_or(data))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Added,
    Modified,
    Removed,
}

/// Merge a report's categories into one path-ordered listing.
fn merge_categories(report: &ChangeReport) -> BTreeMap<&str, Category> {
    let mut merged = BTreeMap::new();
    for path in &report.added {
        merged.insert(path.as_str(), Category::Added);
    }
    for path in &report.modified {
        merged.insert(path.as_str(), Category::Modified);
    }
    for path in &report.removed {
        merged.insert(path.as_str(), Category::Removed);
    }
    merged
}

fn descriptor_record(descriptor: &RemoteDescriptor) -> FileRecord {
    let mut record = FileRecord::new(descriptor.path.clone(), descriptor.url.clone());
    record.schema = descriptor.schema.clone();
    record
}

/// Normalize the `init` target into an absolute index URL; a bare
/// `host/path` defaults to https.
fn parse_target(target: &str) -> Result<String> {
    let candidate = if target.contains("://") {
        target.to_string()
    } else {
        format!("https://{target}")
    };
    let url = Url::parse(&candidate)
        .map_err(|e| Error::config(format!("invalid index URL '{target}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(Error::config(format!(
            "unsupported scheme '{other}' in index URL '{target}'"
        ))),
    }
}
