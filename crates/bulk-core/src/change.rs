//! Change detection
//!
//! Classifies every known path into added / modified / removed, once
//! against a freshly pulled index (remote changes) and once against the
//! working tree (local changes). A file that changed on both sides shows
//! up in both reports; pull and push decide the conflict policy.

use std::collections::BTreeMap;

use crate::index::RemoteDescriptor;
use crate::layout::Layout;
use crate::store::MetaStore;
use crate::template::UrlTemplate;
use crate::Result;

/// Paths per change category, each sorted lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

impl ChangeReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

/// Compare the store against the current remote descriptors.
pub fn detect_remote(
    store: &MetaStore,
    descriptors: &BTreeMap<String, RemoteDescriptor>,
) -> ChangeReport {
    let mut report = ChangeReport::default();

    for (path, descriptor) in descriptors {
        match store.files.get(path) {
            None => report.added.push(path.clone()),
            Some(record) if descriptor.version != record.version_local => {
                report.modified.push(path.clone());
            }
            Some(_) => {}
        }
    }

    for path in store.files.keys() {
        if !descriptors.contains_key(path) {
            report.removed.push(path.clone());
        }
    }

    report
}

/// Compare the store against the working tree.
///
/// Untracked files count as added only when their path has the template's
/// shape; everything else on disk is none of our business.
pub fn detect_local(store: &MetaStore, layout: &Layout, template: &UrlTemplate) -> Result<ChangeReport> {
    let mut report = ChangeReport::default();

    for path in layout.walk_files()? {
        if !store.files.contains_key(&path) && template.match_local_path(&path).is_some() {
            report.added.push(path);
        }
    }

    for (path, record) in &store.files {
        let present = record.get_data(layout)?.is_some();
        if !present {
            if record.hash.is_some() {
                report.removed.push(path.clone());
            }
        } else if record.is_changed_local(layout, true) {
            report.modified.push(path.clone());
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical;
    use crate::record::FileRecord;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn template() -> UrlTemplate {
        UrlTemplate::parse("/users/{user}/items/{id}").unwrap()
    }

    fn descriptor(path: &str, version: &str) -> RemoteDescriptor {
        RemoteDescriptor {
            path: path.to_string(),
            url: format!("https://example.com/{path}"),
            version: version.to_string(),
            schema: None,
        }
    }

    fn tracked(store: &mut MetaStore, layout: &Layout, path: &str, version: &str, body: &[u8]) {
        let mut rec = FileRecord::new(path, format!("https://example.com/{path}"));
        rec.version_remote = version.to_string();
        rec.version_local = version.to_string();
        let canonical = canonical::canonicalize(body).unwrap();
        rec.write_reference(layout, &canonical).unwrap();
        rec.write(layout, &canonical).unwrap();
        store.files.insert(path.to_string(), rec);
    }

    #[test]
    fn remote_categories() {
        let mut store = MetaStore::new("https://example.com/all-items", "/users/{user}/items/{id}");
        for (path, version) in [
            ("a/items/a1.json", "a11"),
            ("b/items/b1.json", "b11"),
            ("c/items/c1.json", "c11"),
        ] {
            let mut rec = FileRecord::new(path, format!("https://example.com/{path}"));
            rec.version_remote = version.to_string();
            rec.version_local = version.to_string();
            store.files.insert(path.to_string(), rec);
        }

        let descriptors: BTreeMap<String, RemoteDescriptor> = [
            descriptor("a/items/a1.json", "a11"),
            descriptor("b/items/b1.json", "b12"),
            descriptor("d/items/d1.json", "d11"),
        ]
        .into_iter()
        .map(|d| (d.path.clone(), d))
        .collect();

        let report = detect_remote(&store, &descriptors);
        assert_eq!(report.added, vec!["d/items/d1.json"]);
        assert_eq!(report.modified, vec!["b/items/b1.json"]);
        assert_eq!(report.removed, vec!["c/items/c1.json"]);
    }

    #[test]
    fn empty_version_tokens_never_register_remote_changes() {
        let mut store = MetaStore::new("https://example.com/all-items", "/users/{user}/items/{id}");
        let rec = FileRecord::new("a/items/a1.json", "https://example.com/a");
        store.files.insert(rec.path.clone(), rec);

        let descriptors: BTreeMap<String, RemoteDescriptor> =
            [descriptor("a/items/a1.json", "")]
                .into_iter()
                .map(|d| (d.path.clone(), d))
                .collect();

        let report = detect_remote(&store, &descriptors);
        assert!(report.is_empty());
    }

    #[test]
    fn local_categories() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        let mut store = MetaStore::new("https://example.com/all-items", "/users/{user}/items/{id}");

        tracked(&mut store, &layout, "a/items/a1.json", "a11", br#"{"id": "a1"}"#);
        tracked(&mut store, &layout, "a/items/a2.json", "a21", br#"{"id": "a2"}"#);
        tracked(&mut store, &layout, "d/items/d1.json", "d11", br#"{"id": "d1"}"#);

        // Modify one, delete one, create one tracked-shaped and one foreign.
        std::fs::write(
            layout.work_file("a/items/a1.json"),
            br#"{"id": "a1", "labels": ["one"]}"#,
        )
        .unwrap();
        std::fs::remove_file(layout.work_file("d/items/d1.json")).unwrap();
        layout
            .write_file(&layout.work_file("a/items/a3.json"), br#"{"id": "a3"}"#)
            .unwrap();
        layout
            .write_file(&layout.work_file("README.md"), b"notes")
            .unwrap();

        let report = detect_local(&store, &layout, &template()).unwrap();
        assert_eq!(report.added, vec!["a/items/a3.json"]);
        assert_eq!(report.modified, vec!["a/items/a1.json"]);
        assert_eq!(report.removed, vec!["d/items/d1.json"]);
    }

    #[test]
    fn missing_file_without_hash_is_not_removed() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        let mut store = MetaStore::new("https://example.com/all-items", "/users/{user}/items/{id}");

        // Record seeded but never successfully written.
        let rec = FileRecord::new("a/items/a1.json", "https://example.com/a");
        store.files.insert(rec.path.clone(), rec);

        let report = detect_local(&store, &layout, &template()).unwrap();
        assert!(report.is_empty());
    }
}
