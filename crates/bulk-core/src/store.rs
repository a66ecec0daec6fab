//! Durable metadata store
//!
//! The store is the single source of truth for what is tracked: one
//! [`FileRecord`] per path plus the index URL and URL template captured at
//! `init`. It serializes as one JSON document at `.rshbulk/meta` and is
//! saved atomically, so a crash mid-save leaves the previous state intact.
//! Commands that mutate state save exactly once, after all mutations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::layout::Layout;
use crate::record::FileRecord;
use crate::{Error, Result};

/// The tracked-file index plus checkout configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaStore {
    /// Index endpoint URL the checkout was created from
    pub base: String,
    /// URL template mapping descriptor keys to resource URLs
    pub url_template: String,
    /// Tracked records keyed by relative path; BTreeMap keeps listings
    /// in lexicographic path order
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
}

impl MetaStore {
    pub fn new(base: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            url_template: url_template.into(),
            files: BTreeMap::new(),
        }
    }

    /// Load the store from `.rshbulk/meta`.
    ///
    /// # Errors
    ///
    /// A config error when the checkout does not exist, an I/O or JSON
    /// error when the store itself is unreadable; both are fatal to the
    /// calling command.
    pub fn load(layout: &Layout) -> Result<Self> {
        let path = layout.meta_file();
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::config(
                    "no bulk checkout in this directory; run `bulk init` first",
                ));
            }
            Err(e) => return Err(Error::io(path, e)),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    /// Save the store atomically to `.rshbulk/meta`.
    pub fn save(&self, layout: &Layout) -> Result<()> {
        let mut data = serde_json::to_vec_pretty(self)?;
        data.push(b'\n');
        layout.write_atomic(&layout.meta_file(), &data)
    }
}
