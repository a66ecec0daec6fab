//! On-disk layout of a bulk checkout
//!
//! A checkout is a project root holding the working copies, plus a
//! `.rshbulk/` directory holding the metadata store and one reference copy
//! per tracked file. Relative resource paths always use forward slashes;
//! they become native `PathBuf`s only at the I/O boundary.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Directory holding the metadata store and reference copies
pub const META_DIR: &str = ".rshbulk";

/// Name of the metadata store file inside [`META_DIR`]
pub const META_FILE: &str = "meta";

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Resolved paths for a single checkout rooted at a project directory.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.rshbulk/` directory.
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(META_DIR)
    }

    /// The metadata store file, `.rshbulk/meta`.
    pub fn meta_file(&self) -> PathBuf {
        self.meta_dir().join(META_FILE)
    }

    /// Working-copy path for a forward-slash relative resource path.
    pub fn work_file(&self, rel: &str) -> PathBuf {
        join_rel(&self.root, rel)
    }

    /// Reference-copy path for a forward-slash relative resource path.
    pub fn ref_file(&self, rel: &str) -> PathBuf {
        join_rel(&self.meta_dir(), rel)
    }

    /// Whether this root already holds a checkout.
    pub fn is_initialized(&self) -> bool {
        self.meta_file().exists()
    }

    /// Create the `.rshbulk/` directory.
    pub fn create_meta_dir(&self) -> Result<()> {
        let dir = self.meta_dir();
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        restrict_dir(&dir)?;
        Ok(())
    }

    /// Write a working- or reference-copy file, creating parent directories.
    pub fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            restrict_dir(parent)?;
        }
        fs::write(path, data).map_err(|e| Error::io(path, e))?;
        restrict_file(path)?;
        Ok(())
    }

    /// Write a file atomically via write-temp-then-rename.
    ///
    /// The temp file lives in the same directory as the target so the
    /// rename never crosses filesystems; a crash mid-write leaves the
    /// previous contents intact.
    pub fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            restrict_dir(parent)?;
        }
        let temp_name = format!(
            ".{}.{}.tmp",
            path.file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default(),
            std::process::id()
        );
        let temp_path = path.with_file_name(&temp_name);
        fs::write(&temp_path, data).map_err(|e| Error::io(&temp_path, e))?;
        restrict_file(&temp_path)?;
        fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;
        Ok(())
    }

    /// Remove a file, ignoring a file that is already gone.
    pub fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Enumerate every file under the project root as a forward-slash
    /// relative path, skipping the `.rshbulk/` directory.
    pub fn walk_files(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        walk(&self.root, "", &mut out)?;
        out.sort();
        Ok(out)
    }
}

fn join_rel(base: &Path, rel: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for segment in rel.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}

fn walk(dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if prefix.is_empty() && name == META_DIR {
            continue;
        }
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let path = entry.path();
        if path.is_dir() {
            walk(&path, &rel, out)?;
        } else {
            out.push(rel);
        }
    }
    Ok(())
}

#[cfg(unix)]
fn restrict_dir(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(DIR_MODE)).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn restrict_dir(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn restrict_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(FILE_MODE)).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn restrict_file(_path: &Path) -> Result<()> {
    Ok(())
}
