//! Directory-tree backend: one file per key
//!
//! Layout:
//! ```text
//! <root>/pages/a/x.pgs     key /pages/a/x
//! <root>/pages/a.pgs       key /pages/a (coexists with directory a/)
//! <root>/parts/nav.pgs     key /parts/nav
//! ```
//!
//! Writes go to a hidden temp file in the target directory, are synced,
//! then renamed over the destination, so a reader never observes a
//! partially written file. Directories emptied by a remove or rename are
//! pruned up to the namespace directory.

use crate::model::ContentPath;
use crate::store::Backend;
use crate::{Error, Result, RECORD_EXTENSION};
use std::fs::{self, File};
use std::io::{ErrorKind as IoKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use walkdir::WalkDir;

/// A backend rooted at a directory on the local filesystem
pub struct FsBackend {
    root: PathBuf,
    fsync: bool,
    tmp_counter: AtomicU64,
}

impl FsBackend {
    /// Open a backend at `root`, creating the directory if needed
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| Error::backend("open", root.display().to_string(), e))?;
        Ok(FsBackend {
            root,
            fsync: true,
            tmp_counter: AtomicU64::new(0),
        })
    }

    /// Enable or disable fsync of data and directories on write
    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_path(&self, dir: &ContentPath) -> PathBuf {
        let mut path = self.root.clone();
        for segment in dir.segments() {
            path.push(segment);
        }
        path
    }

    fn file_path(&self, key: &ContentPath) -> PathBuf {
        let mut path = self.root.clone();
        let segments: Vec<&str> = key.segments().collect();
        if let Some((last, parents)) = segments.split_last() {
            for segment in parents {
                path.push(segment);
            }
            path.push(format!("{}.{}", last, RECORD_EXTENSION));
        }
        path
    }

    /// Temp file next to `target`. The name is short and fixed-width
    /// so it fits wherever the target's name does.
    fn temp_path(&self, target: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        target.with_file_name(format!(".tmp-{}-{}", std::process::id(), n))
    }

    /// Create the temp file, recreating `parent` if a concurrent prune
    /// removed it in between
    fn create_temp(&self, parent: &Path, temp: &Path) -> std::io::Result<File> {
        let mut attempts = 0;
        loop {
            fs::create_dir_all(parent)?;
            match File::create(temp) {
                Err(e) if e.kind() == IoKind::NotFound && attempts < 3 => attempts += 1,
                other => return other,
            }
        }
    }

    /// Remove `dir` and its ancestors while they are empty. The
    /// top-level directory under the root is kept.
    fn prune_empty_dirs(&self, dir: &Path) {
        let mut current = dir;
        loop {
            let depth = match current.strip_prefix(&self.root) {
                Ok(relative) => relative.components().count(),
                Err(_) => return,
            };
            if depth < 2 || fs::remove_dir(current).is_err() {
                return;
            }
            tracing::trace!(dir = %current.display(), "pruned empty directory");
            match current.parent() {
                Some(parent) => current = parent,
                None => return,
            }
        }
    }

    fn key_from_file(&self, file: &Path) -> Option<ContentPath> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let mut parts = Vec::new();
        for component in relative.components() {
            parts.push(component.as_os_str().to_str()?.to_string());
        }
        let last = parts.pop()?;
        let stem = last.strip_suffix(&format!(".{}", RECORD_EXTENSION))?;
        parts.push(stem.to_string());
        ContentPath::parse(&parts.join("/")).ok()
    }

    fn sync_dir(&self, dir: &Path) {
        if !self.fsync {
            return;
        }
        // Directory fsync is only meaningful on unix
        #[cfg(unix)]
        {
            if let Ok(handle) = File::open(dir) {
                let _ = handle.sync_all();
            }
        }
        #[cfg(not(unix))]
        let _ = dir;
    }
}

/// Classify a failure to create or replace `key`
fn write_error(op: &'static str, key: &ContentPath, err: std::io::Error) -> Error {
    match err.kind() {
        IoKind::PermissionDenied
        | IoKind::InvalidInput
        | IoKind::InvalidFilename
        | IoKind::ReadOnlyFilesystem
        | IoKind::StorageFull
        | IoKind::QuotaExceeded
        | IoKind::FileTooLarge => Error::NotWritable {
            path: key.to_string(),
            reason: err.to_string(),
        },
        _ => Error::backend(op, key.to_string(), err),
    }
}

impl Backend for FsBackend {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn read(&self, key: &ContentPath) -> Result<Vec<u8>> {
        fs::read(self.file_path(key)).map_err(|e| match e.kind() {
            IoKind::NotFound => Error::NotExist(key.to_string()),
            _ => Error::backend("read", key.to_string(), e),
        })
    }

    fn write(&self, key: &ContentPath, data: &[u8]) -> Result<()> {
        let target = self.file_path(key);
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        let temp = self.temp_path(&target);
        let result = (|| -> std::io::Result<()> {
            let mut file = self.create_temp(&parent, &temp)?;
            file.write_all(data)?;
            if self.fsync {
                file.sync_all()?;
            }
            fs::rename(&temp, &target)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(write_error("write", key, e));
        }
        self.sync_dir(&parent);
        Ok(())
    }

    fn remove(&self, key: &ContentPath) -> Result<()> {
        let target = self.file_path(key);
        fs::remove_file(&target).map_err(|e| match e.kind() {
            IoKind::NotFound => Error::NotExist(key.to_string()),
            _ => write_error("remove", key, e),
        })?;
        if let Some(parent) = target.parent() {
            self.sync_dir(parent);
            self.prune_empty_dirs(parent);
        }
        Ok(())
    }

    fn rename(&self, from: &ContentPath, to: &ContentPath) -> Result<()> {
        let source = self.file_path(from);
        let target = self.file_path(to);
        if !source
            .try_exists()
            .map_err(|e| Error::backend("rename", from.to_string(), e))?
        {
            return Err(Error::NotExist(from.to_string()));
        }

        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        let mut attempts = 0;
        loop {
            fs::create_dir_all(&parent).map_err(|e| write_error("rename", to, e))?;
            match fs::rename(&source, &target) {
                Ok(()) => break,
                // The destination directory was pruned under us
                Err(e) if e.kind() == IoKind::NotFound && attempts < 3 && source.is_file() => {
                    attempts += 1
                }
                Err(e) if e.kind() == IoKind::NotFound => {
                    return Err(Error::NotExist(from.to_string()))
                }
                Err(e) => return Err(write_error("rename", to, e)),
            }
        }

        self.sync_dir(&parent);
        if let Some(old_parent) = source.parent() {
            if old_parent != parent {
                self.sync_dir(old_parent);
                self.prune_empty_dirs(old_parent);
            }
        }
        Ok(())
    }

    fn exists(&self, key: &ContentPath) -> Result<bool> {
        self.file_path(key)
            .try_exists()
            .map_err(|e| Error::backend("stat", key.to_string(), e))
    }

    fn list(&self, dir: &ContentPath) -> Result<Vec<ContentPath>> {
        let base = self.dir_path(dir);
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&base).min_depth(1) {
            let entry = entry.map_err(|e| Error::backend("list", dir.to_string(), e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            match self.key_from_file(entry.path()) {
                Some(key) if key.is_within(dir) => keys.push(key),
                Some(_) => {}
                None => {
                    // Temp files and foreign files are not entities
                    tracing::trace!(file = %entry.path().display(), "skipping non-record file");
                }
            }
        }
        Ok(keys)
    }
}

impl std::fmt::Debug for FsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBackend")
            .field("root", &self.root)
            .field("fsync", &self.fsync)
            .finish()
    }
}
