//! VFS backed by a directory on the host file system.
//!
//! Virtual `/` maps onto the configured root. Paths are normalized with
//! [`resolve_path`] before being joined, so `..` never climbs above the
//! root.

use std::fs;
use std::path::{Path, PathBuf};

use termcore_types::error::{Result, TermError};

use crate::{EntryKind, Vfs, VfsEntry, VfsMetadata, resolve_path};

/// A VFS exposing a host directory.
#[derive(Debug, Clone)]
pub struct HostVfs {
    root: PathBuf,
}

impl HostVfs {
    /// Expose `root` as `/`. The directory must exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let display = root.display().to_string();
        let root = fs::canonicalize(&root).map_err(|e| TermError::from_io(&display, e))?;
        if !root.is_dir() {
            return Err(TermError::InvalidArgument(format!(
                "{display}: not a directory"
            )));
        }
        log::debug!("Host VFS rooted at {}", root.display());
        Ok(Self { root })
    }

    /// Translate a host path under the root into a virtual path.
    ///
    /// Returns `None` when `host` lies outside the root.
    pub fn to_virtual(&self, host: &Path) -> Option<String> {
        let rel = host.strip_prefix(&self.root).ok()?;
        let joined = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Some(resolve_path("/", &joined))
    }

    fn host_path(&self, path: &str) -> (String, PathBuf) {
        let virt = resolve_path("/", path);
        let host = self.root.join(virt.trim_start_matches('/'));
        (virt, host)
    }
}

fn kind_of(meta: &fs::Metadata) -> EntryKind {
    if meta.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

impl Vfs for HostVfs {
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>> {
        let (virt, host) = self.host_path(path);
        let iter = fs::read_dir(&host).map_err(|e| TermError::from_io(&virt, e))?;
        let mut entries = Vec::new();
        for entry in iter {
            let entry = entry.map_err(|e| TermError::from_io(&virt, e))?;
            // Follow symlinks; skip dangling ones.
            let Ok(meta) = fs::metadata(entry.path()) else {
                continue;
            };
            entries.push(VfsEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: kind_of(&meta),
                size: if meta.is_dir() { 0 } else { meta.len() },
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let (virt, host) = self.host_path(path);
        if host.is_dir() {
            return Err(TermError::InvalidArgument(format!("{virt}: is a directory")));
        }
        fs::read(&host).map_err(|e| TermError::from_io(&virt, e))
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let (virt, host) = self.host_path(path);
        fs::write(&host, data).map_err(|e| TermError::from_io(&virt, e))
    }

    fn stat(&self, path: &str) -> Result<VfsMetadata> {
        let (virt, host) = self.host_path(path);
        let meta = fs::metadata(&host).map_err(|e| TermError::from_io(&virt, e))?;
        Ok(VfsMetadata {
            kind: kind_of(&meta),
            size: if meta.is_dir() { 0 } else { meta.len() },
        })
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        let (virt, host) = self.host_path(path);
        fs::create_dir(&host).map_err(|e| TermError::from_io(&virt, e))
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        let (virt, host) = self.host_path(path);
        if virt == "/" {
            return Err(TermError::PermissionDenied(virt));
        }
        let meta = fs::symlink_metadata(&host).map_err(|e| TermError::from_io(&virt, e))?;
        let res = if meta.is_dir() {
            fs::remove_dir(&host)
        } else {
            fs::remove_file(&host)
        };
        res.map_err(|e| TermError::from_io(&virt, e))
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let (from_virt, from_host) = self.host_path(from);
        let (to_virt, to_host) = self.host_path(to);
        if from_virt == "/" {
            return Err(TermError::PermissionDenied(from_virt));
        }
        if to_host.exists() {
            return Err(TermError::InvalidArgument(format!("{to_virt}: file exists")));
        }
        fs::rename(&from_host, &to_host).map_err(|e| TermError::from_io(&from_virt, e))
    }

    fn label(&self) -> String {
        self.root.display().to_string()
    }

    fn host_root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}
