//! Virtual file system used by the terminal's file commands.
//!
//! Commands never touch `std::fs` directly. They see absolute virtual
//! paths (`/docs/a.txt`) and go through the [`Vfs`] trait, which is backed
//! either by memory ([`MemoryVfs`]) or by a host directory ([`HostVfs`]).

mod host;
mod memory;

pub use host::HostVfs;
pub use memory::MemoryVfs;

use termcore_types::error::{Result, TermError};

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry returned by [`Vfs::readdir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEntry {
    /// Entry name (no directory part).
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

/// Result of [`Vfs::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsMetadata {
    pub kind: EntryKind,
    pub size: u64,
}

impl VfsMetadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// File system operations available to commands.
///
/// All paths are absolute virtual paths; use [`resolve_path`] to turn user
/// input into one.
pub trait Vfs: Send {
    /// List a directory, sorted by name.
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>>;

    /// Read a whole file.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Create or replace a file. The parent directory must exist.
    fn write(&mut self, path: &str, data: &[u8]) -> Result<()>;

    /// Query the kind and size of a path.
    fn stat(&self, path: &str) -> Result<VfsMetadata>;

    /// Create one directory. Fails if the path exists or the parent is
    /// missing.
    fn mkdir(&mut self, path: &str) -> Result<()>;

    /// Remove a file or an empty directory.
    fn remove(&mut self, path: &str) -> Result<()>;

    /// Move a file or directory. Fails if the destination exists.
    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Short description of the backing store (shown by `df`).
    fn label(&self) -> String;

    /// Host directory backing `/`, if there is one.
    fn host_root(&self) -> Option<&std::path::Path> {
        None
    }

    /// Whether a path exists.
    fn exists(&self, path: &str) -> bool {
        self.stat(path).is_ok()
    }

    /// Create a directory and any missing parents. Existing directories
    /// along the way are fine; an existing file is not.
    fn mkdir_all(&mut self, path: &str) -> Result<()> {
        let normalized = resolve_path("/", path);
        let mut current = String::new();
        for component in normalized.split('/').filter(|c| !c.is_empty()) {
            current.push('/');
            current.push_str(component);
            match self.stat(&current) {
                Ok(meta) if meta.is_dir() => {},
                Ok(_) => {
                    return Err(TermError::InvalidArgument(format!(
                        "{current}: not a directory"
                    )));
                },
                Err(_) => self.mkdir(&current)?,
            }
        }
        Ok(())
    }
}

/// Resolve a possibly-relative path against the current working directory.
///
/// `.` and `..` are folded; `..` at the root stays at the root.
pub fn resolve_path(cwd: &str, input: &str) -> String {
    let raw = if input.starts_with('/') {
        input.to_string()
    } else if cwd == "/" {
        format!("/{input}")
    } else {
        format!("{cwd}/{input}")
    };

    let mut parts: Vec<&str> = Vec::new();
    for component in raw.split('/') {
        match component {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Final component of a virtual path (`""` for the root).
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Join a directory and an entry name.
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}
