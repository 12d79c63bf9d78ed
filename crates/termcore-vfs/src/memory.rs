//! In-memory VFS implementation.
//!
//! Backs unit tests and sandboxed remote sessions. The tree is a
//! `BTreeMap` keyed by normalized absolute path, so a directory's
//! descendants are a contiguous key range starting at `"{dir}/"`.

use std::collections::BTreeMap;

use termcore_types::error::{Result, TermError};

use crate::{EntryKind, Vfs, VfsEntry, VfsMetadata, resolve_path};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// A fully in-memory virtual file system.
#[derive(Debug, Clone)]
pub struct MemoryVfs {
    nodes: BTreeMap<String, Node>,
}

impl MemoryVfs {
    /// Create a VFS containing only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        Self { nodes }
    }

    /// Number of files and directories, excluding the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Keys strictly below `dir`, in order.
    fn descendants<'a>(&'a self, dir: &str) -> impl Iterator<Item = (&'a String, &'a Node)> {
        let prefix = if dir == "/" {
            "/".to_string()
        } else {
            format!("{dir}/")
        };
        self.nodes
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| k.as_str() != "/")
    }

    fn require_parent_dir(&self, path: &str) -> Result<()> {
        let par = parent(path);
        match self.nodes.get(par) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(TermError::InvalidArgument(format!(
                "{par}: not a directory"
            ))),
            None => Err(TermError::NotFound(par.to_string())),
        }
    }
}

impl Default for MemoryVfs {
    fn default() -> Self {
        Self::new()
    }
}

/// Parent of a normalized path (`/` for top-level entries and the root).
fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

impl Vfs for MemoryVfs {
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>> {
        let path = resolve_path("/", path);
        match self.nodes.get(&path) {
            Some(Node::Dir) => {},
            Some(Node::File(_)) => {
                return Err(TermError::InvalidArgument(format!(
                    "{path}: not a directory"
                )));
            },
            None => return Err(TermError::NotFound(path)),
        }

        let skip = if path == "/" { 1 } else { path.len() + 1 };
        let entries = self
            .descendants(&path)
            .filter_map(|(key, node)| {
                let rest = &key[skip..];
                // Direct children only.
                (!rest.contains('/')).then(|| VfsEntry {
                    name: rest.to_string(),
                    kind: match node {
                        Node::Dir => EntryKind::Directory,
                        Node::File(_) => EntryKind::File,
                    },
                    size: match node {
                        Node::File(data) => data.len() as u64,
                        Node::Dir => 0,
                    },
                })
            })
            .collect();
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = resolve_path("/", path);
        match self.nodes.get(&path) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir) => Err(TermError::InvalidArgument(format!(
                "{path}: is a directory"
            ))),
            None => Err(TermError::NotFound(path)),
        }
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let path = resolve_path("/", path);
        if let Some(Node::Dir) = self.nodes.get(&path) {
            return Err(TermError::InvalidArgument(format!(
                "{path}: is a directory"
            )));
        }
        self.require_parent_dir(&path)?;
        self.nodes.insert(path, Node::File(data.to_vec()));
        Ok(())
    }

    fn stat(&self, path: &str) -> Result<VfsMetadata> {
        let path = resolve_path("/", path);
        match self.nodes.get(&path) {
            Some(Node::File(data)) => Ok(VfsMetadata {
                kind: EntryKind::File,
                size: data.len() as u64,
            }),
            Some(Node::Dir) => Ok(VfsMetadata {
                kind: EntryKind::Directory,
                size: 0,
            }),
            None => Err(TermError::NotFound(path)),
        }
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = resolve_path("/", path);
        if self.nodes.contains_key(&path) {
            return Err(TermError::InvalidArgument(format!("{path}: file exists")));
        }
        self.require_parent_dir(&path)?;
        self.nodes.insert(path, Node::Dir);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        let path = resolve_path("/", path);
        if path == "/" {
            return Err(TermError::PermissionDenied("/".to_string()));
        }
        match self.nodes.get(&path) {
            Some(Node::Dir) => {
                if self.descendants(&path).next().is_some() {
                    return Err(TermError::InvalidArgument(format!(
                        "{path}: directory not empty"
                    )));
                }
            },
            Some(Node::File(_)) => {},
            None => return Err(TermError::NotFound(path)),
        }
        self.nodes.remove(&path);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let from = resolve_path("/", from);
        let to = resolve_path("/", to);
        if from == "/" {
            return Err(TermError::PermissionDenied("/".to_string()));
        }
        if !self.nodes.contains_key(&from) {
            return Err(TermError::NotFound(from));
        }
        if self.nodes.contains_key(&to) {
            return Err(TermError::InvalidArgument(format!("{to}: file exists")));
        }
        if to.starts_with(&format!("{from}/")) {
            return Err(TermError::InvalidArgument(format!(
                "cannot move {from} into itself"
            )));
        }
        self.require_parent_dir(&to)?;

        // Move the node and, for directories, its whole subtree.
        let moved: Vec<String> = std::iter::once(from.clone())
            .chain(self.descendants(&from).map(|(k, _)| k.clone()))
            .collect();
        for old in moved {
            if let Some(node) = self.nodes.remove(&old) {
                let new = format!("{to}{}", &old[from.len()..]);
                self.nodes.insert(new, node);
            }
        }
        Ok(())
    }

    fn label(&self) -> String {
        "memory".to_string()
    }

    fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(&resolve_path("/", path))
    }
}
