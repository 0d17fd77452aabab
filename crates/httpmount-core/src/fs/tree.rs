//! Root directory holding exactly one remote file.

use std::sync::Arc;

use crate::attrs::{FileAttributes, NodeKind};
use crate::error::MountError;
use crate::remote_file::{RemoteFile, RemoteFileOptions};
use crate::url_model::mount_file_name;

/// Inode of the root directory (FUSE_ROOT_ID).
pub const ROOT_INO: u64 = 1;
/// Inode of the single remote file, fixed for the mount's lifetime.
pub const FILE_INO: u64 = 2;

/// The attached child: its identity, name and backing file.
#[derive(Debug, Clone)]
pub struct FileNode {
    pub ino: u64,
    pub name: String,
    pub file: Arc<RemoteFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: u64,
    pub kind: NodeKind,
    pub name: String,
}

/// Root node of the mount. Holds the URL until attach, then owns the one
/// child node for the rest of the process.
#[derive(Debug)]
pub struct MountTree {
    url: String,
    name_override: Option<String>,
    options: RemoteFileOptions,
    child: Option<FileNode>,
}

impl MountTree {
    pub fn new(url: impl Into<String>, name_override: Option<String>, options: RemoteFileOptions) -> Self {
        Self {
            url: url.into(),
            name_override,
            options,
            child: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_attached(&self) -> bool {
        self.child.is_some()
    }

    /// Probes the remote file and registers it under its fixed name.
    ///
    /// Called once. A failed probe leaves the tree empty and the error must
    /// abort the mount; a second call is rejected.
    pub fn attach(&mut self) -> Result<&FileNode, MountError> {
        if self.child.is_some() {
            return Err(MountError::AlreadyAttached);
        }
        let file = RemoteFile::probe(&self.url, FILE_INO, &self.options)?;
        let name = mount_file_name(&self.url, self.name_override.as_deref());
        tracing::info!(name = %name, size = file.size(), "attached remote file");
        Ok(self.child.insert(FileNode {
            ino: FILE_INO,
            name,
            file: Arc::new(file),
        }))
    }

    pub fn child(&self) -> Option<&FileNode> {
        self.child.as_ref()
    }

    pub fn file_node(&self, ino: u64) -> Option<&FileNode> {
        self.child.as_ref().filter(|c| c.ino == ino)
    }

    /// What `ino` is, or `None` if no such inode exists.
    pub fn kind(&self, ino: u64) -> Option<NodeKind> {
        if ino == ROOT_INO {
            return Some(NodeKind::Directory);
        }
        self.file_node(ino).map(|_| NodeKind::File)
    }

    /// Root answers for itself; the file delegates to its RemoteFile.
    pub fn attributes(&self, ino: u64) -> Option<FileAttributes> {
        if ino == ROOT_INO {
            return Some(FileAttributes::directory());
        }
        self.file_node(ino).map(|n| n.file.attributes())
    }

    pub fn lookup(&self, parent: u64, name: &str) -> Option<&FileNode> {
        if parent != ROOT_INO {
            return None;
        }
        self.child.as_ref().filter(|c| c.name == name)
    }

    /// Directory listing for `ino`, or `None` if it is not a directory.
    pub fn entries(&self, ino: u64) -> Option<Vec<DirEntry>> {
        if ino != ROOT_INO {
            return None;
        }
        let mut entries = vec![
            DirEntry {
                ino: ROOT_INO,
                kind: NodeKind::Directory,
                name: ".".to_string(),
            },
            DirEntry {
                ino: ROOT_INO,
                kind: NodeKind::Directory,
                name: "..".to_string(),
            },
        ];
        if let Some(c) = &self.child {
            entries.push(DirEntry {
                ino: c.ino,
                kind: NodeKind::File,
                name: c.name.clone(),
            });
        }
        Some(entries)
    }
}
