//! `fuser::Filesystem` implementation over the mount tree.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, Request,
};

use super::dispatch::ReadDispatcher;
use super::tree::{MountTree, ROOT_INO};
use crate::attrs::{FileAttributes, NodeKind, BLOCK_SIZE};
use crate::error::MountError;

/// How long the kernel may cache attributes and entries.
const TTL: Duration = Duration::from_secs(1);

/// Convert attributes into the kernel's representation.
pub fn to_file_attr(ino: u64, attrs: &FileAttributes) -> FileAttr {
    let kind = match attrs.kind {
        NodeKind::Directory => FileType::Directory,
        NodeKind::File => FileType::RegularFile,
    };
    FileAttr {
        ino,
        size: attrs.size_bytes,
        blocks: attrs.block_count,
        atime: attrs.atime,
        mtime: attrs.mtime,
        ctime: attrs.ctime,
        crtime: UNIX_EPOCH,
        kind,
        perm: attrs.mode,
        nlink: attrs.link_count,
        uid: unsafe { libc::getuid() },
        gid: unsafe { libc::getgid() },
        rdev: 0,
        blksize: attrs.block_size,
        flags: 0,
    }
}

/// Reply flags for `open`, or the errno refusing it.
pub fn open_flags(kind: Option<NodeKind>, flags: i32) -> Result<u32, libc::c_int> {
    match kind {
        None => Err(libc::ENOENT),
        Some(NodeKind::Directory) => Err(libc::EISDIR),
        Some(NodeKind::File) if flags & libc::O_ACCMODE != libc::O_RDONLY => Err(libc::EROFS),
        // No per-open state: reads are keyed by offset and length alone.
        Some(NodeKind::File) => Ok(fuser::consts::FOPEN_KEEP_CACHE),
    }
}

/// Byte offset for a read, or the errno refusing it.
pub fn read_offset(kind: Option<NodeKind>, offset: i64) -> Result<u64, libc::c_int> {
    match kind {
        None => Err(libc::ENOENT),
        Some(NodeKind::Directory) => Err(libc::EISDIR),
        Some(NodeKind::File) => u64::try_from(offset).map_err(|_| libc::EINVAL),
    }
}

/// Checks that `kind` can be listed.
pub fn readdir_check(kind: Option<NodeKind>) -> Result<(), libc::c_int> {
    match kind {
        None => Err(libc::ENOENT),
        Some(NodeKind::File) => Err(libc::ENOTDIR),
        Some(NodeKind::Directory) => Ok(()),
    }
}

/// Read-only filesystem exposing one remote file.
pub struct HttpMountFs {
    tree: MountTree,
    dispatcher: Option<ReadDispatcher>,
    worker_threads: usize,
}

impl HttpMountFs {
    /// `tree` may already be attached (the CLI probes before mounting so a
    /// bad origin is reported without touching the mountpoint); otherwise
    /// `init` attaches it.
    pub fn new(tree: MountTree, worker_threads: usize) -> Self {
        Self {
            tree,
            dispatcher: None,
            worker_threads,
        }
    }

    pub fn tree(&self) -> &MountTree {
        &self.tree
    }

    fn start_dispatcher(&mut self) {
        if self.dispatcher.is_some() {
            return;
        }
        if let Some(node) = self.tree.child() {
            self.dispatcher = Some(ReadDispatcher::new(
                Arc::clone(&node.file),
                self.worker_threads,
            ));
        }
    }
}

impl Filesystem for HttpMountFs {
    fn init(&mut self, _req: &Request<'_>, config: &mut KernelConfig) -> Result<(), libc::c_int> {
        if !self.tree.is_attached() {
            if let Err(e) = self.tree.attach() {
                tracing::error!(error = %e, "attach failed, refusing mount");
                return Err(libc::EIO);
            }
        }
        if let Err(nearest) = config.set_max_readahead(BLOCK_SIZE as u32) {
            tracing::debug!(nearest, "kernel capped max readahead");
            let _ = config.set_max_readahead(nearest);
        }
        self.start_dispatcher();
        tracing::info!(url = self.tree.url(), "filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(mut dispatcher) = self.dispatcher.take() {
            dispatcher.shutdown();
        }
        tracing::info!("filesystem unmounted");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.tree.lookup(parent, name) {
            Some(node) => reply.entry(&TTL, &to_file_attr(node.ino, &node.file.attributes()), 0),
            None => reply.error(libc::ENOENT),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.tree.attributes(ino) {
            Some(attrs) => reply.attr(&TTL, &to_file_attr(ino, &attrs)),
            None => reply.error(libc::ENOENT),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match open_flags(self.tree.kind(ino), flags) {
            Ok(open_flags) => reply.opened(0, open_flags),
            Err(errno) => reply.error(errno),
        }
    }

    fn read(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let offset = match read_offset(self.tree.kind(ino), offset) {
            Ok(offset) => offset,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };
        let Some(dispatcher) = &self.dispatcher else {
            reply.error(libc::EIO);
            return;
        };
        dispatcher.dispatch(req.unique(), offset, size, move |result| match result {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        });
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        if let Err(errno) = readdir_check(self.tree.kind(ino)) {
            reply.error(errno);
            return;
        }
        let Some(entries) = self.tree.entries(ino) else {
            reply.error(libc::ENOTDIR);
            return;
        };
        for (i, entry) in entries.iter().enumerate().skip(offset.max(0) as usize) {
            let kind = match entry.kind {
                NodeKind::Directory => FileType::Directory,
                NodeKind::File => FileType::RegularFile,
            };
            if reply.add(entry.ino, (i + 1) as i64, kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }
}

/// Options for a read-only mount named after the tool.
///
/// fuser turns AutoUnmount into allow_other when neither allow_other nor
/// allow_root is given, which fusermount refuses for unprivileged users
/// without `user_allow_other`. AutoUnmount is therefore tied to allow_other.
pub fn mount_options(allow_other: bool) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::RO,
        MountOption::FSName("httpmount".into()),
        MountOption::Subtype("httpmount".into()),
    ];
    if allow_other {
        options.push(MountOption::AllowOther);
        options.push(MountOption::AutoUnmount);
    }
    options
}

/// Rejects a mountpoint that is not an existing directory.
pub fn check_mountpoint(mountpoint: &Path) -> Result<(), MountError> {
    if mountpoint.is_dir() {
        Ok(())
    } else {
        Err(MountError::Config(format!(
            "mountpoint {} is not a directory",
            mountpoint.display()
        )))
    }
}

/// Mount `fs` at `mountpoint` and serve requests until unmounted.
pub fn mount(fs: HttpMountFs, mountpoint: &Path, allow_other: bool) -> Result<(), MountError> {
    check_mountpoint(mountpoint)?;
    fuser::mount2(fs, mountpoint, &mount_options(allow_other)).map_err(MountError::Mount)
}
