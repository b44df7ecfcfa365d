//! FUSE filesystem implementation over the in-memory core.
//!
//! The kernel addresses inodes by number while the core speaks paths, so
//! the bridge keeps the last known path for every inode the kernel has
//! looked up. Creation callbacks and `lookup` populate the table, `rename`
//! repairs it, `forget` prunes it. Open files and directories are tracked
//! as fh → handle maps; handle-based reads and writes keep working after
//! the name is unlinked.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use libc::c_int;

use memfs_core::Filesystem as CoreFilesystem;
use memfs_core::{Attributes, DirHandle, FileHandle, FsError, NodeId, NodeKind, ROOT_NODE};

/// Attribute TTL handed to the kernel. Attributes change only through this
/// mount, so a short fixed TTL is enough.
const TTL: Duration = Duration::from_secs(1);

/// In-memory FUSE filesystem.
pub struct MemFs {
    /// The inode graph.
    fs: CoreFilesystem,
    /// Last known path for every inode the kernel has looked up.
    paths: HashMap<NodeId, String>,
    /// Open regular files by kernel file handle.
    files: HashMap<u64, FileHandle>,
    /// Open directories by kernel file handle.
    dirs: HashMap<u64, DirHandle>,
    /// Next file handle id.
    next_fh: u64,
}

impl MemFs {
    /// Create an empty filesystem ready to mount.
    pub fn new() -> Self {
        let mut paths: HashMap<NodeId, String> = HashMap::new();
        paths.insert(ROOT_NODE, "/".to_string());

        Self {
            fs: CoreFilesystem::new(),
            paths,
            files: HashMap::new(),
            dirs: HashMap::new(),
            next_fh: 1,
        }
    }

    /// Number of live inodes (diagnostics).
    pub fn node_count(&self) -> usize {
        self.fs.node_count()
    }

    /// Path of a known inode.
    fn path_of(&self, ino: u64) -> Option<&str> {
        self.paths.get(&ino).map(String::as_str)
    }

    /// Path of `name` inside the directory inode `parent`.
    fn child_path(&self, parent: u64, name: &OsStr) -> Option<String> {
        let name: &str = name.to_str()?;
        let parent_path: &str = self.path_of(parent)?;
        Some(join_path(parent_path, name))
    }

    /// Allocate a kernel-visible handle id.
    fn allocate_fh(&mut self) -> u64 {
        let fh: u64 = self.next_fh;
        self.next_fh += 1;
        fh
    }

    /// Record an inode's path and build the kernel attribute struct.
    fn remember(&mut self, attr: Attributes, path: String) -> FileAttr {
        self.paths.insert(attr.ino, path);
        to_file_attr(&attr)
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

/// Join a parent path and an entry name.
fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Map a core error kind onto the errno the kernel expects.
fn errno_of(err: FsError) -> c_int {
    match err {
        FsError::NoSuchEntry => libc::ENOENT,
        FsError::NotADirectory => libc::ENOTDIR,
        FsError::IsADirectory => libc::EISDIR,
        FsError::AlreadyExists => libc::EEXIST,
        FsError::NotEmpty => libc::ENOTEMPTY,
        FsError::NotPermitted => libc::EPERM,
        FsError::Busy => libc::EBUSY,
        FsError::InvalidPath => libc::EINVAL,
        FsError::BadHandle => libc::EBADF,
        FsError::OutOfSpace => libc::ENOSPC,
    }
}

/// Convert core attributes to the kernel attribute struct.
fn to_file_attr(attr: &Attributes) -> FileAttr {
    let kind: FileType = match attr.kind {
        NodeKind::File => FileType::RegularFile,
        NodeKind::Directory => FileType::Directory,
    };

    FileAttr {
        ino: attr.ino,
        size: attr.size,
        blocks: (attr.size + 511) / 512,
        atime: UNIX_EPOCH,
        mtime: UNIX_EPOCH,
        ctime: UNIX_EPOCH,
        crtime: UNIX_EPOCH,
        kind,
        perm: (attr.mode & 0o7777) as u16,
        nlink: attr.nlink,
        uid: attr.uid,
        gid: attr.gid,
        rdev: 0,
        blksize: 512,
        flags: 0,
    }
}

impl Filesystem for MemFs {
    fn init(&mut self, _req: &Request, _config: &mut KernelConfig) -> Result<(), c_int> {
        tracing::info!("filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("destroying the filesystem");
        self.fs.teardown();
        let remaining: usize = self.fs.node_count();
        if remaining > 0 {
            tracing::warn!(remaining, "orphan inodes survived teardown");
        }
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path: String = match self.child_path(parent, name) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match self.fs.getattr(&path) {
            Ok(attr) => {
                let file_attr: FileAttr = self.remember(attr, path);
                reply.entry(&TTL, &file_attr, 0);
            }
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn forget(&mut self, _req: &Request, ino: u64, _nlookup: u64) {
        if ino != ROOT_NODE {
            self.paths.remove(&ino);
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.fs.getattr(path) {
            Ok(attr) => reply.attr(&TTL, &to_file_attr(&attr)),
            Err(err) => reply.error(errno_of(err)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let Some(path) = self.path_of(ino).map(str::to_string) else {
            reply.error(libc::ENOENT);
            return;
        };

        // only the size is mutable; everything else is acknowledged as-is
        if let Some(new_size) = size {
            if let Err(err) = self.fs.truncate(&path, new_size) {
                reply.error(errno_of(err));
                return;
            }
        }

        match self.fs.getattr(&path) {
            Ok(attr) => reply.attr(&TTL, &to_file_attr(&attr)),
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn mknod(
        &mut self,
        req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        tracing::trace!("mknod: {}", path);

        match self.fs.mknod(&path, mode, req.uid(), req.gid()) {
            Ok(attr) => {
                let file_attr: FileAttr = self.remember(attr, path);
                reply.entry(&TTL, &file_attr, 0);
            }
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn mkdir(
        &mut self,
        req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        tracing::trace!("mkdir: {}", path);

        match self.fs.mkdir(&path, mode, req.uid(), req.gid()) {
            Ok(attr) => {
                let file_attr: FileAttr = self.remember(attr, path);
                reply.entry(&TTL, &file_attr, 0);
            }
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        tracing::trace!("unlink: {}", path);

        let ino: Option<NodeId> = self.fs.getattr(&path).ok().map(|attr| attr.ino);
        match self.fs.unlink(&path) {
            Ok(()) => {
                if let Some(ino) = ino {
                    // drop the mapping only if it still points at this name
                    if self.paths.get(&ino).map(String::as_str) == Some(path.as_str()) {
                        self.paths.remove(&ino);
                    }
                }
                reply.ok();
            }
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        tracing::trace!("rmdir: {}", path);

        let ino: Option<NodeId> = self.fs.getattr(&path).ok().map(|attr| attr.ino);
        match self.fs.rmdir(&path) {
            Ok(()) => {
                if let Some(ino) = ino {
                    self.paths.remove(&ino);
                }
                reply.ok();
            }
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let (Some(old), Some(new)) = (
            self.child_path(parent, name),
            self.child_path(newparent, newname),
        ) else {
            reply.error(libc::ENOENT);
            return;
        };
        tracing::trace!("rename: {} -> {}", old, new);

        match self.fs.rename(&old, &new) {
            Ok(()) => {
                // repair the cached paths of the moved node and its subtree
                let prefix: String = format!("{}/", old);
                for path in self.paths.values_mut() {
                    if *path == old {
                        *path = new.clone();
                    } else if let Some(rest) = path.strip_prefix(&prefix) {
                        *path = format!("{}/{}", new, rest);
                    }
                }
                reply.ok();
            }
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn link(
        &mut self,
        _req: &Request,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let (Some(existing), Some(new)) = (
            self.path_of(ino).map(str::to_string),
            self.child_path(newparent, newname),
        ) else {
            reply.error(libc::ENOENT);
            return;
        };
        tracing::trace!("link: {} -> {}", existing, new);

        match self.fs.link(&existing, &new) {
            Ok(attr) => {
                let file_attr: FileAttr = to_file_attr(&attr);
                reply.entry(&TTL, &file_attr, 0);
            }
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        let Some(path) = self.path_of(ino).map(str::to_string) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.fs.open(&path) {
            Ok(handle) => {
                let fh: u64 = self.allocate_fh();
                self.files.insert(fh, handle);
                reply.opened(fh, 0);
            }
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(handle) = self.files.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }

        match self.fs.read(handle, offset as u64, size) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(handle) = self.files.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }

        match self.fs.write(handle, offset as u64, data) {
            Ok(written) => reply.written(written as u32),
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.files.remove(&fh) {
            Some(handle) => match self.fs.release(handle) {
                Ok(()) => reply.ok(),
                Err(err) => reply.error(errno_of(err)),
            },
            None => reply.error(libc::EBADF),
        }
    }

    fn opendir(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.fs.opendir(path) {
            Ok(handle) => {
                let fh: u64 = self.allocate_fh();
                self.dirs.insert(fh, handle);
                reply.opened(fh, 0);
            }
            Err(err) => reply.error(errno_of(err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(handle) = self.dirs.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };

        let entries = match self.fs.readdir(handle) {
            Ok(entries) => entries,
            Err(err) => {
                reply.error(errno_of(err));
                return;
            }
        };

        for (i, entry) in entries.iter().enumerate().skip(offset as usize) {
            let kind: FileType = match entry.kind {
                NodeKind::File => FileType::RegularFile,
                NodeKind::Directory => FileType::Directory,
            };
            if reply.add(entry.ino, (i + 1) as i64, kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request, _ino: u64, fh: u64, _flags: i32, reply: ReplyEmpty) {
        match self.dirs.remove(&fh) {
            Some(handle) => {
                let _ = self.fs.releasedir(handle);
                reply.ok();
            }
            None => reply.error(libc::EBADF),
        }
    }
}

/// Mount options every memfs mount uses.
pub fn default_options() -> Vec<MountOption> {
    vec![
        MountOption::FSName("memfs".to_string()),
        MountOption::AutoUnmount,
    ]
}

/// Mount the filesystem, blocking until it is unmounted.
pub fn mount(memfs: MemFs, mountpoint: &Path, options: &[MountOption]) -> std::io::Result<()> {
    fuser::mount2(memfs, mountpoint, options)
}

/// Mount the filesystem in a background session.
pub fn spawn_mount(
    memfs: MemFs,
    mountpoint: &Path,
    options: &[MountOption],
) -> std::io::Result<fuser::BackgroundSession> {
    fuser::spawn_mount2(memfs, mountpoint, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "f"), "/f");
        assert_eq!(join_path("/a", "b"), "/a/b");
        assert_eq!(join_path("/a/b", "c.txt"), "/a/b/c.txt");
    }

    #[test]
    fn test_errno_mapping() {
        assert_eq!(errno_of(FsError::NoSuchEntry), libc::ENOENT);
        assert_eq!(errno_of(FsError::NotADirectory), libc::ENOTDIR);
        assert_eq!(errno_of(FsError::IsADirectory), libc::EISDIR);
        assert_eq!(errno_of(FsError::AlreadyExists), libc::EEXIST);
        assert_eq!(errno_of(FsError::NotEmpty), libc::ENOTEMPTY);
        assert_eq!(errno_of(FsError::Busy), libc::EBUSY);
        assert_eq!(errno_of(FsError::OutOfSpace), libc::ENOSPC);
    }

    #[test]
    fn test_to_file_attr() {
        let attr: Attributes = Attributes {
            ino: 7,
            mode: memfs_core::inode::MODE_REGULAR | 0o640,
            uid: 1000,
            gid: 100,
            nlink: 2,
            size: 1030,
            kind: NodeKind::File,
        };

        let file_attr: FileAttr = to_file_attr(&attr);
        assert_eq!(file_attr.ino, 7);
        assert_eq!(file_attr.kind, FileType::RegularFile);
        assert_eq!(file_attr.perm, 0o640);
        assert_eq!(file_attr.nlink, 2);
        assert_eq!(file_attr.size, 1030);
        assert_eq!(file_attr.blocks, 3);
        assert_eq!(file_attr.uid, 1000);
        assert_eq!(file_attr.gid, 100);
    }

    #[test]
    fn test_new_bridge_knows_root() {
        let memfs: MemFs = MemFs::new();
        assert_eq!(memfs.path_of(ROOT_NODE), Some("/"));
        assert_eq!(memfs.node_count(), 1);
    }
}
