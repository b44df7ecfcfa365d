//! The filesystem container and its operation surface.
//!
//! `Filesystem` owns the node table and exposes the path- and handle-based
//! operations the bridge calls. All mutation goes through the three
//! namespace primitives (`add_node`, `move_node`, `release_node`), which
//! maintain link counts, parent pointers, and name uniqueness.

use crate::error::FsError;
use crate::inode::{
    Attributes, DirEntry, Entry, Inode, Listing, NodeId, NodeTable, MODE_DIRECTORY, NAME_MAX,
    ROOT_NODE,
};
use crate::resolve::{resolve, resolve_parent};

/// Handle to an open regular file.
///
/// Obtained from [`Filesystem::open`], which increments the inode's open
/// count; retired by [`Filesystem::release`]. The handle stays valid after
/// the file is unlinked (orphan state).
#[derive(Debug)]
pub struct FileHandle {
    node: NodeId,
}

impl FileHandle {
    /// Node id of the open file.
    pub fn ino(&self) -> NodeId {
        self.node
    }
}

/// Handle to an open directory, obtained from [`Filesystem::opendir`].
#[derive(Debug)]
pub struct DirHandle {
    node: NodeId,
}

impl DirHandle {
    /// Node id of the open directory.
    pub fn ino(&self) -> NodeId {
        self.node
    }
}

/// An in-memory filesystem: a node table rooted at `ROOT_NODE`.
#[derive(Debug)]
pub struct Filesystem {
    nodes: NodeTable,
}

impl Filesystem {
    /// Create a filesystem containing only the root directory.
    ///
    /// The root is its own parent, carries mode `S_IFDIR | 0o777`, and
    /// starts with `nlink == 3`: the self-reference standing in for a
    /// parent entry, its own `.`, and its own `..`. Normal operations can
    /// therefore never drop it to zero.
    pub fn new() -> Self {
        let mut nodes: NodeTable = NodeTable::new();
        let root: NodeId = nodes.insert(Inode::new_directory(MODE_DIRECTORY | 0o777, 0, 0));
        debug_assert_eq!(root, ROOT_NODE);

        if let Some(node) = nodes.get_mut(root) {
            node.parent = Some(root);
            node.nlink = 1;
            if let Some(listing) = node.listing_mut() {
                listing.init_dots(root, root);
            }
            node.nlink += 2;
        }

        Self { nodes }
    }

    /// Number of live inodes, orphans included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ---- namespace primitives ----

    /// Attach an existing node at `path`.
    ///
    /// Appends a (name, node) entry to the parent listing, increments the
    /// node's link count, and sets its parent pointer if it was unset (the
    /// first directory that receives a node stays its canonical parent).
    ///
    /// # Returns
    /// The parent directory's id.
    fn add_node(&mut self, path: &str, id: NodeId) -> Result<NodeId, FsError> {
        let (parent, name) = resolve_parent(&self.nodes, path, ROOT_NODE)?;
        if name.len() > NAME_MAX {
            return Err(FsError::InvalidPath);
        }
        if self.dir_listing(parent)?.lookup(name).is_some() {
            return Err(FsError::AlreadyExists);
        }

        self.dir_listing_mut(parent)?.append(name, id)?;

        let node: &mut Inode = self.nodes.get_mut(id).ok_or(FsError::NoSuchEntry)?;
        node.nlink += 1;
        if node.parent.is_none() {
            node.parent = Some(parent);
        }

        Ok(parent)
    }

    /// Relocate the entry at `old` to `new`.
    ///
    /// Link counts are conserved; neither the node's parent pointer nor a
    /// moved directory's `..` entry is rewritten. Space in the destination
    /// listing is reserved up front so the entry cannot be lost midway.
    fn move_node(&mut self, old: &str, new: &str) -> Result<NodeId, FsError> {
        let (old_parent, old_name) = resolve_parent(&self.nodes, old, ROOT_NODE)?;
        let (new_parent, new_name) = resolve_parent(&self.nodes, new, ROOT_NODE)?;
        if new_name.len() > NAME_MAX {
            return Err(FsError::InvalidPath);
        }

        self.dir_listing_mut(new_parent)?.reserve_one()?;
        let moved: NodeId = self.dir_listing_mut(old_parent)?.remove(old_name)?;
        self.dir_listing_mut(new_parent)?.append(new_name, moved)?;

        Ok(moved)
    }

    /// Detach the entry at `path`; destroy the node if it becomes
    /// unreferenced.
    ///
    /// Directories must be empty; their `..` back-reference to the parent
    /// is cancelled against the parent's link count. Regular files with
    /// outstanding opens survive as orphans until the last release.
    fn release_node(&mut self, path: &str) -> Result<(), FsError> {
        let (parent, name) = resolve_parent(&self.nodes, path, ROOT_NODE)?;
        let id: NodeId = resolve(&self.nodes, name, parent)?;

        let is_dir: bool = self.nodes.get(id).ok_or(FsError::NoSuchEntry)?.is_dir();
        if is_dir {
            if !self.dir_listing(id)?.is_empty() {
                return Err(FsError::NotEmpty);
            }
            debug_assert_eq!(self.nodes.get(id).map(|n| n.nlink), Some(2));
            self.dir_listing_mut(id)?.remove("..")?;
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                // the removed .. was referencing the parent
                parent_node.nlink = parent_node.nlink.saturating_sub(1);
            }
            self.nodes.remove(id);
        } else if let Some(node) = self.nodes.get_mut(id) {
            node.nlink = node.nlink.saturating_sub(1);
            if node.nlink == 0 && node.nopen == 0 {
                self.nodes.remove(id);
            }
        }

        self.dir_listing_mut(parent)?.remove(name)?;
        Ok(())
    }

    // ---- operation surface ----

    /// Attributes of the node `path` names.
    pub fn getattr(&self, path: &str) -> Result<Attributes, FsError> {
        let id: NodeId = resolve(&self.nodes, path, ROOT_NODE)?;
        self.attributes(id)
    }

    /// Create a regular file at `path`.
    pub fn mknod(&mut self, path: &str, mode: u32, uid: u32, gid: u32) -> Result<Attributes, FsError> {
        let id: NodeId = self.nodes.insert(Inode::new_file(mode, uid, gid));
        if let Err(err) = self.add_node(path, id) {
            self.nodes.remove(id);
            return Err(err);
        }
        self.attributes(id)
    }

    /// Create a directory at `path`, with its `.` and `..` entries
    /// installed and the parent's link count raised for the new `..`.
    pub fn mkdir(&mut self, path: &str, mode: u32, uid: u32, gid: u32) -> Result<Attributes, FsError> {
        let id: NodeId = self.nodes.insert(Inode::new_directory(mode, uid, gid));
        let parent: NodeId = match self.add_node(path, id) {
            Ok(parent) => parent,
            Err(err) => {
                self.nodes.remove(id);
                return Err(err);
            }
        };

        if let Some(node) = self.nodes.get_mut(id) {
            if let Some(listing) = node.listing_mut() {
                listing.init_dots(id, parent);
            }
            node.nlink += 1;
        }
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.nlink += 1;
        }

        self.attributes(id)
    }

    /// Create a hard link at `new` to the file at `existing`.
    ///
    /// Directories cannot be linked.
    pub fn link(&mut self, existing: &str, new: &str) -> Result<Attributes, FsError> {
        let id: NodeId = resolve(&self.nodes, existing, ROOT_NODE)?;
        if self.nodes.get(id).map_or(false, |n| n.is_dir()) {
            return Err(FsError::NotPermitted);
        }
        self.add_node(new, id)?;
        self.attributes(id)
    }

    /// Remove the regular file at `path` from the namespace.
    ///
    /// If the file is still open, it lingers as an orphan until the last
    /// handle is released.
    pub fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        let id: NodeId = resolve(&self.nodes, path, ROOT_NODE)?;
        if self.nodes.get(id).map_or(false, |n| n.is_dir()) {
            return Err(FsError::IsADirectory);
        }
        self.release_node(path)
    }

    /// Remove the empty directory at `path`. The root cannot be removed.
    pub fn rmdir(&mut self, path: &str) -> Result<(), FsError> {
        if path == "/" {
            return Err(FsError::Busy);
        }
        let id: NodeId = resolve(&self.nodes, path, ROOT_NODE)?;
        if !self.nodes.get(id).map_or(false, |n| n.is_dir()) {
            return Err(FsError::NotADirectory);
        }
        self.release_node(path)
    }

    /// Atomically relocate `old` to `new`.
    ///
    /// An existing regular-file target is released first; an existing
    /// directory target fails. Renaming an entry onto another link of the
    /// same inode is a successful no-op.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), FsError> {
        let source: NodeId = resolve(&self.nodes, old, ROOT_NODE)?;
        validate_rename(old, new)?;

        if let Ok(target) = resolve(&self.nodes, new, ROOT_NODE) {
            if target == source {
                return Ok(());
            }
            if self.nodes.get(target).map_or(false, |n| n.is_dir()) {
                return Err(FsError::IsADirectory);
            }
            self.release_node(new)?;
        }

        self.move_node(old, new)?;
        Ok(())
    }

    /// Open the regular file at `path`, incrementing its open count.
    pub fn open(&mut self, path: &str) -> Result<FileHandle, FsError> {
        let id: NodeId = resolve(&self.nodes, path, ROOT_NODE)?;
        let node: &mut Inode = self.nodes.get_mut(id).ok_or(FsError::NoSuchEntry)?;
        if node.is_dir() {
            return Err(FsError::IsADirectory);
        }
        node.nopen += 1;
        Ok(FileHandle { node: id })
    }

    /// Read up to `size` bytes at `offset` through an open handle.
    ///
    /// A read past the end is clamped to the file size, not an error.
    pub fn read(&self, handle: &FileHandle, offset: u64, size: u32) -> Result<Vec<u8>, FsError> {
        let node: &Inode = self.nodes.get(handle.node).ok_or(FsError::BadHandle)?;
        if node.nopen == 0 {
            return Err(FsError::BadHandle);
        }
        let content: &Vec<u8> = node.content().ok_or(FsError::IsADirectory)?;

        let len: u64 = content.len() as u64;
        if offset >= len {
            return Ok(Vec::new());
        }
        let end: u64 = (offset + size as u64).min(len);
        Ok(content[offset as usize..end as usize].to_vec())
    }

    /// Write `data` at `offset` through an open handle.
    ///
    /// The file grows as needed; a gap between the old end and `offset` is
    /// zero-filled.
    ///
    /// # Returns
    /// The number of bytes written (always `data.len()` on success).
    pub fn write(&mut self, handle: &FileHandle, offset: u64, data: &[u8]) -> Result<usize, FsError> {
        let node: &mut Inode = self.nodes.get_mut(handle.node).ok_or(FsError::BadHandle)?;
        if node.nopen == 0 {
            return Err(FsError::BadHandle);
        }
        let content: &mut Vec<u8> = node.content_mut().ok_or(FsError::IsADirectory)?;

        let offset: usize = usize::try_from(offset).map_err(|_| FsError::OutOfSpace)?;
        let end: usize = offset.checked_add(data.len()).ok_or(FsError::OutOfSpace)?;
        if end > content.len() {
            content
                .try_reserve(end - content.len())
                .map_err(|_| FsError::OutOfSpace)?;
            content.resize(end, 0);
        }
        content[offset..end].copy_from_slice(data);

        Ok(data.len())
    }

    /// Resize the file at `path` to `new_size` bytes.
    ///
    /// Growth is zero-filled; truncating to zero frees the content buffer.
    pub fn truncate(&mut self, path: &str, new_size: u64) -> Result<(), FsError> {
        let id: NodeId = resolve(&self.nodes, path, ROOT_NODE)?;
        let node: &mut Inode = self.nodes.get_mut(id).ok_or(FsError::NoSuchEntry)?;
        let content: &mut Vec<u8> = node.content_mut().ok_or(FsError::IsADirectory)?;

        if new_size == 0 {
            *content = Vec::new();
            return Ok(());
        }

        let new_len: usize = usize::try_from(new_size).map_err(|_| FsError::OutOfSpace)?;
        if new_len > content.len() {
            content
                .try_reserve(new_len - content.len())
                .map_err(|_| FsError::OutOfSpace)?;
            content.resize(new_len, 0);
        } else {
            content.truncate(new_len);
            content.shrink_to_fit();
        }
        Ok(())
    }

    /// Release an open handle, decrementing the open count.
    ///
    /// An orphan (unlinked while open) is destroyed when its last handle
    /// goes away.
    pub fn release(&mut self, handle: FileHandle) -> Result<(), FsError> {
        let node: &mut Inode = self.nodes.get_mut(handle.node).ok_or(FsError::BadHandle)?;
        if node.nopen == 0 {
            return Err(FsError::BadHandle);
        }
        node.nopen -= 1;
        if node.nopen == 0 && node.nlink == 0 {
            self.nodes.remove(handle.node);
        }
        Ok(())
    }

    /// Open the directory at `path` for enumeration.
    pub fn opendir(&self, path: &str) -> Result<DirHandle, FsError> {
        let id: NodeId = resolve(&self.nodes, path, ROOT_NODE)?;
        if !self.nodes.get(id).map_or(false, |n| n.is_dir()) {
            return Err(FsError::NotADirectory);
        }
        Ok(DirHandle { node: id })
    }

    /// Enumerate a directory's entries, `.` and `..` included, in listing
    /// order.
    pub fn readdir(&self, handle: &DirHandle) -> Result<Vec<DirEntry>, FsError> {
        let node: &Inode = self.nodes.get(handle.node).ok_or(FsError::BadHandle)?;
        let listing = node.listing().ok_or(FsError::NotADirectory)?;

        let mut entries: Vec<DirEntry> = Vec::with_capacity(listing.len());
        for entry in listing.iter() {
            if let Some(target) = self.nodes.get(entry.node) {
                entries.push(DirEntry {
                    name: entry.name.clone(),
                    ino: entry.node,
                    kind: target.kind(),
                });
            }
        }
        Ok(entries)
    }

    /// Retire a directory handle.
    pub fn releasedir(&self, _handle: DirHandle) -> Result<(), FsError> {
        Ok(())
    }

    // ---- teardown ----

    /// Destroy the entire graph.
    ///
    /// Afterwards the table holds only orphans still open through the
    /// bridge (normally none).
    pub fn teardown(&mut self) {
        self.teardown_node(ROOT_NODE);
    }

    /// Recursive release of `id` and everything below it.
    ///
    /// Every directory entry anywhere in the graph triggers exactly one
    /// call, so the link count reaches zero precisely when the last
    /// reference has been visited. The `traversing` marker stops the
    /// recursion from re-entering a directory through its own `.` or a
    /// child's `..`.
    fn teardown_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.nlink = node.nlink.saturating_sub(1);
        if node.traversing {
            return;
        }
        node.traversing = true;

        if node.nopen > 0 {
            tracing::warn!(ino = id, nopen = node.nopen, "releasing an inode that is still open");
        }

        let entries: Vec<Entry> = node
            .listing_mut()
            .map(|listing| listing.drain_all())
            .unwrap_or_default();
        for entry in entries {
            self.teardown_node(entry.node);
        }

        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.traversing = false;
        if node.nlink == 0 {
            self.nodes.remove(id);
        }
    }

    // ---- helpers ----

    fn attributes(&self, id: NodeId) -> Result<Attributes, FsError> {
        let node: &Inode = self.nodes.get(id).ok_or(FsError::NoSuchEntry)?;
        Ok(Attributes {
            ino: id,
            mode: node.mode,
            uid: node.uid,
            gid: node.gid,
            nlink: node.nlink,
            size: node.size(),
            kind: node.kind(),
        })
    }

    fn dir_listing(&self, id: NodeId) -> Result<&Listing, FsError> {
        self.nodes
            .get(id)
            .ok_or(FsError::NoSuchEntry)?
            .listing()
            .ok_or(FsError::NotADirectory)
    }

    fn dir_listing_mut(&mut self, id: NodeId) -> Result<&mut Listing, FsError> {
        self.nodes
            .get_mut(id)
            .ok_or(FsError::NoSuchEntry)?
            .listing_mut()
            .ok_or(FsError::NotADirectory)
    }
}

impl Default for Filesystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Check rename topology: the new path must not descend into the old, and
/// neither path may contain a `.` or `..` segment. Names that merely
/// contain dots (`file.txt`) are legal.
fn validate_rename(old: &str, new: &str) -> Result<(), FsError> {
    if new.len() > old.len() && new.starts_with(old) && new.as_bytes()[old.len()] == b'/' {
        return Err(FsError::InvalidPath);
    }
    let has_dot_segment = |path: &str| path.split('/').any(|seg| seg == "." || seg == "..");
    if has_dot_segment(old) || has_dot_segment(new) {
        return Err(FsError::InvalidPath);
    }
    Ok(())
}
