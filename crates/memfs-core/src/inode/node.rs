//! The inode record.

use super::listing::Listing;
use super::types::{NodeId, NodeKind, MODE_DIRECTORY, MODE_REGULAR};

/// Payload of an inode: file bytes or a directory listing.
#[derive(Debug)]
pub enum NodeData {
    /// Content buffer of a regular file.
    File(Vec<u8>),
    /// Entries of a directory.
    Directory(Listing),
}

/// One node of the filesystem graph, either a directory or a regular file.
#[derive(Debug)]
pub struct Inode {
    /// File-type-and-permission bits.
    pub mode: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Number of directory entries referring to this inode.
    pub nlink: u32,
    /// Number of outstanding open handles.
    pub nopen: u32,
    /// The directory that first received this node; the root points to
    /// itself. Unset until the node is attached.
    pub parent: Option<NodeId>,
    /// File bytes or directory listing.
    pub data: NodeData,
    /// Transient teardown marker; always false outside teardown.
    pub traversing: bool,
}

impl Inode {
    /// Create a detached regular-file inode with an empty content buffer.
    ///
    /// # Arguments
    /// * `mode` - Permission bits; the regular-file type bit is or'ed in
    /// * `uid` - Owner user id
    /// * `gid` - Owner group id
    pub fn new_file(mode: u32, uid: u32, gid: u32) -> Self {
        Self {
            mode: mode | MODE_REGULAR,
            uid,
            gid,
            nlink: 0,
            nopen: 0,
            parent: None,
            data: NodeData::File(Vec::new()),
            traversing: false,
        }
    }

    /// Create a detached directory inode with an empty listing.
    ///
    /// The `.`/`..` entries are installed once the parent is known, after
    /// the node has been attached.
    pub fn new_directory(mode: u32, uid: u32, gid: u32) -> Self {
        Self {
            mode: mode | MODE_DIRECTORY,
            uid,
            gid,
            nlink: 0,
            nopen: 0,
            parent: None,
            data: NodeData::Directory(Listing::new()),
            traversing: false,
        }
    }

    /// The kind of this node.
    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::File(_) => NodeKind::File,
            NodeData::Directory(_) => NodeKind::Directory,
        }
    }

    /// True iff this node is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self.data, NodeData::Directory(_))
    }

    /// Payload length in bytes; directories report 0.
    pub fn size(&self) -> u64 {
        match &self.data {
            NodeData::File(content) => content.len() as u64,
            NodeData::Directory(_) => 0,
        }
    }

    /// The listing, if this node is a directory.
    pub fn listing(&self) -> Option<&Listing> {
        match &self.data {
            NodeData::Directory(listing) => Some(listing),
            NodeData::File(_) => None,
        }
    }

    /// Mutable listing, if this node is a directory.
    pub fn listing_mut(&mut self) -> Option<&mut Listing> {
        match &mut self.data {
            NodeData::Directory(listing) => Some(listing),
            NodeData::File(_) => None,
        }
    }

    /// The content buffer, if this node is a regular file.
    pub fn content(&self) -> Option<&Vec<u8>> {
        match &self.data {
            NodeData::File(content) => Some(content),
            NodeData::Directory(_) => None,
        }
    }

    /// Mutable content buffer, if this node is a regular file.
    pub fn content_mut(&mut self) -> Option<&mut Vec<u8>> {
        match &mut self.data {
            NodeData::File(content) => Some(content),
            NodeData::Directory(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inode::types::MODE_TYPE_MASK;

    #[test]
    fn test_new_file_sets_type_bits() {
        let node: Inode = Inode::new_file(0o644, 1000, 1000);

        assert_eq!(node.kind(), NodeKind::File);
        assert!(!node.is_dir());
        assert_eq!(node.mode & MODE_TYPE_MASK, MODE_REGULAR);
        assert_eq!(node.mode & 0o777, 0o644);
        assert_eq!(node.nlink, 0);
        assert_eq!(node.nopen, 0);
        assert!(node.parent.is_none());
        assert_eq!(node.size(), 0);
    }

    #[test]
    fn test_new_directory_sets_type_bits() {
        let node: Inode = Inode::new_directory(0o755, 0, 0);

        assert_eq!(node.kind(), NodeKind::Directory);
        assert!(node.is_dir());
        assert_eq!(node.mode & MODE_TYPE_MASK, MODE_DIRECTORY);
        assert_eq!(node.size(), 0);
        assert!(node.listing().is_some());
        assert!(node.content().is_none());
    }

    #[test]
    fn test_file_size_tracks_content() {
        let mut node: Inode = Inode::new_file(0o644, 0, 0);
        node.content_mut().unwrap().extend_from_slice(b"hello");
        assert_eq!(node.size(), 5);
    }
}
