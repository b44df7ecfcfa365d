//! Core inode types shared across the crate.

/// Unique identifier for an inode in the node table.
pub type NodeId = u64;

/// Root directory node id (always 1, the FUSE root inode convention).
pub const ROOT_NODE: NodeId = 1;

/// Maximum filename length in bytes.
pub const NAME_MAX: usize = 255;

/// File type mask within a mode word (`S_IFMT`).
pub const MODE_TYPE_MASK: u32 = libc::S_IFMT as u32;

/// Directory type bits (`S_IFDIR`).
pub const MODE_DIRECTORY: u32 = libc::S_IFDIR as u32;

/// Regular-file type bits (`S_IFREG`).
pub const MODE_REGULAR: u32 = libc::S_IFREG as u32;

/// Kind of inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Attributes of an inode, as reported by `getattr` and the creation
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    /// Node id; doubles as the inode number handed to the kernel.
    pub ino: NodeId,
    /// File-type-and-permission bits.
    pub mode: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Number of directory entries referring to this inode.
    pub nlink: u32,
    /// Payload length in bytes (0 for directories).
    pub size: u64,
    /// File or directory.
    pub kind: NodeKind,
}

/// One row of a `readdir` enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (`.` and `..` included).
    pub name: String,
    /// Node the entry refers to.
    pub ino: NodeId,
    /// Kind of that node.
    pub kind: NodeKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_bits_disjoint() {
        assert_eq!(MODE_DIRECTORY & !MODE_TYPE_MASK, 0);
        assert_eq!(MODE_REGULAR & !MODE_TYPE_MASK, 0);
        assert_ne!(MODE_DIRECTORY, MODE_REGULAR);
    }
}
