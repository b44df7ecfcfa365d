//! In-memory inode graph for the memfs filesystem.
//!
//! This crate is the core of memfs: a hierarchical namespace of directories
//! and regular files whose contents live entirely in process memory. The
//! FUSE bridge (`memfs-fuse`) translates kernel requests into the
//! operations exposed here.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: FUSE bridge (memfs-fuse: fuser::Filesystem impl)
//! Layer 2: Operation surface (Filesystem: getattr, mknod, rename, ...)
//! Layer 1: Primitives (NodeTable, Inode, Listing, resolver)
//! ```
//!
//! Inodes live in a [`NodeTable`] arena addressed by stable `u64` ids;
//! directory listings refer to nodes by id, so the reference cycles formed
//! by `.` and `..` never imply ownership. Ids double as the inode numbers
//! handed to the kernel (root = 1).
//!
//! # Example
//!
//! ```
//! use memfs_core::Filesystem;
//!
//! let mut fs = Filesystem::new();
//! fs.mkdir("/scratch", 0o755, 1000, 1000)?;
//! fs.mknod("/scratch/note", 0o644, 1000, 1000)?;
//!
//! let handle = fs.open("/scratch/note")?;
//! fs.write(&handle, 0, b"hello")?;
//! assert_eq!(fs.read(&handle, 0, 5)?, b"hello");
//! fs.release(handle)?;
//! # Ok::<(), memfs_core::FsError>(())
//! ```

pub mod error;
pub mod fs;
pub mod inode;

mod resolve;

pub use error::FsError;
pub use fs::{DirHandle, FileHandle, Filesystem};
pub use inode::{Attributes, DirEntry, NodeId, NodeKind, NAME_MAX, ROOT_NODE};
