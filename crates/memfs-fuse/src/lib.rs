//! FUSE bridge for the memfs in-memory filesystem.
//!
//! Translates kernel requests into operations on
//! [`memfs_core::Filesystem`] and maps error kinds 1:1 onto errno values.
//! The kernel serializes requests, so the bridge owns the core directly
//! with no further locking.
//!
//! # Example
//!
//! ```ignore
//! use memfs_fuse::{default_options, mount, MemFs};
//!
//! let memfs = MemFs::new();
//! mount(memfs, "/mnt/scratch".as_ref(), &default_options())?;
//! ```

mod bridge;

pub use bridge::{default_options, mount, spawn_mount, MemFs};
