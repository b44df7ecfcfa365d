//! Directory listing: the ordered entries of a directory inode.

use crate::error::FsError;

use super::types::NodeId;

/// A named reference to an inode inside a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry name. Never empty, never contains `/`.
    pub name: String,
    /// Node the entry refers to.
    pub node: NodeId,
}

/// The ordered entries of one directory.
///
/// A populated listing always begins with `.` → self and `..` → parent;
/// user entries follow in insertion order. Name uniqueness is a
/// precondition maintained by the namespace operations, not checked here.
#[derive(Debug, Default)]
pub struct Listing {
    entries: Vec<Entry>,
}

impl Listing {
    /// Create an empty listing. `init_dots` must run before the listing is
    /// exposed to resolution.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Install the mandatory `.` and `..` entries.
    ///
    /// # Arguments
    /// * `this` - The directory that owns this listing
    /// * `parent` - Its parent directory (itself for the root)
    pub fn init_dots(&mut self, this: NodeId, parent: NodeId) {
        debug_assert!(self.entries.is_empty());
        self.entries.push(Entry { name: ".".to_string(), node: this });
        self.entries.push(Entry { name: "..".to_string(), node: parent });
    }

    /// Append an entry at the tail.
    ///
    /// # Arguments
    /// * `name` - Entry name
    /// * `node` - Node the entry refers to
    ///
    /// # Returns
    /// `OutOfSpace` if the listing cannot grow.
    pub fn append(&mut self, name: &str, node: NodeId) -> Result<(), FsError> {
        self.reserve_one()?;
        self.entries.push(Entry { name: name.to_string(), node });
        Ok(())
    }

    /// Reserve room for one more entry without inserting it, so a later
    /// `append` cannot fail.
    pub fn reserve_one(&mut self) -> Result<(), FsError> {
        self.entries.try_reserve(1).map_err(|_| FsError::OutOfSpace)
    }

    /// Remove the first entry whose name matches.
    ///
    /// Does not touch link counts.
    ///
    /// # Returns
    /// The node id the removed entry referenced, or `NoSuchEntry`.
    pub fn remove(&mut self, name: &str) -> Result<NodeId, FsError> {
        let pos: usize = self
            .entries
            .iter()
            .position(|e| e.name == name)
            .ok_or(FsError::NoSuchEntry)?;
        Ok(self.entries.remove(pos).node)
    }

    /// Look up an entry by exact name.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.node)
    }

    /// True iff the listing contains exactly `.` and `..`.
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 2
    }

    /// Number of entries, dot entries included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over all entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Take every entry out of the listing, leaving it empty. Used by
    /// teardown so a directory revisited through a stale `..` has nothing
    /// left to walk.
    pub fn drain_all(&mut self) -> Vec<Entry> {
        std::mem::take(&mut self.entries)
    }
}
