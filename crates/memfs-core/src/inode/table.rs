//! Node table: the arena that owns every inode.

use std::collections::HashMap;

use super::node::Inode;
use super::types::{NodeId, ROOT_NODE};

/// Owns all inodes and hands out stable ids.
///
/// Listings refer to nodes by id, so the reference cycles formed by `.` and
/// `..` never imply ownership. Ids are never reused within one filesystem
/// lifetime.
#[derive(Debug)]
pub struct NodeTable {
    /// All live inodes by id.
    nodes: HashMap<NodeId, Inode>,
    /// Next id to allocate.
    next_id: NodeId,
}

impl NodeTable {
    /// Create an empty table. The first inserted node receives `ROOT_NODE`.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: ROOT_NODE,
        }
    }

    /// Insert a node, allocating a fresh id for it.
    pub fn insert(&mut self, node: Inode) -> NodeId {
        let id: NodeId = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&Inode> {
        self.nodes.get(&id)
    }

    /// Get a node mutably by id.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Inode> {
        self.nodes.get_mut(&id)
    }

    /// Remove a node from the table, freeing its payload.
    pub fn remove(&mut self, id: NodeId) -> Option<Inode> {
        self.nodes.remove(&id)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True iff no nodes are live.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new()
    }
}
