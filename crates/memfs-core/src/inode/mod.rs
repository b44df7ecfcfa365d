//! Inode primitives: the node record, directory listings, and the arena
//! that owns them.

mod listing;
mod node;
mod table;
mod types;

pub use listing::{Entry, Listing};
pub use node::{Inode, NodeData};
pub use table::NodeTable;
pub use types::{
    Attributes, DirEntry, NodeId, NodeKind, MODE_DIRECTORY, MODE_REGULAR, MODE_TYPE_MASK,
    NAME_MAX, ROOT_NODE,
};
