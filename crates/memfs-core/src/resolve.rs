//! Path resolution over the node table.

use crate::error::FsError;
use crate::inode::{NodeId, NodeTable};

/// Walk `path` from `start`, returning the node it names.
///
/// A leading `/` is optional and consumed; an empty remainder names `start`
/// itself. Exactly one `/` is consumed between segments, so an empty
/// segment (as in `a//b`) never matches anything. Each segment is matched
/// byte-wise against the current listing, so `.` and `..` resolve through
/// their ordinary entries.
///
/// # Arguments
/// * `nodes` - Node table to walk
/// * `path` - Slash-separated path, absolute or relative to `start`
/// * `start` - Node to begin at, normally the root
///
/// # Returns
/// `NoSuchEntry` if a segment is absent, `NotADirectory` if a non-terminal
/// segment resolves to a regular file.
pub(crate) fn resolve(nodes: &NodeTable, path: &str, start: NodeId) -> Result<NodeId, FsError> {
    let mut rest: &str = path.strip_prefix('/').unwrap_or(path);
    let mut current: NodeId = start;

    loop {
        if rest.is_empty() {
            return Ok(current);
        }

        let node = nodes.get(current).ok_or(FsError::NoSuchEntry)?;
        let listing = node.listing().ok_or_else(|| {
            tracing::debug!(remainder = rest, "component before remainder is not a directory");
            FsError::NotADirectory
        })?;

        let (segment, tail): (&str, &str) = match rest.split_once('/') {
            Some((segment, tail)) => (segment, tail),
            None => (rest, ""),
        };

        current = listing.lookup(segment).ok_or(FsError::NoSuchEntry)?;
        rest = tail;
    }
}

/// Locate the parent directory for the entry `path` names.
///
/// Splits at the final `/`: the prefix (empty prefix means root) is resolved
/// with [`resolve`], the suffix is the entry name.
///
/// # Returns
/// The parent directory's id and the name, or: `InvalidPath` if `path` does
/// not begin with `/`, `NoSuchEntry` if `path` is empty or the filename is
/// empty, `NotADirectory` if the prefix names a regular file.
pub(crate) fn resolve_parent<'p>(
    nodes: &NodeTable,
    path: &'p str,
    root: NodeId,
) -> Result<(NodeId, &'p str), FsError> {
    if path.is_empty() {
        return Err(FsError::NoSuchEntry);
    }
    if !path.starts_with('/') {
        return Err(FsError::InvalidPath);
    }

    let split: usize = path.rfind('/').unwrap_or(0);
    let (prefix, name): (&str, &str) = (&path[..split], &path[split + 1..]);
    if name.is_empty() {
        return Err(FsError::NoSuchEntry);
    }

    let dir: NodeId = resolve(nodes, prefix, root)?;
    let node = nodes.get(dir).ok_or(FsError::NoSuchEntry)?;
    if !node.is_dir() {
        return Err(FsError::NotADirectory);
    }

    Ok((dir, name))
}
