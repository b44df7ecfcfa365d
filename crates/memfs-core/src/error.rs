//! Error types for filesystem operations.

use thiserror::Error;

/// Errors from core filesystem operations.
///
/// Each variant corresponds to one POSIX error the bridge surfaces to the
/// kernel; the mapping to errno values lives in the bridge.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Name not found during resolution.
    #[error("no such entry")]
    NoSuchEntry,

    /// A non-terminal path component is a regular file, or an operation
    /// requiring a directory received a file.
    #[error("not a directory")]
    NotADirectory,

    /// File-only operation received a directory.
    #[error("is a directory")]
    IsADirectory,

    /// Target name is already occupied.
    #[error("entry already exists")]
    AlreadyExists,

    /// Directory still has user entries.
    #[error("directory not empty")]
    NotEmpty,

    /// Disallowed operation, e.g. hard-linking a directory.
    #[error("operation not permitted")]
    NotPermitted,

    /// Operation targeted the root directory.
    #[error("resource busy")]
    Busy,

    /// Malformed path: missing leading `/`, empty filename, overlong name,
    /// or illegal rename topology.
    #[error("invalid path")]
    InvalidPath,

    /// File operation on an inode with no outstanding opens.
    #[error("bad file handle")]
    BadHandle,

    /// Allocation failure while growing a listing or content buffer.
    #[error("out of space")]
    OutOfSpace,
}
