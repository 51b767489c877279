//! Error types for memblock.

use thiserror::Error;

/// Result type alias using memblock's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the fallible memory and allocator entry points.
///
/// The `Option`-returning operations on [`Memory`](crate::Memory) collapse these into
/// `None`; the `try_*` variants and allocators keep the reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Memory allocation failed.
    #[error("memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Requested alignment is not a power of two.
    #[error("invalid alignment: {0} is not a power of two")]
    InvalidAlignment(usize),

    /// The valid-data window does not fit in the region.
    #[error("invalid window: offset {offset} + size {size} exceeds maxsize {maxsize}")]
    InvalidWindow {
        /// Requested start of valid data.
        offset: usize,
        /// Requested length of valid data.
        size: usize,
        /// Size of the backing region.
        maxsize: usize,
    },

    /// The memory is read-only or shared with other owners.
    #[error("memory is not writable")]
    NotWritable,

    /// A size computation overflowed `usize`.
    #[error("size overflow")]
    SizeOverflow,
}
