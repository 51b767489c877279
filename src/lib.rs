//! # memblock
//!
//! Reference-counted memory blocks with a windowed view of their storage,
//! scoped map access, and pluggable allocators.
//!
//! A [`Memory`] views `[offset, offset + size)` of a storage region that is
//! `maxsize` bytes long. Blocks are shared by explicit reference tokens
//! ([`Memory::acquire`] / [`Memory::release`]), mapped through RAII guards
//! ([`MapInfo`]), copied into fresh writable storage, or shared as read-only
//! sub-blocks without copying. The same primitives are exported through a C
//! ABI in [`ffi`] for language bindings.
//!
//! ## Features
//!
//! - **Wrapped memory**: adopt an existing `Vec<u8>`, with an optional
//!   callback that gets it back on destruction
//! - **Allocators**: heap allocation with alignment, prefix and padding;
//!   custom allocators can veto map access modes
//! - **Scoped maps**: many readers or one writer per storage region
//! - **Zero-copy sharing**: sub-blocks over the same storage
//!
//! ## Quick Start
//!
//! ```rust
//! use memblock::{MapFlags, Memory, MemoryFlags};
//!
//! let mem = Memory::new_wrapped(MemoryFlags::empty(), b"hello world".to_vec(), 11, 0, 11)
//!     .unwrap();
//!
//! let copy = mem.copy(6, None).unwrap();
//! assert_eq!(copy.bytes().as_ref(), b"world");
//!
//! let mut map = copy.map(MapFlags::WRITE).unwrap();
//! map.as_mut_slice().unwrap()[0] = b'W';
//! drop(map);
//! assert_eq!(copy.bytes().as_ref(), b"World");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod allocator;
pub mod defaults;
pub mod error;
pub mod ffi;
pub mod flags;
pub mod memory;
pub mod observability;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::allocator::{AllocationParams, Allocator, SystemAllocator};
    pub use crate::error::{Error, Result};
    pub use crate::flags::{MapFlags, MemoryFlags};
    pub use crate::memory::{MapInfo, Memory};
}

pub use allocator::{Allocation, AllocationParams, Allocator, AllocatorRegistry, SystemAllocator};
pub use error::{Error, Result};
pub use flags::{MapFlags, MemoryFlags};
pub use memory::{DestroyNotify, MapInfo, Memory, Storage};
