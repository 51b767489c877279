//! Memory blocks and their maps.
//!
//! # Architecture
//!
//! - [`Storage`]: an owned byte region, shared by a block and its sub-blocks
//! - [`Memory`]: reference-counted handle viewing a window of a storage region
//! - [`MapInfo`]: RAII guard for mapped access; unmaps on drop
//!
//! Map access is coordinated per storage: many read maps or one write map.
//!
//! # Example
//!
//! ```rust
//! use memblock::{AllocationParams, MapFlags, Memory};
//!
//! let mem = Memory::alloc(None, 64, &AllocationParams::default()).unwrap();
//! {
//!     let mut map = mem.map(MapFlags::WRITE).unwrap();
//!     map.as_mut_slice().unwrap()[..5].copy_from_slice(b"hello");
//! }
//! assert_eq!(&mem.bytes()[..5], b"hello");
//! ```

mod block;
mod lock;
mod map;
mod storage;

pub use block::Memory;
pub use map::MapInfo;
pub use storage::{DestroyNotify, Storage};
