//! Heap-backed default allocator.

use super::{Allocation, AllocationParams, Allocator};
use crate::defaults::SYSTEM_MEMORY_TYPE;
use crate::error::Result;
use crate::memory::Storage;

/// Allocator for plain heap memory.
///
/// Each block gets one zeroed region of `prefix + size + padding` bytes
/// whose start honours the requested alignment. The valid data begins after
/// the prefix. Prefix and padding are always zero on allocation, whether or
/// not the zero flags were requested.
///
/// # Example
///
/// ```rust
/// use memblock::{AllocationParams, Allocator, SystemAllocator};
///
/// let allocation = SystemAllocator
///     .allocate(1024, &AllocationParams::new().with_prefix(16))
///     .unwrap();
/// assert_eq!(allocation.storage.len(), 1040);
/// assert_eq!(allocation.offset, 16);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn mem_type(&self) -> &str {
        SYSTEM_MEMORY_TYPE
    }

    fn allocate(&self, size: usize, params: &AllocationParams) -> Result<Allocation> {
        let align = params.effective_align()?;
        let maxsize = params.maxsize_for(size)?;
        let storage = Storage::zeroed(maxsize, align)?;

        Ok(Allocation {
            storage,
            offset: params.prefix,
            size,
            align,
            flags: params.flags,
        })
    }
}
