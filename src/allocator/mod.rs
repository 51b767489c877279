//! Allocators producing memory block storage.
//!
//! An [`Allocator`] creates storage for new blocks and can veto or observe
//! map access to the blocks it produced. The [`SystemAllocator`] covers
//! plain heap memory and is registered as the default; other allocators can
//! be added to the [`registry`] by name.

pub mod registry;
mod system;

pub use registry::AllocatorRegistry;
pub use system::SystemAllocator;

use crate::defaults::DEFAULT_ALIGNMENT;
use crate::error::{Error, Result};
use crate::flags::{MapFlags, MemoryFlags};
use crate::memory::{Memory, Storage};
use crate::observability;
use std::sync::Arc;

/// Parameters for [`Allocator::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationParams {
    /// Flags for the new block.
    pub flags: MemoryFlags,
    /// Alignment in bytes. Must be a power of two; `0` selects the default.
    pub align: usize,
    /// Bytes reserved before the valid data.
    pub prefix: usize,
    /// Bytes reserved after the valid data.
    pub padding: usize,
}

impl AllocationParams {
    /// Default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters aligned to the system page size.
    pub fn page_aligned() -> Self {
        Self::default().with_align(rustix::param::page_size())
    }

    /// Set the block flags.
    pub fn with_flags(mut self, flags: MemoryFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the alignment in bytes.
    pub fn with_align(mut self, align: usize) -> Self {
        self.align = align;
        self
    }

    /// Set the prefix length.
    pub fn with_prefix(mut self, prefix: usize) -> Self {
        self.prefix = prefix;
        self
    }

    /// Set the padding length.
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Alignment to use, with `0` resolved to [`DEFAULT_ALIGNMENT`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAlignment`] if `align` is not a power of two.
    pub fn effective_align(&self) -> Result<usize> {
        match self.align {
            0 => Ok(DEFAULT_ALIGNMENT),
            align if align.is_power_of_two() => Ok(align),
            align => Err(Error::InvalidAlignment(align)),
        }
    }

    /// Total region size for `size` bytes of valid data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeOverflow`] if the sum does not fit in `usize`.
    pub fn maxsize_for(&self, size: usize) -> Result<usize> {
        self.prefix
            .checked_add(size)
            .and_then(|n| n.checked_add(self.padding))
            .ok_or(Error::SizeOverflow)
    }
}

/// Storage produced by an allocator, plus the window and attributes the new
/// block should have.
#[derive(Debug)]
pub struct Allocation {
    /// Backing region; its length becomes the block's `maxsize`.
    pub storage: Storage,
    /// Start of the valid data.
    pub offset: usize,
    /// Length of the valid data.
    pub size: usize,
    /// Alignment of the region in bytes.
    pub align: usize,
    /// Flags for the new block.
    pub flags: MemoryFlags,
}

/// Source of memory block storage.
///
/// Only [`allocate`](Allocator::allocate) is required. The map hooks let an
/// allocator restrict access modes (e.g. write-only device memory) or track
/// mappings; [`copy`](Allocator::copy) can be overridden for storage that
/// has a faster copy path than mapping.
pub trait Allocator: Send + Sync + std::fmt::Debug {
    /// Name of the memory type this allocator produces.
    fn mem_type(&self) -> &str;

    /// Allocate storage for a block with `size` valid bytes.
    fn allocate(&self, size: usize, params: &AllocationParams) -> Result<Allocation>;

    /// Called before a block is mapped. Return `false` to refuse the access.
    fn map(&self, memory: &Memory, flags: MapFlags) -> bool {
        let _ = (memory, flags);
        true
    }

    /// Called when a map of a block is released.
    fn unmap(&self, memory: &Memory) {
        let _ = memory;
    }

    /// Copy part of a block into a new, writable block.
    fn copy(&self, memory: &Memory, offset: isize, size: Option<usize>) -> Option<Memory> {
        fallback_copy(memory, offset, size)
    }
}

/// Allocate a block with `allocator`, or the registry default when `None`.
///
/// # Errors
///
/// Returns whatever the allocator reports.
pub fn alloc(
    allocator: Option<&Arc<dyn Allocator>>,
    size: usize,
    params: &AllocationParams,
) -> Result<Memory> {
    let allocator = match allocator {
        Some(allocator) => Arc::clone(allocator),
        None => registry::default_allocator(),
    };

    let allocation = allocator.allocate(size, params).inspect_err(|e| {
        tracing::debug!(mem_type = allocator.mem_type(), size, error = %e, "allocation failed");
    })?;
    Memory::from_allocation(allocator, allocation)
}

/// Copy by mapping: read the source, allocate from the source's allocator
/// (or the default allocator if that fails), write the destination.
pub fn fallback_copy(memory: &Memory, offset: isize, size: Option<usize>) -> Option<Memory> {
    let (start, len) = memory.resolve_window(offset, size)?;
    let src = memory.map(MapFlags::READ)?;

    let params = AllocationParams::new().with_align(memory.alignment());
    let copy = alloc(Some(memory.allocator()), len, &params)
        .or_else(|_| alloc(None, len, &params))
        .ok()?;

    {
        let mut dst = copy.map(MapFlags::WRITE)?;
        dst.as_mut_slice()?.copy_from_slice(src.region(start, len));
    }

    observability::record_copy(len);
    Some(copy)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Allocator whose blocks can only be mapped for writing.
    #[derive(Debug)]
    struct WriteOnlyAllocator;

    impl Allocator for WriteOnlyAllocator {
        fn mem_type(&self) -> &str {
            "WriteOnly"
        }

        fn allocate(&self, size: usize, params: &AllocationParams) -> Result<Allocation> {
            SystemAllocator.allocate(size, params)
        }

        fn map(&self, _memory: &Memory, flags: MapFlags) -> bool {
            !flags.contains(MapFlags::READ)
        }
    }

    #[test]
    fn test_params_builder() {
        let params = AllocationParams::new()
            .with_flags(MemoryFlags::ZERO_PADDED)
            .with_align(64)
            .with_prefix(16)
            .with_padding(8);

        assert_eq!(params.flags, MemoryFlags::ZERO_PADDED);
        assert_eq!(params.effective_align().unwrap(), 64);
        assert_eq!(params.maxsize_for(100).unwrap(), 124);
    }

    #[test]
    fn test_params_defaults() {
        let params = AllocationParams::default();
        assert_eq!(params.effective_align().unwrap(), DEFAULT_ALIGNMENT);
        assert_eq!(params.maxsize_for(10).unwrap(), 10);
    }

    #[test]
    fn test_params_invalid() {
        let params = AllocationParams::new().with_align(12);
        assert_eq!(params.effective_align(), Err(Error::InvalidAlignment(12)));

        let params = AllocationParams::new().with_prefix(usize::MAX);
        assert_eq!(params.maxsize_for(1), Err(Error::SizeOverflow));
    }

    #[test]
    fn test_page_aligned() {
        let params = AllocationParams::page_aligned();
        assert!(params.align >= 4096);
        let mem = alloc(None, 10, &params).unwrap();
        let map = mem.map(MapFlags::READ).unwrap();
        assert_eq!(map.as_ptr() as usize % params.align, 0);
    }

    #[test]
    fn test_alloc_default() {
        let mem = alloc(None, 32, &AllocationParams::default()).unwrap();
        assert_eq!(mem.size(), 32);
        assert_eq!(mem.maxsize(), 32);
        assert_eq!(mem.alignment(), DEFAULT_ALIGNMENT);
        assert_eq!(mem.mem_type(), crate::defaults::SYSTEM_MEMORY_TYPE);
    }

    #[test]
    fn test_write_only_allocator_refuses_read() {
        let allocator: Arc<dyn Allocator> = Arc::new(WriteOnlyAllocator);
        let mem = alloc(Some(&allocator), 8, &AllocationParams::default()).unwrap();

        assert_eq!(mem.mem_type(), "WriteOnly");
        assert!(mem.map(MapFlags::READ).is_none());
        assert!(mem.map(MapFlags::READWRITE).is_none());
        assert!(mem.bytes().is_empty());
        assert!(mem.copy(0, None).is_none());

        // Refused maps must not leave the storage locked
        let mut map = mem.map(MapFlags::WRITE).unwrap();
        map.as_mut_slice().unwrap().fill(1);
    }

    #[test]
    fn test_fallback_copy_keeps_alignment() {
        let params = AllocationParams::new().with_align(64);
        let mem = alloc(None, 100, &params).unwrap();
        let copy = fallback_copy(&mem, 10, Some(20)).unwrap();

        assert_eq!(copy.size(), 20);
        assert_eq!(copy.alignment(), 64);
        let map = copy.map(MapFlags::READ).unwrap();
        assert_eq!(map.as_ptr() as usize % 64, 0);
    }
}
