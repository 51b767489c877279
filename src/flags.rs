//! Memory and map flag sets.
//!
//! Bit values match the multimedia framework these primitives mirror, so
//! flags can be passed unchanged across the C ABI.

use bitflags::bitflags;

bitflags! {
    /// Flags describing a memory block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemoryFlags: u32 {
        /// The memory cannot be mapped for writing.
        const READONLY = 1 << 1;
        /// The memory cannot be shared with [`Memory::share`](crate::Memory::share).
        const NO_SHARE = 1 << 4;
        /// Bytes before the valid-data window are zero.
        const ZERO_PREFIXED = 1 << 5;
        /// Bytes after the valid-data window are zero.
        const ZERO_PADDED = 1 << 6;
        /// The memory is physically contiguous.
        const PHYSICALLY_CONTIGUOUS = 1 << 7;
        /// The memory cannot be mapped at all.
        const NOT_MAPPABLE = 1 << 8;
    }
}

bitflags! {
    /// Access requested when mapping a memory block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MapFlags: u32 {
        /// Map for reading.
        const READ = 1 << 0;
        /// Map for writing.
        const WRITE = 1 << 1;
        /// Map for reading and writing.
        const READWRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl MapFlags {
    /// Whether this access needs exclusive use of the storage.
    #[inline]
    pub fn is_exclusive(&self) -> bool {
        self.contains(MapFlags::WRITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_flag_bits() {
        assert_eq!(MemoryFlags::READONLY.bits(), 2);
        assert_eq!(MemoryFlags::NO_SHARE.bits(), 16);
        assert_eq!(MemoryFlags::ZERO_PREFIXED.bits(), 32);
        assert_eq!(MemoryFlags::ZERO_PADDED.bits(), 64);
        assert_eq!(MemoryFlags::NOT_MAPPABLE.bits(), 256);
    }

    #[test]
    fn test_map_flags_exclusive() {
        assert!(!MapFlags::READ.is_exclusive());
        assert!(MapFlags::WRITE.is_exclusive());
        assert!(MapFlags::READWRITE.is_exclusive());
        assert_eq!(MapFlags::READWRITE, MapFlags::READ | MapFlags::WRITE);
    }

    #[test]
    fn test_unknown_bits_are_dropped() {
        let flags = MemoryFlags::from_bits_truncate(0xFFFF_FFFF);
        assert!(flags.contains(MemoryFlags::READONLY | MemoryFlags::NOT_MAPPABLE));
        assert_eq!(flags.bits() & 1, 0);
    }
}
