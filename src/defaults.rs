//! Default configuration constants.

/// Memory type name of the system allocator, and its registry name.
pub const SYSTEM_MEMORY_TYPE: &str = "SystemMemory";

/// Alignment used when [`AllocationParams::align`](crate::AllocationParams::align)
/// is `0`. Covers every primitive type on common targets.
pub const DEFAULT_ALIGNMENT: usize = 8;

/// Alignment reported by wrapped blocks; the caller's buffer carries no
/// alignment guarantee beyond bytes.
pub const WRAPPED_ALIGNMENT: usize = 1;

/// Size argument meaning "to the end of the valid data" at the C ABI.
pub const SIZE_TO_END: isize = -1;
