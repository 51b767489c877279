//! Metrics collection using metrics-rs.

use crate::flags::MapFlags;
use metrics::{Unit, counter, gauge};
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

// Metric names as constants for consistency
const ALLOCATIONS: &str = "memblock_allocations";
const BYTES_ALLOCATED: &str = "memblock_bytes_allocated";
const BLOCKS_LIVE: &str = "memblock_blocks_live";
const FREES: &str = "memblock_frees";
const MAPS: &str = "memblock_maps";
const MAP_FAILURES: &str = "memblock_map_failures";
const COPIES: &str = "memblock_copies";
const BYTES_COPIED: &str = "memblock_bytes_copied";

/// Initialize metrics descriptions.
///
/// Call this once at application startup before installing an exporter.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        ALLOCATIONS,
        Unit::Count,
        "Storage regions allocated or wrapped"
    );
    metrics::describe_counter!(
        BYTES_ALLOCATED,
        Unit::Bytes,
        "Bytes of storage allocated or wrapped"
    );
    metrics::describe_gauge!(
        BLOCKS_LIVE,
        Unit::Count,
        "Memory blocks currently alive, including shared sub-blocks"
    );
    metrics::describe_counter!(FREES, Unit::Count, "Memory blocks destroyed");
    metrics::describe_counter!(MAPS, Unit::Count, "Successful map calls");
    metrics::describe_counter!(
        MAP_FAILURES,
        Unit::Count,
        "Refused map calls, labelled by reason"
    );
    metrics::describe_counter!(COPIES, Unit::Count, "Memory blocks copied");
    metrics::describe_counter!(BYTES_COPIED, Unit::Bytes, "Bytes copied between blocks");
}

/// Record a new storage region.
#[inline]
pub fn record_alloc(mem_type: &str, bytes: usize) {
    counter!(ALLOCATIONS, "mem_type" => mem_type.to_string()).increment(1);
    counter!(BYTES_ALLOCATED, "mem_type" => mem_type.to_string()).increment(bytes as u64);
}

/// Record a new block (allocated, wrapped or shared).
#[inline]
pub fn record_block_created(mem_type: &str) {
    gauge!(BLOCKS_LIVE, "mem_type" => mem_type.to_string()).increment(1.0);
}

/// Record a destroyed block.
#[inline]
pub fn record_free(mem_type: &str) {
    counter!(FREES, "mem_type" => mem_type.to_string()).increment(1);
    gauge!(BLOCKS_LIVE, "mem_type" => mem_type.to_string()).decrement(1.0);
}

/// Record a successful map.
#[inline]
pub fn record_map(flags: MapFlags) {
    let access = if flags.contains(MapFlags::WRITE) {
        "write"
    } else {
        "read"
    };
    counter!(MAPS, "access" => access).increment(1);
}

/// Record a refused map.
#[inline]
pub fn record_map_failure(reason: &'static str) {
    counter!(MAP_FAILURES, "reason" => reason).increment(1);
}

/// Record a block copy.
#[inline]
pub fn record_copy(bytes: usize) {
    counter!(COPIES).increment(1);
    counter!(BYTES_COPIED).increment(bytes as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_metrics();
        init_metrics();
        assert!(METRICS_INITIALIZED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_recording_without_recorder() {
        // No recorder installed: every call is a no-op
        record_alloc("SystemMemory", 64);
        record_block_created("SystemMemory");
        record_free("SystemMemory");
        record_map(MapFlags::READWRITE);
        record_map_failure("read-only");
        record_copy(64);
    }
}
