//! Observability: metrics for allocations, maps and copies.
//!
//! Logging goes through `tracing` directly at the call sites; this module
//! only holds the `metrics-rs` instrumentation.
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `memblock_allocations` | Counter | Storage regions allocated or wrapped |
//! | `memblock_bytes_allocated` | Counter | Bytes of storage allocated or wrapped |
//! | `memblock_blocks_live` | Gauge | Blocks alive, including shared sub-blocks |
//! | `memblock_frees` | Counter | Blocks destroyed |
//! | `memblock_maps` | Counter | Successful maps, by access |
//! | `memblock_map_failures` | Counter | Refused maps, by reason |
//! | `memblock_copies` | Counter | Blocks copied |
//! | `memblock_bytes_copied` | Counter | Bytes copied |

mod metrics;

pub use self::metrics::{
    init_metrics, record_alloc, record_block_created, record_copy, record_free, record_map,
    record_map_failure,
};
