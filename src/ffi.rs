//! C ABI for language bindings.
//!
//! Blocks cross the boundary as opaque `MemblockMemory` pointers. Every
//! pointer returned by this module is one owned reference: release it with
//! [`memblock_memory_unref`]. [`memblock_memory_ref`] returns a *new*
//! pointer for the new reference, so each pointer is unref'd exactly once.
//!
//! Maps are described by a caller-owned [`MemblockMapInfo`], filled by
//! [`memblock_memory_map`] and released by [`memblock_memory_unmap`].
//! Unmapping an info that holds no map is a no-op.
//!
//! Null pointers are accepted everywhere and produce null, zero or `false`.

use crate::allocator::AllocationParams;
use crate::defaults::SIZE_TO_END;
use crate::flags::{MapFlags, MemoryFlags};
use crate::memory::{MapInfo, Memory};
use std::ffi::c_void;
use std::ptr;

/// Opaque reference to a memory block.
pub struct MemblockMemory {
    memory: Memory,
}

/// Callback run with `user_data` when wrapped memory is destroyed.
pub type MemblockDestroyNotify = Option<unsafe extern "C" fn(user_data: *mut c_void)>;

/// A map of a block, as seen from C.
#[repr(C)]
#[derive(Debug)]
pub struct MemblockMapInfo {
    /// First valid byte.
    pub data: *mut u8,
    /// Number of valid bytes.
    pub size: usize,
    /// Bytes from `data` to the end of the storage.
    pub maxsize: usize,
    /// Access the map was taken with (`MapFlags` bits).
    pub flags: u32,
    guard: *mut MapInfo,
}

impl Default for MemblockMapInfo {
    fn default() -> Self {
        Self {
            data: ptr::null_mut(),
            size: 0,
            maxsize: 0,
            flags: 0,
            guard: ptr::null_mut(),
        }
    }
}

/// Caller's opaque pointer for the destroy notification.
struct UserData(*mut c_void);

// SAFETY: The pointer is never dereferenced here; it is handed back to the
// caller's notify function, which must accept being run on any thread.
unsafe impl Send for UserData {}

impl UserData {
    fn notify(self, notify: unsafe extern "C" fn(*mut c_void)) {
        // SAFETY: The caller registered this function for this pointer.
        unsafe { notify(self.0) }
    }
}

fn into_raw(memory: Memory) -> *mut MemblockMemory {
    Box::into_raw(Box::new(MemblockMemory { memory }))
}

/// Borrow the block behind a pointer.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module.
unsafe fn memory<'a>(mem: *const MemblockMemory) -> Option<&'a Memory> {
    // SAFETY: Per the caller.
    unsafe { mem.as_ref() }.map(|m| &m.memory)
}

/// Translate a C size argument; `SIZE_TO_END` means "to the end".
fn size_arg(size: isize) -> Result<Option<usize>, ()> {
    match size {
        SIZE_TO_END => Ok(None),
        size if size < 0 => Err(()),
        size => Ok(Some(size as usize)),
    }
}

/// Wrap a copy of `len` bytes at `data` as a new block.
///
/// `notify`, if set, runs with `user_data` once the last reference to the
/// block (and to every block shared from it) is released. It does not run
/// if wrapping fails. Returns null if `offset + size > maxsize`,
/// `maxsize > len`, or `data` is null while `len > 0`.
///
/// # Safety
///
/// `data` must be valid for reads of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_new_wrapped(
    flags: u32,
    data: *const u8,
    len: usize,
    maxsize: usize,
    offset: usize,
    size: usize,
    notify: MemblockDestroyNotify,
    user_data: *mut c_void,
) -> *mut MemblockMemory {
    let bytes = if len == 0 {
        Vec::new()
    } else if data.is_null() {
        return ptr::null_mut();
    } else {
        // SAFETY: Per the caller, `data` is valid for `len` bytes.
        unsafe { std::slice::from_raw_parts(data, len) }.to_vec()
    };
    let flags = MemoryFlags::from_bits_truncate(flags);

    let memory = match notify {
        Some(notify) => {
            let user = UserData(user_data);
            Memory::new_wrapped_full(flags, bytes, maxsize, offset, size, move |_| {
                user.notify(notify)
            })
        }
        None => Memory::new_wrapped(flags, bytes, maxsize, offset, size),
    };

    memory.map_or(ptr::null_mut(), into_raw)
}

/// Allocate a block from the default allocator.
///
/// `align` is in bytes (`0` for the default). Returns null on failure.
#[unsafe(no_mangle)]
pub extern "C" fn memblock_memory_alloc(
    size: usize,
    align: usize,
    prefix: usize,
    padding: usize,
    flags: u32,
) -> *mut MemblockMemory {
    let params = AllocationParams::new()
        .with_flags(MemoryFlags::from_bits_truncate(flags))
        .with_align(align)
        .with_prefix(prefix)
        .with_padding(padding);

    Memory::alloc(None, size, &params).map_or(ptr::null_mut(), into_raw)
}

/// Take a new reference. The returned pointer must be unref'd on its own.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_ref(mem: *const MemblockMemory) -> *mut MemblockMemory {
    // SAFETY: Per the caller.
    unsafe { memory(mem) }.map_or(ptr::null_mut(), |m| into_raw(m.acquire()))
}

/// Release a reference. The block is destroyed with its last reference.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module; it is invalid
/// afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_unref(mem: *mut MemblockMemory) {
    if !mem.is_null() {
        // SAFETY: Per the caller, `mem` came from `Box::into_raw` and is
        // released exactly once.
        drop(unsafe { Box::from_raw(mem) });
    }
}

/// Size of the backing region.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_get_maxsize(mem: *const MemblockMemory) -> usize {
    // SAFETY: Per the caller.
    unsafe { memory(mem) }.map_or(0, Memory::maxsize)
}

/// Alignment of the backing region in bytes.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_get_alignment(mem: *const MemblockMemory) -> usize {
    // SAFETY: Per the caller.
    unsafe { memory(mem) }.map_or(0, Memory::alignment)
}

/// Start of the valid data.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_get_offset(mem: *const MemblockMemory) -> usize {
    // SAFETY: Per the caller.
    unsafe { memory(mem) }.map_or(0, Memory::offset)
}

/// Length of the valid data.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_get_size(mem: *const MemblockMemory) -> usize {
    // SAFETY: Per the caller.
    unsafe { memory(mem) }.map_or(0, Memory::size)
}

/// `MemoryFlags` bits of the block.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_get_flags(mem: *const MemblockMemory) -> u32 {
    // SAFETY: Per the caller.
    unsafe { memory(mem) }.map_or(0, |m| m.flags().bits())
}

/// New reference to the block's parent, or null.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_get_parent(mem: *const MemblockMemory) -> *mut MemblockMemory {
    // SAFETY: Per the caller.
    unsafe { memory(mem) }
        .and_then(Memory::parent)
        .map_or(ptr::null_mut(), into_raw)
}

/// Copy `size` bytes (`-1`: to the end) from `offset` into a new block.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_copy(
    mem: *const MemblockMemory,
    offset: isize,
    size: isize,
) -> *mut MemblockMemory {
    // SAFETY: Per the caller.
    let Some(memory) = (unsafe { memory(mem) }) else {
        return ptr::null_mut();
    };
    let Ok(size) = size_arg(size) else {
        return ptr::null_mut();
    };

    memory.copy(offset, size).map_or(ptr::null_mut(), into_raw)
}

/// Share `size` bytes (`-1`: to the end) from `offset` as a read-only
/// sub-block.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_share(
    mem: *const MemblockMemory,
    offset: isize,
    size: isize,
) -> *mut MemblockMemory {
    // SAFETY: Per the caller.
    let Some(memory) = (unsafe { memory(mem) }) else {
        return ptr::null_mut();
    };
    let Ok(size) = size_arg(size) else {
        return ptr::null_mut();
    };

    memory.share(offset, size).map_or(ptr::null_mut(), into_raw)
}

/// Map the block with `MapFlags` bits and fill `info`.
///
/// Returns `false` (leaving `info` untouched) if the map is refused.
///
/// # Safety
///
/// `mem` must be null or a live pointer from this module. `info` must be
/// null or valid for writes and must not hold an active map.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_map(
    mem: *const MemblockMemory,
    info: *mut MemblockMapInfo,
    flags: u32,
) -> bool {
    // SAFETY: Per the caller.
    let (Some(memory), Some(info)) = (unsafe { memory(mem) }, unsafe { info.as_mut() }) else {
        return false;
    };
    let Some(map) = memory.map(MapFlags::from_bits_truncate(flags)) else {
        return false;
    };

    *info = MemblockMapInfo {
        data: map.as_ptr().cast_mut(),
        size: map.size(),
        maxsize: map.maxsize(),
        flags: map.flags().bits(),
        guard: Box::into_raw(Box::new(map)),
    };
    true
}

/// Release the map held by `info` and reset it. No-op if nothing is mapped.
///
/// # Safety
///
/// `info` must be null or a pointer previously passed to
/// [`memblock_memory_map`] (or zero-initialized).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memblock_memory_unmap(info: *mut MemblockMapInfo) {
    // SAFETY: Per the caller.
    let Some(info) = (unsafe { info.as_mut() }) else {
        return;
    };
    if info.guard.is_null() {
        return;
    }

    // SAFETY: `guard` came from `Box::into_raw` in `memblock_memory_map` and
    // is cleared below, so it is freed once.
    drop(unsafe { Box::from_raw(info.guard) });
    *info = MemblockMapInfo::default();
}
