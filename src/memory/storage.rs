//! Backing storage for memory blocks.

use super::lock::MapLock;
use crate::error::{Error, Result};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique storage IDs.
static STORAGE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_storage_id() -> u64 {
    STORAGE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Callback run when wrapped storage is destroyed.
///
/// It receives the wrapped bytes back, so the owner can recycle or inspect
/// them.
pub type DestroyNotify = Box<dyn FnOnce(Vec<u8>) + Send + 'static>;

/// A contiguous byte region backing one or more memory blocks.
///
/// The region is either allocated here (zeroed, with a requested alignment)
/// or wraps a caller-provided `Vec<u8>`. Blocks created with
/// [`Memory::share`](crate::Memory::share) hold the same storage, so the
/// region (and its destroy notification) lives until the last view is gone.
///
/// All data access after construction goes through `ptr`; the owning vector
/// is only touched again when the storage is dropped.
pub struct Storage {
    /// Owns the allocation. Never read while views exist.
    data: Vec<u8>,
    /// Start of the usable region inside `data`.
    ptr: NonNull<u8>,
    /// Usable length (the blocks' `maxsize`).
    len: usize,
    /// Map lock shared by every view of this region.
    lock: MapLock,
    notify: Option<DestroyNotify>,
    id: u64,
}

impl Storage {
    /// Allocate a zeroed region of `len` bytes aligned to `align`.
    ///
    /// # Errors
    ///
    /// Returns an error if `align` is not a power of two or the heap refuses
    /// the allocation.
    pub fn zeroed(len: usize, align: usize) -> Result<Self> {
        if !align.is_power_of_two() {
            return Err(Error::InvalidAlignment(align));
        }

        // Over-allocate so an aligned start always fits
        let total = len.checked_add(align - 1).ok_or(Error::SizeOverflow)?;
        let mut data = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|e| Error::AllocationFailed(e.to_string()))?;
        data.resize(total, 0);

        let start = if total == 0 {
            0
        } else {
            data.as_ptr().align_offset(align)
        };
        if start.checked_add(len).is_none_or(|end| end > total) {
            return Err(Error::AllocationFailed(format!(
                "could not achieve alignment of {} bytes",
                align
            )));
        }

        Ok(Self::from_parts(data, start, len, None))
    }

    /// Wrap caller-provided bytes. The first `len` bytes form the region.
    ///
    /// # Errors
    ///
    /// Returns an error if `len` exceeds the vector's length.
    pub fn from_vec(data: Vec<u8>, len: usize, notify: Option<DestroyNotify>) -> Result<Self> {
        if len > data.len() {
            return Err(Error::InvalidWindow {
                offset: 0,
                size: len,
                maxsize: data.len(),
            });
        }

        Ok(Self::from_parts(data, 0, len, notify))
    }

    fn from_parts(mut data: Vec<u8>, start: usize, len: usize, notify: Option<DestroyNotify>) -> Self {
        // SAFETY: start <= data.len() is checked by both constructors, so the
        // pointer stays inside (or one past) the allocation.
        let ptr = unsafe { NonNull::new_unchecked(data.as_mut_ptr().add(start)) };
        let id = next_storage_id();
        tracing::trace!(storage = id, len, "storage created");

        Self {
            data,
            ptr,
            len,
            lock: MapLock::new(),
            notify,
            id,
        }
    }

    /// Length of the region in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the region has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Unique ID of this storage (for logs).
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Pointer to the start of the region.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn lock(&self) -> &MapLock {
        &self.lock
    }

    /// View `len` bytes starting at `offset`.
    ///
    /// # Safety
    ///
    /// The caller must hold a map lock on this storage and `offset + len`
    /// must not exceed [`len`](Self::len).
    pub(crate) unsafe fn slice(&self, offset: usize, len: usize) -> &[u8] {
        debug_assert!(offset + len <= self.len);
        // SAFETY: In bounds per the caller; the map lock rules out writers.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().add(offset), len) }
    }

    /// Mutable view of `len` bytes starting at `offset`.
    ///
    /// # Safety
    ///
    /// The caller must hold the write map lock on this storage, must not
    /// create overlapping views, and `offset + len` must not exceed
    /// [`len`](Self::len).
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn slice_mut(&self, offset: usize, len: usize) -> &mut [u8] {
        debug_assert!(offset + len <= self.len);
        // SAFETY: In bounds per the caller; the write lock is exclusive.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(offset), len) }
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        tracing::trace!(storage = self.id, len = self.len, "storage destroyed");
        if let Some(notify) = self.notify.take() {
            notify(std::mem::take(&mut self.data));
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("id", &self.id)
            .field("len", &self.len)
            .field("notify", &self.notify.is_some())
            .finish()
    }
}

// SAFETY: The region is only reached through `ptr` under the map lock,
// which serializes writers against every other view. The destroy
// notification is `Send` and is only touched from `drop`.
unsafe impl Send for Storage {}
unsafe impl Sync for Storage {}
