// Anonymous private mapping, advised for transparent huge pages
//
// The parent owns the mapping and releases it on drop. Forked workers inherit
// a copy-on-write copy of it and release that copy with `unmap_inherited`.

use std::num::NonZeroUsize;

use anyhow::Context;
use libc::c_void;
use log::debug;
use nix::sys::mman::{madvise, mmap, munmap, MapFlags, MmapAdvise, ProtFlags};

/// Huge page granularity on x86_64 / aarch64 with 4k base pages
pub const HUGE_PAGE_SIZE: usize = 2 * 1024 * 1024;

/// Written over the whole mapping to force page allocation
pub const FILL_PATTERN: u8 = 0xFF;

pub struct Region {
    ptr: *mut c_void,
    len: NonZeroUsize,
}

impl Region {
    /// mmap(NULL, len, PROT_READ|PROT_WRITE, MAP_ANONYMOUS|MAP_PRIVATE, -1, 0)
    pub fn map_anonymous(len: usize) -> anyhow::Result<Self> {
        let len = NonZeroUsize::new(len).context("mmap failed: zero length")?;

        let ptr = unsafe {
            mmap(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_ANONYMOUS | MapFlags::MAP_PRIVATE,
                -1,
                0,
            )
        }
        .context("mmap failed")?;

        debug!("Mapped {} bytes at {:p}", len, ptr);
        Ok(Self { ptr, len })
    }

    /// The hint being ignored by the kernel is not an error, only the call failing is
    pub fn advise_huge_pages(&self) -> anyhow::Result<()> {
        unsafe { madvise(self.ptr, self.len.get(), MmapAdvise::MADV_HUGEPAGE) }
            .context("madvise MADV_HUGEPAGE failed")?;

        debug!(
            "Advised {} huge pages of {} bytes",
            self.huge_pages(),
            HUGE_PAGE_SIZE
        );
        Ok(())
    }

    /// Touch every byte
    pub fn fill(&mut self, pattern: u8) {
        unsafe { std::ptr::write_bytes(self.ptr as *mut u8, pattern, self.len.get()) };
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    /// Number of huge pages needed to back the whole mapping
    pub fn huge_pages(&self) -> usize {
        self.len.get().div_ceil(HUGE_PAGE_SIZE)
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr as *const u8, self.len.get()) }
    }

    /// Unmap the copy of the mapping inherited through fork
    ///
    /// # Safety
    /// Only call this in a forked child which never touches the region again
    /// and exits without running its destructor.
    pub unsafe fn unmap_inherited(&self) -> nix::Result<()> {
        munmap(self.ptr, self.len.get())
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        if let Err(e) = unsafe { munmap(self.ptr, self.len.get()) } {
            log::warn!("munmap of {:p} failed: {}", self.ptr, e);
        }
    }
}
