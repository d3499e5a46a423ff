//! Reservations - Exclusively Owned Address Ranges
//!
//! A [`Reservation`] is a contiguous, page-aligned stretch of virtual
//! address space claimed so no other allocator will use it. It carries no
//! promise about physical backing; the commit primitives open usable
//! windows inside it on demand.
//!
//! Two kinds exist:
//! - OS-mapped, owned by this process ([`Reservation::reserve`] and
//!   [`Reservation::reserve_pinned`]); dropping the value unmaps the
//!   range, which is the release primitive.
//! - Caller-supplied raw ranges ([`Reservation::from_raw_parts`]);
//!   dropping forgets the range and the provider reclaims it.

use crate::error::{Result, VspaceError};
use crate::util::Alignment;
use memmap2::{MmapMut, MmapOptions};

enum Backing {
    /// Anonymous mapping owned by this reservation; dropping unmaps
    Mapped(MmapMut),
    /// Caller-owned range; dropping is a no-op
    Raw,
}

/// An exclusively owned, page-aligned address range
pub struct Reservation {
    backing: Backing,
    base: usize,
    size: usize,
    special: bool,
}

impl Reservation {
    /// Reserve `size` bytes of address space without backing it
    ///
    /// The size is rounded up to the system page size. On unix the fresh
    /// range starts fully inaccessible; commits open windows as the
    /// owning range grows.
    pub fn reserve(size: usize) -> Result<Self> {
        let aligned = Alignment::align_up_saturating(size, page_size::get());
        if aligned == 0 {
            return Err(VspaceError::Reservation(
                "cannot reserve an empty range".to_string(),
            ));
        }

        let mmap = MmapOptions::new().len(aligned).map_anon().map_err(|e| {
            VspaceError::Reservation(format!("failed to map {} bytes: {}", aligned, e))
        })?;
        let base = mmap.as_ptr() as usize;

        #[cfg(unix)]
        unsafe {
            if libc::mprotect(base as *mut libc::c_void, aligned, libc::PROT_NONE) != 0 {
                log::warn!(
                    "could not drop protection on fresh reservation at {:#x}: {}",
                    base,
                    std::io::Error::last_os_error()
                );
            }
        }

        log::debug!("reserved {} bytes at {:#x}", aligned, base);
        Ok(Self {
            backing: Backing::Mapped(mmap),
            base,
            size: aligned,
            special: false,
        })
    }

    /// Reserve `size` bytes with the backing materialized up front
    ///
    /// Every page is touched so the whole range is physically backed
    /// before use. The resulting reservation is special: a range built
    /// over it never issues commit/uncommit calls.
    pub fn reserve_pinned(size: usize) -> Result<Self> {
        let aligned = Alignment::align_up_saturating(size, page_size::get());
        if aligned == 0 {
            return Err(VspaceError::Reservation(
                "cannot reserve an empty range".to_string(),
            ));
        }

        let mut mmap = MmapOptions::new().len(aligned).map_anon().map_err(|e| {
            VspaceError::Reservation(format!("failed to map {} bytes: {}", aligned, e))
        })?;

        let page = page_size::get();
        let mut offset = 0;
        while offset < aligned {
            mmap[offset] = 0;
            offset += page;
        }

        let base = mmap.as_ptr() as usize;
        log::info!("reserved {} pre-touched bytes at {:#x}", aligned, base);
        Ok(Self {
            backing: Backing::Mapped(mmap),
            base,
            size: aligned,
            special: true,
        })
    }

    /// Wrap an externally owned range
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `[base, base + size)` stays
    /// exclusively owned by the returned value for its whole lifetime and
    /// that `base + size` does not overflow. When the range is driven by
    /// a backend that touches memory, the addresses must come from a real
    /// reservation; for bookkeeping-only use with [`NoopBackend`] or a
    /// mock, synthetic addresses are fine.
    ///
    /// [`NoopBackend`]: crate::mem::backing::NoopBackend
    pub unsafe fn from_raw_parts(base: usize, size: usize, special: bool) -> Self {
        Self {
            backing: Backing::Raw,
            base,
            size,
            special,
        }
    }

    /// Lowest address of the range
    pub fn base(&self) -> usize {
        self.base
    }

    /// Size of the range in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// One past the highest address of the range
    pub fn end(&self) -> usize {
        self.base + self.size
    }

    /// Whether the whole range is already backed and pinned
    pub fn is_special(&self) -> bool {
        self.special
    }

    /// Half-open containment test
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.end()
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("base", &format_args!("{:#x}", self.base))
            .field("size", &self.size)
            .field("special", &self.special)
            .field(
                "backing",
                &match self.backing {
                    Backing::Mapped(_) => "mapped",
                    Backing::Raw => "raw",
                },
            )
            .finish()
    }
}
