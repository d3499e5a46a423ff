//! Commit/Uncommit Primitives
//!
//! The address-range engine never talks to the OS paging interface
//! directly. It calls a [`CommitBackend`], which turns sub-ranges of an
//! already-reserved mapping into usable memory and back:
//!
//! ```text
//! Reserve ──► Commit ──► Use ──► Uncommit ──► (Return to OS)
//!    │          │         │          │
//!    │          │         │          └── madvise(MADV_DONTNEED) + mprotect(PROT_NONE)
//!    │          │         └── Read/Write operations
//!    │          └── mprotect(PROT_READ | PROT_WRITE)
//!    └── mmap(PROT_NONE)
//! ```
//!
//! On Windows the same lifecycle maps to VirtualAlloc(MEM_COMMIT) and
//! VirtualFree(MEM_DECOMMIT).

use crate::error::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Commit/uncommit primitives for an already-reserved range
///
/// `commit` must be idempotent when called again on already-committed
/// pages. `uncommit` releases physical backing while keeping the
/// addresses reserved. Neither primitive may report partial success;
/// splitting a request below its own granularity is the implementation's
/// problem, not the caller's.
pub trait CommitBackend: Send + Sync {
    /// Back `[addr, addr + bytes)` with real memory and make it
    /// accessible
    fn commit(&self, addr: usize, bytes: usize) -> Result<()>;

    /// Release the physical backing of `[addr, addr + bytes)` while
    /// keeping the addresses reserved
    fn uncommit(&self, addr: usize, bytes: usize) -> Result<()>;
}

/// Backend driving the real OS paging interface
///
/// Unix: `mprotect` opens committed windows, `madvise(MADV_DONTNEED)`
/// plus `mprotect(PROT_NONE)` closes them. Windows: `VirtualAlloc` /
/// `VirtualFree`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsBackend;

#[cfg(unix)]
impl CommitBackend for OsBackend {
    fn commit(&self, addr: usize, bytes: usize) -> Result<()> {
        use crate::error::VspaceError;

        if bytes == 0 {
            return Ok(());
        }
        let rc = unsafe {
            libc::mprotect(
                addr as *mut libc::c_void,
                bytes,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        };
        if rc != 0 {
            return Err(VspaceError::CommitFailed {
                addr,
                bytes,
                reason: std::io::Error::last_os_error().to_string(),
            });
        }
        Ok(())
    }

    fn uncommit(&self, addr: usize, bytes: usize) -> Result<()> {
        use crate::error::VspaceError;

        if bytes == 0 {
            return Ok(());
        }
        unsafe {
            if libc::madvise(addr as *mut libc::c_void, bytes, libc::MADV_DONTNEED) != 0 {
                return Err(VspaceError::UncommitFailed {
                    addr,
                    bytes,
                    reason: std::io::Error::last_os_error().to_string(),
                });
            }
            if libc::mprotect(addr as *mut libc::c_void, bytes, libc::PROT_NONE) != 0 {
                return Err(VspaceError::UncommitFailed {
                    addr,
                    bytes,
                    reason: std::io::Error::last_os_error().to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(windows)]
impl CommitBackend for OsBackend {
    fn commit(&self, addr: usize, bytes: usize) -> Result<()> {
        use crate::error::VspaceError;
        use windows_sys::Win32::System::Memory::{VirtualAlloc, MEM_COMMIT, PAGE_READWRITE};

        if bytes == 0 {
            return Ok(());
        }
        let mapped = unsafe {
            VirtualAlloc(
                addr as *const core::ffi::c_void,
                bytes,
                MEM_COMMIT,
                PAGE_READWRITE,
            )
        };
        if mapped.is_null() {
            let code = unsafe { windows_sys::Win32::Foundation::GetLastError() };
            return Err(VspaceError::CommitFailed {
                addr,
                bytes,
                reason: format!("VirtualAlloc failed with code {}", code),
            });
        }
        Ok(())
    }

    fn uncommit(&self, addr: usize, bytes: usize) -> Result<()> {
        use crate::error::VspaceError;
        use windows_sys::Win32::System::Memory::{VirtualFree, MEM_DECOMMIT};

        if bytes == 0 {
            return Ok(());
        }
        let ok = unsafe { VirtualFree(addr as *mut core::ffi::c_void, bytes, MEM_DECOMMIT) };
        if ok == 0 {
            let code = unsafe { windows_sys::Win32::Foundation::GetLastError() };
            return Err(VspaceError::UncommitFailed {
                addr,
                bytes,
                reason: format!("VirtualFree failed with code {}", code),
            });
        }
        Ok(())
    }
}

/// Backend that performs no OS work and always succeeds
///
/// For simulations and for embedders that manage backing themselves and
/// only want the boundary bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackend;

impl CommitBackend for NoopBackend {
    fn commit(&self, _addr: usize, _bytes: usize) -> Result<()> {
        Ok(())
    }

    fn uncommit(&self, _addr: usize, _bytes: usize) -> Result<()> {
        Ok(())
    }
}

/// Shared counter handle for a [`CountingBackend`]
///
/// Cheap to clone; counts stay readable after the backend itself has
/// been boxed into a range.
#[derive(Debug, Clone, Default)]
pub struct BackendCounters {
    cells: Arc<CounterCells>,
}

#[derive(Debug, Default)]
struct CounterCells {
    commits: AtomicUsize,
    committed_bytes: AtomicUsize,
    uncommits: AtomicUsize,
    uncommitted_bytes: AtomicUsize,
}

impl BackendCounters {
    /// Number of commit calls issued
    pub fn commits(&self) -> usize {
        self.cells.commits.load(Ordering::Relaxed)
    }

    /// Total bytes requested across commit calls
    pub fn committed_bytes(&self) -> usize {
        self.cells.committed_bytes.load(Ordering::Relaxed)
    }

    /// Number of uncommit calls issued
    pub fn uncommits(&self) -> usize {
        self.cells.uncommits.load(Ordering::Relaxed)
    }

    /// Total bytes requested across uncommit calls
    pub fn uncommitted_bytes(&self) -> usize {
        self.cells.uncommitted_bytes.load(Ordering::Relaxed)
    }
}

/// Wraps another backend and counts the calls made to it
///
/// Counts record attempts, not outcomes, so a failing inner backend is
/// still observable.
pub struct CountingBackend<B> {
    inner: B,
    counters: BackendCounters,
}

impl<B: CommitBackend> CountingBackend<B> {
    /// Wrap `inner`, starting all counters at zero
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            counters: BackendCounters::default(),
        }
    }

    /// Handle to the counters
    pub fn counters(&self) -> BackendCounters {
        self.counters.clone()
    }
}

impl<B: CommitBackend> CommitBackend for CountingBackend<B> {
    fn commit(&self, addr: usize, bytes: usize) -> Result<()> {
        self.counters.cells.commits.fetch_add(1, Ordering::Relaxed);
        self.counters
            .cells
            .committed_bytes
            .fetch_add(bytes, Ordering::Relaxed);
        self.inner.commit(addr, bytes)
    }

    fn uncommit(&self, addr: usize, bytes: usize) -> Result<()> {
        self.counters.cells.uncommits.fetch_add(1, Ordering::Relaxed);
        self.counters
            .cells
            .uncommitted_bytes
            .fetch_add(bytes, Ordering::Relaxed);
        self.inner.uncommit(addr, bytes)
    }
}
