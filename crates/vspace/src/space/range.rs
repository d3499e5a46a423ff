//! Address-Range Bookkeeping for Incremental Commit
//!
//! An [`AddressRange`] subdivides one reserved stretch of address space
//! into a committed prefix and an uncommitted suffix and moves the
//! boundary between them on demand:
//!
//! ```text
//! reserved_low      committed_low   committed_high        reserved_high
//!     │                  │               │                      │
//!     ▼                  ▼               ▼                      ▼
//!     ┌──────────────────┬───────────────┬──────────────────────┐
//!     │   (unused gap)   │   committed   │     uncommitted      │
//!     └──────────────────┴───────────────┴──────────────────────┘
//!                         ◄── backed ──►   ◄── reserved only ──►
//! ```
//!
//! `expand_by` and `shrink_by` move only `committed_high`; generations
//! grow and shrink from the top. The gap between `reserved_low` and
//! `committed_low` is empty in freshly constructed ranges and only ever
//! appears through [`AddressRange::set_committed`].
//!
//! The range carries no locks. Exactly one logical owner may mutate it at
//! a time; the queries may run concurrently with each other but not with
//! a resize or release.

use crate::config::SpaceConfig;
use crate::mem::backing::{CommitBackend, OsBackend};
use crate::mem::reservation::Reservation;
use crate::space::policy::{ChunkGranular, ResizePolicy};
use crate::util::Alignment;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Tracker for the committed prefix of a reserved address range
///
/// Construction transfers ownership of the reservation in;
/// [`AddressRange::release`] (or plain drop) gives it back exactly once.
pub struct AddressRange {
    /// Commit granularity in bytes; fixed for the lifetime
    alignment: usize,

    /// Reserved area, immutable after construction
    reserved_low: usize,
    reserved_high: usize,

    /// Committed area
    committed_low: usize,
    committed_high: usize,

    /// The entire range is already backed and pinned; the backend is
    /// never called, but the boundary still tracks logical usage
    special: bool,

    /// Rounding strategy chosen at construction
    policy: Box<dyn ResizePolicy>,

    /// Commit/uncommit primitives
    backend: Box<dyn CommitBackend>,

    /// Owned reservation; dropped last, returning the range to the OS
    /// layer or the external provider
    #[allow(dead_code)]
    reservation: Reservation,
}

impl AddressRange {
    /// Construct over a reservation with the default policy and the OS
    /// backend
    ///
    /// Nothing is committed initially; both committed bounds start at the
    /// reservation base.
    ///
    /// # Panics
    ///
    /// Panics when `alignment` is not a nonzero power of two, or when the
    /// reservation's base or size is not a multiple of `alignment`. Those
    /// are contract violations in the owning collector, not runtime
    /// conditions.
    pub fn new(reservation: Reservation, alignment: usize) -> Self {
        Self::with_parts(
            reservation,
            alignment,
            Box::new(ChunkGranular),
            Box::new(OsBackend),
        )
    }

    /// Construct from a validated [`SpaceConfig`]
    ///
    /// # Panics
    ///
    /// Same contract as [`AddressRange::new`]; run
    /// [`SpaceConfig::validate`] first to reject bad tuning without
    /// panicking.
    pub fn with_config(reservation: Reservation, config: &SpaceConfig) -> Self {
        Self::with_parts(
            reservation,
            config.alignment,
            config.granularity.policy(),
            Box::new(OsBackend),
        )
    }

    /// Fully explicit constructor: choose policy and backend
    ///
    /// This is the seam for simulations and tests; pair a raw
    /// reservation with a [`NoopBackend`](crate::mem::backing::NoopBackend)
    /// or a mock and no memory is ever touched.
    ///
    /// # Panics
    ///
    /// Same contract as [`AddressRange::new`].
    pub fn with_parts(
        reservation: Reservation,
        alignment: usize,
        policy: Box<dyn ResizePolicy>,
        backend: Box<dyn CommitBackend>,
    ) -> Self {
        assert!(
            alignment.is_power_of_two(),
            "alignment {} must be a nonzero power of two",
            alignment
        );
        assert!(
            Alignment::is_aligned(reservation.base(), alignment),
            "reservation base {:#x} is not aligned to {}",
            reservation.base(),
            alignment
        );
        assert!(
            Alignment::is_aligned(reservation.size(), alignment),
            "reservation size {} is not a multiple of alignment {}",
            reservation.size(),
            alignment
        );

        let low = reservation.base();
        let high = low.checked_add(reservation.size()).unwrap_or_else(|| {
            panic!(
                "reservation {:#x}+{} overflows the address space",
                low,
                reservation.size()
            )
        });

        let range = Self {
            alignment,
            reserved_low: low,
            reserved_high: high,
            committed_low: low,
            committed_high: low,
            special: reservation.is_special(),
            policy,
            backend,
            reservation,
        };
        range.verify();
        range
    }

    // Accessors (all sizes are bytes).

    /// Commit granularity unit
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Lowest reserved address
    pub fn reserved_low(&self) -> usize {
        self.reserved_low
    }

    /// One past the highest reserved address
    pub fn reserved_high(&self) -> usize {
        self.reserved_high
    }

    /// Lowest committed address
    pub fn committed_low(&self) -> usize {
        self.committed_low
    }

    /// One past the highest committed address
    pub fn committed_high(&self) -> usize {
        self.committed_high
    }

    /// Whether the backing is pinned and the backend bypassed
    pub fn is_special(&self) -> bool {
        self.special
    }

    /// Bytes currently committed
    pub fn committed_size(&self) -> usize {
        self.committed_high - self.committed_low
    }

    /// Bytes reserved in total
    pub fn reserved_size(&self) -> usize {
        self.reserved_high - self.reserved_low
    }

    /// Bytes reserved but not committed
    pub fn uncommitted_size(&self) -> usize {
        self.reserved_size() - self.committed_size()
    }

    /// Half-open containment test against the committed area
    pub fn is_in_committed(&self, addr: usize) -> bool {
        addr >= self.committed_low && addr < self.committed_high
    }

    /// Half-open containment test against the reserved area
    pub fn is_in_reserved(&self, addr: usize) -> bool {
        addr >= self.reserved_low && addr < self.reserved_high
    }

    /// Grow the committed area from its high end toward `reserved_high`
    ///
    /// The request is rounded up to the policy granularity and clamped at
    /// the reserved boundary; when the full request does not fit, as much
    /// as still fits is committed. Growth is best-effort: the return
    /// value is `false` only when zero bytes were added, either because
    /// the range was already fully committed or because the commit
    /// primitive failed. The amount actually committed is observable via
    /// [`AddressRange::committed_size`].
    ///
    /// A zero-byte request is a no-op success. `committed_low` never
    /// moves. On primitive failure the boundary is left untouched.
    pub fn expand_by(&mut self, bytes: usize) -> bool {
        let mut this = BoundaryVerifier::new(self);

        if bytes == 0 {
            return true;
        }

        let grain = this.policy.granularity(this.alignment);
        let rounded = Alignment::align_up_saturating(bytes, grain);

        let old_high = this.committed_high;
        let new_high = match old_high.checked_add(rounded) {
            Some(h) => h.min(this.reserved_high),
            None => this.reserved_high,
        };
        let grown = new_high - old_high;

        if grown == 0 {
            log::debug!(
                "expand_by({}) rejected, range fully committed: {}",
                bytes,
                this.boundaries()
            );
            return false;
        }

        if !this.special {
            if let Err(err) = this.backend.commit(old_high, grown) {
                log::warn!(
                    "expand_by({}) failed to commit {} bytes at {:#x}: {}",
                    bytes,
                    grown,
                    old_high,
                    err
                );
                return false;
            }
        }

        this.committed_high = new_high;
        if grown < rounded {
            log::debug!(
                "expand_by({}) clamped at the reserved boundary, grew {} of {} bytes",
                bytes,
                grown,
                rounded
            );
        }
        true
    }

    /// Shrink the committed area from its high end
    ///
    /// The request is rounded up to the policy granularity and clamped so
    /// the boundary never drops below `committed_low`. Uncommit is
    /// best-effort: when the primitive fails the boundary moves anyway,
    /// since pages kept resident waste memory but do not corrupt state.
    ///
    /// A zero-byte request is a no-op success; otherwise the return value
    /// reports whether any shrink occurred.
    pub fn shrink_by(&mut self, bytes: usize) -> bool {
        let mut this = BoundaryVerifier::new(self);

        if bytes == 0 {
            return true;
        }

        let grain = this.policy.granularity(this.alignment);
        let rounded = Alignment::align_up_saturating(bytes, grain);

        let old_high = this.committed_high;
        let new_high = old_high.saturating_sub(rounded).max(this.committed_low);
        let shrunk = old_high - new_high;

        if shrunk == 0 {
            return false;
        }

        if !this.special {
            if let Err(err) = this.backend.uncommit(new_high, shrunk) {
                log::warn!(
                    "shrink_by({}) could not return {} bytes at {:#x}, moving boundary anyway: {}",
                    bytes,
                    shrunk,
                    new_high,
                    err
                );
            }
        }

        this.committed_high = new_high;
        true
    }

    /// Move both committed bounds at once
    ///
    /// Bookkeeping only: no commit or uncommit is issued, the caller owns
    /// the backing state of the addresses involved. Used by owners that
    /// carve a pre-committed reservation between generations.
    ///
    /// # Panics
    ///
    /// Panics when the new pair violates containment in the reserved area
    /// or the granularity of the boundary offsets.
    pub fn set_committed(&mut self, low: usize, high: usize) {
        assert!(
            self.reserved_low <= low && low <= high && high <= self.reserved_high,
            "committed pair [{:#x}, {:#x}) escapes reserved [{:#x}, {:#x})",
            low,
            high,
            self.reserved_low,
            self.reserved_high
        );
        let grain = self.policy.granularity(self.alignment);
        assert!(
            Alignment::is_aligned(low - self.reserved_low, grain)
                && Alignment::is_aligned(high - self.reserved_low, grain),
            "committed pair [{:#x}, {:#x}) breaks granularity {}",
            low,
            high,
            grain
        );

        self.committed_low = low;
        self.committed_high = high;
        self.verify();
    }

    /// Uncommit everything and return the reservation
    ///
    /// Consuming `self` makes double release and use-after-release
    /// compile-time errors. Dropping a range without calling this
    /// performs the same teardown.
    pub fn release(self) {
        log::debug!("releasing {}", self.boundaries());
    }

    /// Snapshot of the four boundary addresses
    pub fn boundaries(&self) -> Boundaries {
        Boundaries {
            reserved_low: self.reserved_low,
            reserved_high: self.reserved_high,
            committed_low: self.committed_low,
            committed_high: self.committed_high,
        }
    }

    /// Emit the boundary addresses and sizes through the log facade
    ///
    /// Diagnostic only; never read this back for control flow.
    pub fn log_boundaries(&self) {
        log::debug!("{}", self.boundaries());
    }

    /// Assert the full boundary invariant set
    ///
    /// Debug builds only; compiles to nothing in release builds. A
    /// violation is a bug in the resize engine itself and panics with the
    /// full boundary dump.
    pub fn verify(&self) {
        #[cfg(debug_assertions)]
        {
            assert!(
                self.reserved_low <= self.committed_low
                    && self.committed_low <= self.committed_high
                    && self.committed_high <= self.reserved_high,
                "boundary ordering violated: {}",
                self.boundaries()
            );
            let grain = self.policy.granularity(self.alignment);
            assert!(
                Alignment::is_aligned(self.reserved_size(), grain)
                    && Alignment::is_aligned(self.committed_low - self.reserved_low, grain)
                    && Alignment::is_aligned(self.committed_high - self.reserved_low, grain),
                "boundary granularity {} violated: {}",
                grain,
                self.boundaries()
            );
        }
    }
}

impl Drop for AddressRange {
    fn drop(&mut self) {
        let committed = self.committed_size();
        if !self.special && committed > 0 {
            if let Err(err) = self.backend.uncommit(self.committed_low, committed) {
                log::warn!(
                    "teardown could not return {} bytes at {:#x}: {}",
                    committed,
                    self.committed_low,
                    err
                );
            }
        }
        self.committed_low = self.reserved_low;
        self.committed_high = self.reserved_low;
        // The reservation field drops after this body and hands the
        // address space back.
    }
}

impl fmt::Debug for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressRange")
            .field("alignment", &self.alignment)
            .field("policy", &self.policy.name())
            .field("special", &self.special)
            .field("boundaries", &self.boundaries())
            .finish()
    }
}

/// Plain snapshot of the four boundary addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundaries {
    pub reserved_low: usize,
    pub reserved_high: usize,
    pub committed_low: usize,
    pub committed_high: usize,
}

impl Boundaries {
    /// Bytes committed at snapshot time
    pub fn committed_size(&self) -> usize {
        self.committed_high - self.committed_low
    }

    /// Bytes reserved at snapshot time
    pub fn reserved_size(&self) -> usize {
        self.reserved_high - self.reserved_low
    }
}

impl fmt::Display for Boundaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reserved [{:#x}, {:#x}) ({} bytes), committed [{:#x}, {:#x}) ({} bytes)",
            self.reserved_low,
            self.reserved_high,
            self.reserved_size(),
            self.committed_low,
            self.committed_high,
            self.committed_size()
        )
    }
}

/// Scoped invariant check around a block that touches a range
///
/// Construction verifies, dropping verifies again, so the check runs on
/// every exit path of the guarded block including early returns. The
/// guard derefs to the range, so the borrow it holds is also the handle
/// for working with it:
///
/// ```
/// use vspace::{AddressRange, BoundaryVerifier, ChunkGranular, NoopBackend, Reservation};
///
/// let reservation = unsafe { Reservation::from_raw_parts(0x4000_0000, 1 << 20, false) };
/// let mut range = AddressRange::with_parts(
///     reservation,
///     4096,
///     Box::new(ChunkGranular),
///     Box::new(NoopBackend),
/// );
///
/// let mut guarded = BoundaryVerifier::new(&mut range);
/// guarded.expand_by(8192);
/// assert_eq!(guarded.committed_size(), 8192);
/// // dropping `guarded` re-verifies
/// ```
pub struct BoundaryVerifier<'a> {
    range: &'a mut AddressRange,
}

impl<'a> BoundaryVerifier<'a> {
    /// Verify now and again when the guard drops
    pub fn new(range: &'a mut AddressRange) -> Self {
        range.verify();
        Self { range }
    }
}

impl Deref for BoundaryVerifier<'_> {
    type Target = AddressRange;

    fn deref(&self) -> &AddressRange {
        self.range
    }
}

impl DerefMut for BoundaryVerifier<'_> {
    fn deref_mut(&mut self) -> &mut AddressRange {
        self.range
    }
}

impl Drop for BoundaryVerifier<'_> {
    fn drop(&mut self) {
        self.range.verify();
    }
}
