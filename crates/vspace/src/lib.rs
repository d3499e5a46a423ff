//! # vspace - Incremental Commit for Reserved Address Ranges
//!
//! vspace manages a contiguous region of virtual address space that has
//! already been reserved from the operating system, letting a
//! generational collector grow and shrink the usable, paged-in portion on
//! demand in fixed-size increments. The reserved range itself never moves
//! and is never re-reserved.
//!
//! ## Overview
//!
//! A reserved range is split into a committed prefix and an uncommitted
//! suffix. The heap-sizing policy of the collector decides how much to
//! grow or shrink; this crate owns the boundary bookkeeping and the
//! expand/shrink algorithms that keep the tracked state in sync with the
//! real mapping state, including under partial failure:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      Reserved range                         │
//! │  ┌──────────────────────────────┬─────────────────────────┐ │
//! │  │          committed           │       uncommitted       │ │
//! │  │   (backed, safe to touch)    │   (addresses only)      │ │
//! │  └──────────────────────────────┴─────────────────────────┘ │
//! │                                 ▲                           │
//! │                        committed_high                       │
//! │              moves up on expand, down on shrink             │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use vspace::{AddressRange, Reservation};
//!
//! fn main() -> Result<(), vspace::VspaceError> {
//!     let page = page_size::get();
//!     let reservation = Reservation::reserve(256 * page)?;
//!     let mut range = AddressRange::new(reservation, page);
//!
//!     // Grow the usable prefix; the OS backs the new window.
//!     assert!(range.expand_by(16 * page));
//!     assert_eq!(range.committed_size(), 16 * page);
//!
//!     // Give some of it back.
//!     assert!(range.shrink_by(8 * page));
//!     assert_eq!(range.committed_size(), 8 * page);
//!
//!     // Tear down exactly once; the reservation returns to the OS.
//!     range.release();
//!     Ok(())
//! }
//! ```
//!
//! ## Design
//!
//! - **Boundary tracker**: four addresses (reserved low/high, committed
//!   low/high), the alignment unit, and the special flag for pinned,
//!   pre-backed ranges.
//! - **Resize engine**: [`AddressRange::expand_by`] and
//!   [`AddressRange::shrink_by`] round requests up to a granularity,
//!   clamp against the reserved boundary, call the commit backend, and
//!   move the boundary only when that succeeds.
//! - **Lifecycle and diagnostics**: consuming
//!   [`AddressRange::release`], a debug-build invariant verifier with a
//!   scoped guard ([`BoundaryVerifier`]), and boundary printing through
//!   the `log` facade.
//!
//! The commit/uncommit primitives are a trait seam ([`CommitBackend`]):
//! [`OsBackend`] drives the real paging interface, [`NoopBackend`] and
//! [`CountingBackend`] support pinned ranges, simulations, and tests.
//! The rounding granularity is likewise a strategy chosen at
//! construction ([`ResizePolicy`]).
//!
//! ## Thread Safety
//!
//! There is no internal synchronization. Exactly one logical owner may
//! mutate a range at a time (the collector's memory-management thread or
//! a provably quiescent region such as a global pause). The size and
//! containment queries may run concurrently with each other but not with
//! `expand_by`, `shrink_by`, or `release`.
//!
//! ## Modules
//!
//! - [`config`]: construction-time tuning and validation
//! - [`error`]: error types for all vspace operations
//! - [`mem`]: reservations and commit/uncommit backends
//! - [`space`]: the boundary tracker, resize engine, and policies
//! - [`util`]: alignment math and byte-size constants

pub mod config;
pub mod error;

// Memory collaborators
pub mod mem;

// Core bookkeeping
pub mod space;

// Utilities
pub mod util;

pub use config::SpaceConfig;
pub use error::{Result, VspaceError};
pub use mem::{
    BackendCounters, CommitBackend, CountingBackend, NoopBackend, OsBackend, Reservation,
};
pub use space::{
    AddressRange, Boundaries, BoundaryVerifier, ByteGranular, ChunkGranular, Granularity,
    ResizePolicy,
};

use util::Alignment;

/// Crate version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reserve address space and wrap it in a range with default tuning
///
/// Convenience for the common case: page-size alignment, chunk-granular
/// resizes, OS-backed paging, nothing committed yet.
pub fn reserve(size: usize) -> Result<AddressRange> {
    reserve_with_config(size, &SpaceConfig::default())
}

/// Reserve address space and wrap it in a range built from `config`
///
/// The requested size is rounded up to the configured alignment. An
/// alignment above the page size is honored only when the OS happens to
/// return a suitably aligned base; otherwise this fails with a
/// [`VspaceError::Reservation`] and the caller should supply its own
/// aligned reservation.
pub fn reserve_with_config(size: usize, config: &SpaceConfig) -> Result<AddressRange> {
    config.validate()?;

    let aligned = Alignment::align_up_saturating(size, config.alignment);
    let reservation = if config.pinned {
        Reservation::reserve_pinned(aligned)?
    } else {
        Reservation::reserve(aligned)?
    };

    if !Alignment::is_aligned(reservation.base(), config.alignment)
        || !Alignment::is_aligned(reservation.size(), config.alignment)
    {
        return Err(VspaceError::Reservation(format!(
            "mapped range {:#x}+{} does not satisfy alignment {}",
            reservation.base(),
            reservation.size(),
            config.alignment
        )));
    }

    Ok(AddressRange::with_config(reservation, config))
}
