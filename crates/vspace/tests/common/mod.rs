//! Shared Fixtures for the Address-Range Suites
//!
//! Ranges built here are bookkeeping-only: they sit on synthetic
//! reservations and mock backends, so no real memory is mapped and the
//! backend traffic stays observable.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vspace::{
    AddressRange, BackendCounters, ChunkGranular, CommitBackend, CountingBackend, NoopBackend,
    Reservation, Result, VspaceError,
};

/// Chunk size used by every fixture
pub const ALIGN: usize = 4096;

/// Reservation size used by most fixtures
pub const ONE_MIB: usize = vspace::util::constants::MB;

/// Synthetic base address; never dereferenced
pub const BASE: usize = 0x4000_0000;

/// Shared switch that makes a [`FailSwitchBackend`] start failing
///
/// Clone it before boxing the backend into a range; flipping the switch
/// later injects failures mid-sequence.
#[derive(Clone, Default)]
pub struct FailSwitch {
    commit: Arc<AtomicBool>,
    uncommit: Arc<AtomicBool>,
}

impl FailSwitch {
    pub fn fail_commits(&self, on: bool) {
        self.commit.store(on, Ordering::Relaxed);
    }

    pub fn fail_uncommits(&self, on: bool) {
        self.uncommit.store(on, Ordering::Relaxed);
    }
}

/// Backend whose primitives fail on demand
pub struct FailSwitchBackend {
    switch: FailSwitch,
}

impl FailSwitchBackend {
    pub fn new() -> (Self, FailSwitch) {
        let switch = FailSwitch::default();
        (
            Self {
                switch: switch.clone(),
            },
            switch,
        )
    }
}

impl CommitBackend for FailSwitchBackend {
    fn commit(&self, addr: usize, bytes: usize) -> Result<()> {
        if self.switch.commit.load(Ordering::Relaxed) {
            return Err(VspaceError::CommitFailed {
                addr,
                bytes,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn uncommit(&self, addr: usize, bytes: usize) -> Result<()> {
        if self.switch.uncommit.load(Ordering::Relaxed) {
            return Err(VspaceError::UncommitFailed {
                addr,
                bytes,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Test fixture: a bookkeeping-only range plus the counters of its
/// backend
pub struct RangeFixture {
    pub range: AddressRange,
    pub counters: BackendCounters,
}

impl RangeFixture {
    /// Plain range over `size` bytes at [`ALIGN`], counting backend
    pub fn plain(size: usize) -> Self {
        Self::build(size, false)
    }

    /// Same, but the reservation is pre-backed and pinned
    pub fn special(size: usize) -> Self {
        Self::build(size, true)
    }

    fn build(size: usize, special: bool) -> Self {
        let backend = CountingBackend::new(NoopBackend);
        let counters = backend.counters();
        let reservation = unsafe { Reservation::from_raw_parts(BASE, size, special) };
        let range = AddressRange::with_parts(
            reservation,
            ALIGN,
            Box::new(ChunkGranular),
            Box::new(backend),
        );
        Self { range, counters }
    }

    /// Range whose commit/uncommit primitives can be made to fail
    pub fn with_fail_switch(size: usize) -> (AddressRange, FailSwitch) {
        let (backend, switch) = FailSwitchBackend::new();
        let reservation = unsafe { Reservation::from_raw_parts(BASE, size, false) };
        let range = AddressRange::with_parts(
            reservation,
            ALIGN,
            Box::new(ChunkGranular),
            Box::new(backend),
        );
        (range, switch)
    }
}

/// Assert the committed/uncommitted split is exactly as expected
///
/// **Bug this finds:** boundary drift after clamped, failed, or repeated
/// resizes.
#[track_caller]
pub fn assert_committed(range: &AddressRange, expect: usize, context: &str) {
    assert_eq!(
        range.committed_size(),
        expect,
        "{}: committed size drifted",
        context
    );
    assert_eq!(
        range.uncommitted_size(),
        range.reserved_size() - range.committed_size(),
        "{}: committed/uncommitted split went inconsistent",
        context
    );
}

/// Assert the boundary ordering and chunk alignment from outside
///
/// **Bug this finds:** invariant violations that release builds would
/// let slide past the internal verifier.
#[track_caller]
pub fn assert_boundaries_sane(range: &AddressRange, context: &str) {
    let b = range.boundaries();
    assert!(
        b.reserved_low <= b.committed_low
            && b.committed_low <= b.committed_high
            && b.committed_high <= b.reserved_high,
        "{}: boundary ordering violated: {}",
        context,
        b
    );
    assert_eq!(
        (b.committed_low - b.reserved_low) % ALIGN,
        0,
        "{}: committed_low broke chunk alignment: {}",
        context,
        b
    );
    assert_eq!(
        (b.committed_high - b.reserved_low) % ALIGN,
        0,
        "{}: committed_high broke chunk alignment: {}",
        context,
        b
    );
}
