//! OS-Backed Tests - Real Reservations, Real Paging
//!
//! These suites map actual address space and drive the default OS
//! backend, so committed windows must be genuinely readable and
//! writable. Gated to unix; the bookkeeping suites cover the engine on
//! every platform.

#![cfg(unix)]

use vspace::{AddressRange, Reservation, SpaceConfig};

fn page() -> usize {
    page_size::get()
}

/// A committed window is writable and survives a partial shrink of the
/// range around it.
///
/// **Bug this finds:** the tracked boundary disagreeing with the real
/// mapping state.
#[test]
fn test_committed_window_is_usable() {
    let reservation = Reservation::reserve(64 * page()).unwrap();
    let base = reservation.base();
    let mut range = AddressRange::new(reservation, page());

    assert!(range.expand_by(4 * page()));

    unsafe {
        let p = base as *mut u8;
        p.write(0xAB);
        p.add(4 * page() - 1).write(0xCD);
        assert_eq!(p.read(), 0xAB);
        assert_eq!(p.add(4 * page() - 1).read(), 0xCD);
    }

    // Shrink the top half; the bottom stays usable.
    assert!(range.shrink_by(2 * page()));
    unsafe {
        let p = base as *mut u8;
        p.add(page()).write(0xEF);
        assert_eq!(p.add(page()).read(), 0xEF);
    }

    range.release();
}

/// Growing again over a previously shrunk window works; the commit
/// primitive is idempotent about pages that stayed resident.
///
/// **Bug this finds:** recommit failing after an uncommit of the same
/// window.
#[test]
fn test_shrink_then_reexpand() {
    let mut range = vspace::reserve(32 * page()).unwrap();

    assert!(range.expand_by(8 * page()));
    assert!(range.shrink_by(8 * page()));
    assert!(range.expand_by(8 * page()));
    assert_eq!(range.committed_size(), 8 * page());

    range.release();
}

/// A pinned reservation is fully usable without any expand at the OS
/// level, while the logical boundary still starts empty.
///
/// **Bug this finds:** special ranges issuing paging calls, or starting
/// with a non-empty logical boundary.
#[test]
fn test_pinned_space_logical_tracking() {
    let config = SpaceConfig {
        pinned: true,
        ..Default::default()
    };
    let mut range = vspace::reserve_with_config(16 * page(), &config).unwrap();
    let base = range.reserved_low();

    assert!(range.is_special());
    assert_eq!(range.committed_size(), 0);

    // Physically backed regardless of the logical boundary.
    unsafe {
        let p = base as *mut u8;
        p.add(10 * page()).write(0x42);
        assert_eq!(p.add(10 * page()).read(), 0x42);
    }

    assert!(range.expand_by(4 * page()));
    assert_eq!(range.committed_size(), 4 * page());

    range.release();
}
