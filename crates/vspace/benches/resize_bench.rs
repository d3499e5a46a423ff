//! Resize Benchmarks
//!
//! Measures the bookkeeping cost of the resize engine in isolation (noop
//! backend) and the full cost over real paging (unix only).

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use vspace::util::constants::MB;
use vspace::{AddressRange, ChunkGranular, NoopBackend, Reservation};

fn bench_bookkeeping(c: &mut Criterion) {
    c.bench_function("expand_shrink_bookkeeping", |b| {
        let reservation = unsafe { Reservation::from_raw_parts(0x4000_0000, 64 * MB, false) };
        let mut range = AddressRange::with_parts(
            reservation,
            4096,
            Box::new(ChunkGranular),
            Box::new(NoopBackend),
        );

        b.iter(|| {
            range.expand_by(black_box(MB));
            range.shrink_by(black_box(MB));
        });
    });
}

#[cfg(unix)]
fn bench_os_paging(c: &mut Criterion) {
    let page = page_size::get();

    c.bench_function("expand_shrink_os", |b| {
        let mut range = vspace::reserve(256 * page).expect("reserve");

        b.iter(|| {
            range.expand_by(black_box(16 * page));
            range.shrink_by(black_box(16 * page));
        });
    });
}

#[cfg(not(unix))]
fn bench_os_paging(_c: &mut Criterion) {}

criterion_group!(benches, bench_bookkeeping, bench_os_paging);
criterion_main!(benches);
