//! Memory Primitives - Reservations and Commit Backends
//!
//! The two collaborators the range engine consumes: an owned stretch of
//! reserved address space, and the primitives that page sub-ranges of it
//! in and out.

pub mod backing;
pub mod reservation;

pub use backing::{BackendCounters, CommitBackend, CountingBackend, NoopBackend, OsBackend};
pub use reservation::Reservation;
