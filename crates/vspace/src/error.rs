//! Error Module - Vspace Error Types
//!
//! Defines the error types used across the crate.
//!
//! Programming errors in the owning collector (misaligned reservations,
//! operations on a released range) are not represented here. Those are
//! contract violations and panic at the call site; the variants below
//! cover the conditions an embedder can meet at runtime and react to.

use thiserror::Error;

/// Main error type for all vspace operations
///
/// # Examples
///
/// ```rust
/// use vspace::VspaceError;
///
/// fn handle_error(err: VspaceError) {
///     match err {
///         VspaceError::CommitFailed { addr, bytes, .. } => {
///             eprintln!("could not back {} bytes at {:#x}", bytes, addr);
///         }
///         other => {
///             eprintln!("vspace error: {}", other);
///         }
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum VspaceError {
    /// Reserving address space from the OS failed
    ///
    /// **When returned:** `Reservation::reserve` could not map the
    /// requested range, or the mapped range did not satisfy the requested
    /// alignment.
    ///
    /// **Recovery strategy:** Retry with a smaller size or fail startup.
    #[error("Reservation failed: {0}")]
    Reservation(String),

    /// The commit primitive could not back the requested pages
    ///
    /// **When returned:** OS memory pressure during an expand.
    ///
    /// **Recovery strategy:** Retry a smaller expand, fail the allocation
    /// that triggered the growth, or trigger a collection.
    #[error("Commit failed at {addr:#x} for {bytes} bytes: {reason}")]
    CommitFailed {
        addr: usize,
        bytes: usize,
        reason: String,
    },

    /// The uncommit primitive could not return pages to the OS
    ///
    /// **When returned:** OS refused to release backing during a shrink.
    ///
    /// **Recovery strategy:** None needed. The range moves its boundary
    /// anyway; the cost is physical memory kept resident, not corruption.
    #[error("Uncommit failed at {addr:#x} for {bytes} bytes: {reason}")]
    UncommitFailed {
        addr: usize,
        bytes: usize,
        reason: String,
    },

    /// Invalid configuration detected
    ///
    /// **When returned:** `SpaceConfig::validate` rejected the tuning,
    /// e.g. an alignment that is not a power of two.
    ///
    /// **Recovery strategy:** Fix the configuration and retry.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl VspaceError {
    /// Check if this error is recoverable by retrying or shrinking the
    /// request
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VspaceError::CommitFailed { .. } | VspaceError::UncommitFailed { .. }
        )
    }
}

/// Result type alias for vspace operations
pub type Result<T> = std::result::Result<T, VspaceError>;
