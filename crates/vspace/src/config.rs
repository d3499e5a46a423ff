//! Configuration Module - Space Tuning Parameters
//!
//! Collects the construction-time knobs for an address range in one
//! validated value, so embedders can reject bad tuning before reaching
//! the fail-fast constructor paths.

use crate::error::{Result, VspaceError};
use crate::space::policy::Granularity;

/// Configuration for an address range and its reservation
///
/// # Examples
///
/// ```rust
/// use vspace::SpaceConfig;
///
/// // Default: page-size alignment, chunk-granular resizes.
/// let config = SpaceConfig::default();
/// assert!(config.validate().is_ok());
///
/// // Custom: 64K chunks over pre-touched, pinned backing.
/// let config = SpaceConfig {
///     alignment: 64 * 1024,
///     pinned: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SpaceConfig {
    /// Commit granularity in bytes
    ///
    /// Every boundary movement is a multiple of this value (under the
    /// default chunk policy). Must be a nonzero power of two; typically
    /// the OS page size or a collector-chosen multiple of it.
    ///
    /// Default: the system page size.
    pub alignment: usize,

    /// Rounding strategy for resize requests
    ///
    /// Default: [`Granularity::Chunk`].
    pub granularity: Granularity,

    /// Reserve with the backing pre-touched and pinned
    ///
    /// A pinned reservation is marked special: the range never issues
    /// commit/uncommit calls for it, only the logical boundary moves.
    ///
    /// Default: false.
    pub pinned: bool,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            alignment: page_size::get(),
            granularity: Granularity::default(),
            pinned: false,
        }
    }
}

impl SpaceConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.alignment.is_power_of_two() {
            return Err(VspaceError::Configuration(format!(
                "alignment {} must be a nonzero power of two",
                self.alignment
            )));
        }
        Ok(())
    }
}
