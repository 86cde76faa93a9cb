//! Shared reference frame (WCS) descriptor and builder contract

use serde::{Deserialize, Serialize};

/// World-coordinate description of a mosaic reference frame
///
/// Fixes the celestial pointing, orientation, pixel scale, and pixel grid
/// that every combined product at a given tier is resampled onto. Built once
/// per visit from the bottom-up exposure set and shared across tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WcsDescriptor {
    /// Right ascension of the frame center, degrees
    pub crval1: f64,
    /// Declination of the frame center, degrees
    pub crval2: f64,
    /// Pixel scale, arcseconds per pixel
    pub pixel_scale: f64,
    /// Position angle of the pixel grid, degrees (0.0 = north up)
    pub orientation: f64,
    /// Pixel grid width
    pub naxis1: u32,
    /// Pixel grid height
    pub naxis2: u32,
}

impl WcsDescriptor {
    /// True if the frame is pinned to celestial north-up
    #[inline]
    #[must_use]
    pub fn is_north_up(&self) -> bool {
        self.orientation == 0.0
    }
}

/// Builds one shared WCS description from a set of exposure filenames
///
/// Implementations must be deterministic for a fixed input list and
/// rotation.
pub trait ReferenceFrameBuilder {
    /// Compute the common frame covering every input exposure
    ///
    /// `rotation` is the requested position angle in degrees; callers in
    /// this workspace pin it to 0.0 so all tiers share a north-up grid.
    ///
    /// # Errors
    /// Returns [`FrameError`] if the frame cannot be derived.
    fn build_frame(&self, filenames: &[String], rotation: f64)
        -> Result<WcsDescriptor, FrameError>;
}

/// Errors raised by a reference-frame builder
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// No input exposures were supplied
    #[error("no input exposures to build a frame from")]
    NoInputs,

    /// The builder could not derive a common frame
    #[error("frame computation failed: {0}")]
    Build(String),

    /// An input exposure could not be read
    #[error("unreadable exposure '{filename}': {reason}")]
    UnreadableInput {
        /// Offending filename
        filename: String,
        /// Collaborator-reported reason
        reason: String,
    },
}
