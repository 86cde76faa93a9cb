//! HAP Collaborator Contracts
//!
//! Narrow trait contracts for the external services the mosaic core
//! orchestrates, plus the data carried across them. The algorithms behind
//! these traits (drizzle resampling, astrometric fitting, FITS I/O,
//! parameter resolution) are outside this workspace.
//!
//! # Core Concepts
//!
//! - [`ReferenceFrameBuilder`]: one shared [`WcsDescriptor`] per mosaic
//!   from a set of exposure filenames
//! - [`AlignmentService`]: astrometric fit returning an [`AlignmentTable`]
//! - [`CombinationService`]: resampling/co-addition writing an output image
//!   and a run log
//! - [`ConfigProvider`]: late-bound [`DrizzleParams`] per processing stage
//! - [`ExposureMetadataSource`]: the two scalar header values an exposure
//!   product reads at construction

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod align;
mod combine;
mod config;
mod metadata;
mod wcs;

pub use align::{AlignmentError, AlignmentRecord, AlignmentService, AlignmentTable, AlignOptions};
pub use combine::{CombinationError, CombinationService};
pub use config::{ConfigError, ConfigProvider, DrizzleParams, DRIZZLE_STAGE};
pub use metadata::{ExposureMetadataSource, ExposureTiming, MetadataError};
pub use wcs::{FrameError, ReferenceFrameBuilder, WcsDescriptor};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
