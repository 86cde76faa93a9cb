//! HAP Mosaic Product Hierarchy
//!
//! Three-tier composition and orchestration for single-visit mosaics:
//! every input exposure becomes an [`ExposureProduct`], exposures sharing a
//! filter form a [`FilterProduct`], and one [`TotalProduct`] per
//! instrument/detector spans all filters. The total product derives the one
//! shared reference frame every tier is resampled onto; each tier then
//! drives the external combination service independently, with run logs
//! promoted to trailer files and alignment failures recovered per filter.
//!
//! # Core Concepts
//!
//! - [`ExposureRegistry`]: arena owning every exposure; products hold
//!   [`ExposureId`] handles, never copies
//! - [`ExposureProduct`] / [`FilterProduct`] / [`TotalProduct`]: the three
//!   tiers, each with a [`CombineState`] lifecycle for its combined image
//! - [`AlignmentOutcome`]: tagged per-filter alignment result (aligned /
//!   no solution / service error)
//! - [`Visit`]: assembly plus the end-to-end per-visit pipeline and
//!   manifest
//!
//! # Example
//!
//! ```rust,ignore
//! use hap_products::{Visit, VisitServices, VisitSpec};
//!
//! let mut visit = Visit::assemble(&spec, &metadata)?;
//! visit.attach_config(&config)?;
//! let summary = visit.process(&services, out_dir)?;
//! println!("wrote {} artifacts", summary.artifacts.len());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod drizzle;
mod error;
mod exposure;
mod filter;
mod registry;
mod state;
mod total;
mod visit;

pub use drizzle::CombineContext;
pub use error::ProductError;
pub use exposure::ExposureProduct;
pub use filter::{AlignmentOutcome, FilterProduct};
pub use registry::{ExposureId, ExposureRegistry, FilterId};
pub use state::CombineState;
pub use total::TotalProduct;
pub use visit::{
    ExposureSpec, FilterAlignment, ProductFailure, Visit, VisitServices, VisitSpec, VisitSummary,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
