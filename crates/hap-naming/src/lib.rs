//! HAP Naming Authority
//!
//! Deterministic file/basename generation for single-visit mosaic products.
//!
//! # Core Concepts
//!
//! - [`ProductIdentity`]: immutable identity fields (proposal, visit,
//!   instrument, detector, token, filetype, optional filter) from which
//!   every derived name is generated
//! - Derived name family: drizzle output, headerlet, trailer log/text,
//!   point/segment catalogs
//! - [`manifest_name`]: the visit-scoped manifest filename
//!
//! # Example
//!
//! ```rust
//! use hap_naming::ProductIdentity;
//!
//! let identity = ProductIdentity::exposure(
//!     "245", "01", "wfc3", "uvis", "ib1f01abq_flt.fits", "drc",
//! )?;
//! assert_eq!(identity.basename(), "hst_00245_01_wfc3_uvis_ib1f01a");
//! assert_eq!(
//!     identity.drizzle_filename(),
//!     "hst_00245_01_wfc3_uvis_ib1f01a_drc.fits",
//! );
//! # Ok::<(), hap_naming::NamingError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod family;
mod identity;

pub use identity::{
    manifest_name, NamingError, ProductIdentity, EXPOSURE_TOKEN_LEN, MOSAIC_TOKEN_LEN,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
