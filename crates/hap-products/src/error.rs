//! Error types for mosaic product assembly
//!
//! Covers:
//! - Exposure construction failures (missing header metadata)
//! - Membership violations (duplicates, dangling handles, empty lists)
//! - Combination failures and the terminal failed state
//! - Trailer promotion and manifest I/O

use crate::registry::{ExposureId, FilterId};
use hap_naming::NamingError;
use hap_services::{CombinationError, ConfigError, FrameError, MetadataError};

/// Main product error type
#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    /// Required header metadata absent at exposure construction
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Name derivation failed
    #[error("naming error: {0}")]
    Naming(#[from] NamingError),

    /// Parameter resolution failed
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A combine was attempted before configuration was attached
    #[error("product {basename} has no drizzle parameters attached")]
    NotConfigured {
        /// Basename of the unconfigured product
        basename: String,
    },

    /// A frame computation or combination was attempted with no members
    #[error("product {basename} has no exposure members")]
    EmptyMembership {
        /// Basename of the memberless product
        basename: String,
    },

    /// An exposure with this identity is already in the registry
    #[error("exposure {basename} already registered")]
    DuplicateExposure {
        /// Basename of the duplicate exposure
        basename: String,
    },

    /// A member handle was registered twice on one product
    #[error("member {member} already registered on {product}")]
    DuplicateMember {
        /// Basename of the duplicate member
        member: String,
        /// Basename of the product it was added to
        product: String,
    },

    /// A handle does not resolve in the exposure registry
    #[error("unknown exposure handle {0:?}")]
    UnknownExposure(ExposureId),

    /// A handle does not resolve in the visit's filter list
    #[error("unknown filter handle {0:?}")]
    UnknownFilter(FilterId),

    /// Reference-frame computation failed
    #[error("reference frame computation failed: {0}")]
    Frame(#[from] FrameError),

    /// No reference frame has been computed for the visit yet
    #[error("visit has no reference frame; compute it before combining")]
    MissingReferenceFrame,

    /// The combination service failed for this product
    #[error("combination failed for {basename}: {source}")]
    CombinationFailed {
        /// Basename of the failed product
        basename: String,
        /// Service failure
        #[source]
        source: CombinationError,
    },

    /// A combine was attempted on a product already in the failed state
    #[error("product {basename} already failed this run; combine not retried")]
    CombineAfterFailure {
        /// Basename of the failed product
        basename: String,
    },

    /// The run log could not be renamed to its trailer text name
    #[error("failed to promote trailer {log} -> {txt}: {source}")]
    TrailerPromotion {
        /// Run-log filename
        log: String,
        /// Trailer text filename
        txt: String,
        /// Underlying rename failure
        #[source]
        source: std::io::Error,
    },

    /// Exposures reachable through filter members diverge from the total
    /// product's own list
    #[error("membership inconsistency on {basename}: {detail}")]
    MembershipInconsistent {
        /// Basename of the total product
        basename: String,
        /// Human-readable divergence description
        detail: String,
    },

    /// The visit manifest could not be written
    #[error("failed to write manifest {path}: {source}")]
    Manifest {
        /// Manifest path
        path: String,
        /// Underlying write failure
        #[source]
        source: std::io::Error,
    },
}

impl ProductError {
    /// Check if retrying the failed operation could succeed
    ///
    /// Only transient service/I/O failures qualify; membership and
    /// configuration errors are structural.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CombinationFailed { source, .. } => source.is_retryable(),
            Self::TrailerPromotion { .. } | Self::Manifest { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_combination_failure_is_retryable() {
        let err = ProductError::CombinationFailed {
            basename: "hst_00245_01_wfc3_uvis_ib1f01".to_string(),
            source: CombinationError::Unavailable("offline".to_string()),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn structural_failures_are_not_retryable() {
        let rejected = ProductError::CombinationFailed {
            basename: "hst_00245_01_wfc3_uvis_ib1f01".to_string(),
            source: CombinationError::RejectedInputs("mixed chips".to_string()),
        };
        assert!(!rejected.is_retryable());

        let unconfigured = ProductError::NotConfigured {
            basename: "hst_00245_01_wfc3_uvis_ib1f01".to_string(),
        };
        assert!(!unconfigured.is_retryable());
    }

    #[test]
    fn display_carries_basename() {
        let err = ProductError::EmptyMembership {
            basename: "hst_00245_01_wfc3_uvis_ib1f01".to_string(),
        };
        assert!(err.to_string().contains("hst_00245_01_wfc3_uvis_ib1f01"));
    }
}
