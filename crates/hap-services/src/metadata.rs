//! Exposure header metadata contract

use serde::{Deserialize, Serialize};

/// Timing metadata read once from an exposure's own header
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureTiming {
    /// Observation start, Modified Julian Date (UTC)
    pub start_mjd: f64,
    /// Exposure duration, seconds
    pub duration_s: f64,
}

/// Reads the two scalar header values an exposure product needs
///
/// Stands in for FITS I/O, which is outside this core. Timing feeds later
/// alignment logic, so a missing keyword aborts exposure construction
/// instead of being defaulted.
pub trait ExposureMetadataSource {
    /// Read observation start time and exposure duration for `filename`
    ///
    /// # Errors
    /// Returns [`MetadataError::MissingKeyword`] if either header value is
    /// absent.
    fn observation_timing(&self, filename: &str) -> Result<ExposureTiming, MetadataError>;
}

/// Errors raised while reading exposure metadata
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// A required header keyword is absent
    #[error("'{filename}' is missing required header keyword {keyword}")]
    MissingKeyword {
        /// Exposure filename
        filename: String,
        /// Absent keyword (e.g. `EXPSTART`, `EXPTIME`)
        keyword: &'static str,
    },

    /// The exposure file could not be opened or parsed
    #[error("unreadable exposure '{filename}': {reason}")]
    Unreadable {
        /// Exposure filename
        filename: String,
        /// Collaborator-reported reason
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keyword_names_file_and_keyword() {
        let err = MetadataError::MissingKeyword {
            filename: "ib1f01abq_flt.fits".to_string(),
            keyword: "EXPSTART",
        };
        let text = err.to_string();
        assert!(text.contains("ib1f01abq_flt.fits"));
        assert!(text.contains("EXPSTART"));
    }
}
