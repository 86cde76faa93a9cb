//! Astrometric alignment contract and fit results

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Options for one alignment run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignOptions {
    /// Overwrite intermediate alignment files
    pub clobber: bool,
    /// Run-log filename for the alignment pass
    pub runfile: String,
    /// Write the fitted solution back into each exposure header
    pub update_header_wcs: bool,
    /// Exposure filename -> headerlet filename, used to re-apply an
    /// alternate WCS solution after the fit
    pub headerlet_names: IndexMap<String, String>,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            clobber: false,
            runfile: "alignimages.log".to_string(),
            update_header_wcs: true,
            headerlet_names: IndexMap::new(),
        }
    }
}

/// One row of an alignment results table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    /// Exposure the fit applies to
    pub image_name: String,
    /// Fitted X offset, pixels
    pub offset_x: f64,
    /// Fitted Y offset, pixels
    pub offset_y: f64,
    /// Fitted rotation, degrees
    pub rotation: f64,
    /// Fitted scale factor
    pub scale: f64,
    /// Fit residual in X, pixels
    pub rms_x: f64,
    /// Fit residual in Y, pixels
    pub rms_y: f64,
    /// Per-image fit RMS, arcseconds
    pub fit_rms: f64,
    /// RMS of the entire fit, arcseconds
    pub total_rms: f64,
    /// Status flag; zero indicates success
    pub status: i32,
    /// Fit quality flag, 1 (best) through 5 (worst)
    pub fit_quality: u8,
    /// Number of catalog sources matched by the fit
    pub matched_sources: u32,
}

impl AlignmentRecord {
    /// True if the fit for this exposure succeeded
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == 0
    }
}

/// Results table returned by one alignment run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentTable {
    rows: Vec<AlignmentRecord>,
}

impl AlignmentTable {
    /// Empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    #[inline]
    pub fn push(&mut self, record: AlignmentRecord) {
        self.rows.push(record);
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table carries no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over records
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &AlignmentRecord> {
        self.rows.iter()
    }

    /// Records whose per-image fit succeeded
    pub fn successes(&self) -> impl Iterator<Item = &AlignmentRecord> {
        self.rows.iter().filter(|r| r.succeeded())
    }
}

impl FromIterator<AlignmentRecord> for AlignmentTable {
    fn from_iter<I: IntoIterator<Item = AlignmentRecord>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Fits a set of exposures to an absolute astrometric reference
pub trait AlignmentService {
    /// Run one alignment pass over `filenames`
    ///
    /// # Errors
    /// Returns [`AlignmentError`] if the service crashes or the fit cannot
    /// be run. A completed run with no usable solution is an `Ok` table
    /// with no rows, not an error.
    fn align(
        &self,
        filenames: &[String],
        options: &AlignOptions,
    ) -> Result<AlignmentTable, AlignmentError>;
}

/// Errors raised by an alignment service
#[derive(Debug, thiserror::Error)]
pub enum AlignmentError {
    /// The fitting run itself failed
    #[error("alignment run failed: {0}")]
    Failed(String),

    /// An input exposure could not be read
    #[error("unreadable exposure '{filename}': {reason}")]
    UnreadableInput {
        /// Offending filename
        filename: String,
        /// Collaborator-reported reason
        reason: String,
    },

    /// I/O failure while writing the run log or headerlets
    #[error("alignment i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(image: &str, status: i32) -> AlignmentRecord {
        AlignmentRecord {
            image_name: image.to_string(),
            offset_x: 0.12,
            offset_y: -0.08,
            rotation: 0.002,
            scale: 1.0,
            rms_x: 0.05,
            rms_y: 0.04,
            fit_rms: 0.003,
            total_rms: 0.004,
            status,
            fit_quality: 1,
            matched_sources: 212,
        }
    }

    #[test]
    fn table_collects_records() {
        let table: AlignmentTable =
            vec![record("a_flt.fits", 0), record("b_flt.fits", 1)].into_iter().collect();
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
    }

    #[test]
    fn successes_filters_on_status() {
        let table: AlignmentTable =
            vec![record("a_flt.fits", 0), record("b_flt.fits", 1)].into_iter().collect();
        let good: Vec<_> = table.successes().map(|r| r.image_name.as_str()).collect();
        assert_eq!(good, vec!["a_flt.fits"]);
    }

    #[test]
    fn default_options() {
        let options = AlignOptions::default();
        assert!(!options.clobber);
        assert!(options.update_header_wcs);
        assert_eq!(options.runfile, "alignimages.log");
        assert!(options.headerlet_names.is_empty());
    }
}
