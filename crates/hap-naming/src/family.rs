//! Derived filename family
//!
//! Every product owns a fixed family of output names generated from its
//! basename: the drizzle-combined image, the headerlet, the trailer log/text
//! pair, and the two source catalogs. Downstream file writes assume these
//! names are unique per visit, which follows from basename uniqueness.

use crate::identity::ProductIdentity;

impl ProductIdentity {
    /// Drizzle-combined output image: `<basename>_<filetype>.fits`
    #[must_use]
    pub fn drizzle_filename(&self) -> String {
        format!("{}_{}.fits", self.basename(), self.filetype())
    }

    /// Headerlet (alternate WCS solution): `<basename>_hlet.fits`
    #[must_use]
    pub fn headerlet_filename(&self) -> String {
        format!("{}_hlet.fits", self.basename())
    }

    /// Combination run log before promotion: `<basename>_trl.log`
    #[must_use]
    pub fn trailer_log_filename(&self) -> String {
        format!("{}_trl.log", self.basename())
    }

    /// Promoted trailer text: `<basename>_trl.txt`
    #[must_use]
    pub fn trailer_filename(&self) -> String {
        format!("{}_trl.txt", self.basename())
    }

    /// Point-source catalog placeholder: `<basename>_point-cat.ecsv`
    #[must_use]
    pub fn point_catalog_filename(&self) -> String {
        format!("{}_point-cat.ecsv", self.basename())
    }

    /// Segment catalog placeholder: `<basename>_segment-cat.ecsv`
    #[must_use]
    pub fn segment_catalog_filename(&self) -> String {
        format!("{}_segment-cat.ecsv", self.basename())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn identity() -> ProductIdentity {
        ProductIdentity::exposure("245", "01", "wfc3", "uvis", "ib1f01abq_flt.fits", "drc")
            .unwrap()
    }

    #[test]
    fn drizzle_filename_appends_filetype() {
        assert_eq!(
            identity().drizzle_filename(),
            "hst_00245_01_wfc3_uvis_ib1f01a_drc.fits"
        );
    }

    #[test]
    fn headerlet_filename() {
        assert_eq!(
            identity().headerlet_filename(),
            "hst_00245_01_wfc3_uvis_ib1f01a_hlet.fits"
        );
    }

    #[test]
    fn trailer_pair_shares_basename() {
        let id = identity();
        assert_eq!(
            id.trailer_log_filename(),
            "hst_00245_01_wfc3_uvis_ib1f01a_trl.log"
        );
        assert_eq!(
            id.trailer_filename(),
            "hst_00245_01_wfc3_uvis_ib1f01a_trl.txt"
        );
    }

    #[test]
    fn catalog_names() {
        let id = identity();
        assert_eq!(
            id.point_catalog_filename(),
            "hst_00245_01_wfc3_uvis_ib1f01a_point-cat.ecsv"
        );
        assert_eq!(
            id.segment_catalog_filename(),
            "hst_00245_01_wfc3_uvis_ib1f01a_segment-cat.ecsv"
        );
    }
}
