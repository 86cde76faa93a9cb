//! Product identity and basename generation
//!
//! Provides [`ProductIdentity`], the immutable set of fields from which every
//! derived product filename is generated.

use std::fmt::{self, Display, Formatter};

/// Width the proposal ID is zero-padded to.
const PROPOSAL_WIDTH: usize = 5;

/// Token length for exposure-tier products (leading characters of the
/// exposure filename).
pub const EXPOSURE_TOKEN_LEN: usize = 7;

/// Token length for filter- and total-tier products (the visit-shared
/// prefix of the exposure filename).
pub const MOSAIC_TOKEN_LEN: usize = 6;

/// Immutable identity fields for one mosaic product
///
/// Two identities with equal fields generate identical basenames; name
/// generation is pure. The token length differs by tier (7 characters for
/// exposures, 6 for filter/total mosaics) which, together with the optional
/// filter segment, keeps basenames collision-free within a visit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductIdentity {
    prop_id: String,
    obset_id: String,
    instrument: String,
    detector: String,
    token: String,
    filetype: String,
    filter: Option<String>,
}

impl ProductIdentity {
    /// Identity for an exposure-tier product
    ///
    /// The token is the first [`EXPOSURE_TOKEN_LEN`] characters of
    /// `filename`. The exposure's filter is product metadata, not part of
    /// its name.
    ///
    /// # Errors
    /// Returns [`NamingError`] if a field is empty, contains the `_`
    /// separator, or `filename` is too short to yield the token.
    pub fn exposure(
        prop_id: &str,
        obset_id: &str,
        instrument: &str,
        detector: &str,
        filename: &str,
        filetype: &str,
    ) -> Result<Self, NamingError> {
        Self::build(
            prop_id,
            obset_id,
            instrument,
            detector,
            filename,
            filetype,
            None,
            EXPOSURE_TOKEN_LEN,
        )
    }

    /// Identity for a filter-tier mosaic product
    ///
    /// # Errors
    /// Returns [`NamingError`] if a field is empty, contains the `_`
    /// separator, or `filename` is too short to yield the token.
    pub fn filter(
        prop_id: &str,
        obset_id: &str,
        instrument: &str,
        detector: &str,
        filename: &str,
        filter: &str,
        filetype: &str,
    ) -> Result<Self, NamingError> {
        Self::build(
            prop_id,
            obset_id,
            instrument,
            detector,
            filename,
            filetype,
            Some(filter),
            MOSAIC_TOKEN_LEN,
        )
    }

    /// Identity for a total-tier (white-light) mosaic product
    ///
    /// # Errors
    /// Returns [`NamingError`] if a field is empty, contains the `_`
    /// separator, or `filename` is too short to yield the token.
    pub fn total(
        prop_id: &str,
        obset_id: &str,
        instrument: &str,
        detector: &str,
        filename: &str,
        filetype: &str,
    ) -> Result<Self, NamingError> {
        Self::build(
            prop_id,
            obset_id,
            instrument,
            detector,
            filename,
            filetype,
            None,
            MOSAIC_TOKEN_LEN,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        prop_id: &str,
        obset_id: &str,
        instrument: &str,
        detector: &str,
        filename: &str,
        filetype: &str,
        filter: Option<&str>,
        token_len: usize,
    ) -> Result<Self, NamingError> {
        validate_field("prop_id", prop_id)?;
        validate_field("obset_id", obset_id)?;
        validate_field("instrument", instrument)?;
        validate_field("detector", detector)?;
        validate_field("filetype", filetype)?;
        if let Some(f) = filter {
            validate_field("filter", f)?;
        }

        let token = filename
            .get(..token_len)
            .ok_or_else(|| NamingError::FilenameTooShort {
                filename: filename.to_string(),
                needed: token_len,
            })?;
        validate_field("token", token)?;

        Ok(Self {
            prop_id: pad_proposal(prop_id),
            obset_id: obset_id.to_string(),
            instrument: instrument.to_string(),
            detector: detector.to_string(),
            token: token.to_string(),
            filetype: filetype.to_string(),
            filter: filter.map(str::to_string),
        })
    }

    /// Normalized (zero-padded) proposal ID
    #[inline]
    #[must_use]
    pub fn prop_id(&self) -> &str {
        &self.prop_id
    }

    /// Visit/obset ID
    #[inline]
    #[must_use]
    pub fn obset_id(&self) -> &str {
        &self.obset_id
    }

    /// Instrument name
    #[inline]
    #[must_use]
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Detector name
    #[inline]
    #[must_use]
    pub fn detector(&self) -> &str {
        &self.detector
    }

    /// Exposure-name-derived token
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Filetype tag (e.g. `drz`, `drc`)
    #[inline]
    #[must_use]
    pub fn filetype(&self) -> &str {
        &self.filetype
    }

    /// Filter segment, if this identity carries one
    #[inline]
    #[must_use]
    pub fn filter_name(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Canonical basename:
    /// `hst_<prop5>_<obset>_<instrument>_<detector>[_<filter>]_<token>`
    #[must_use]
    pub fn basename(&self) -> String {
        let mut parts = vec![
            "hst",
            self.prop_id.as_str(),
            self.obset_id.as_str(),
            self.instrument.as_str(),
            self.detector.as_str(),
        ];
        if let Some(filter) = &self.filter {
            parts.push(filter);
        }
        parts.push(&self.token);
        parts.join("_")
    }
}

impl Display for ProductIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.basename())
    }
}

/// Zero-pad a proposal ID to the canonical width
///
/// IDs already at or beyond the width are kept unchanged.
#[must_use]
fn pad_proposal(prop_id: &str) -> String {
    let width = PROPOSAL_WIDTH;
    format!("{prop_id:0>width$}")
}

fn validate_field(field: &'static str, value: &str) -> Result<(), NamingError> {
    if value.is_empty() {
        return Err(NamingError::EmptyField { field });
    }
    // An embedded separator would make two distinct identities collide on
    // basename.
    if value.contains('_') {
        return Err(NamingError::EmbeddedSeparator {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Visit-scoped manifest filename:
/// `<instrument>_<program-field>_<obset>_manifest.txt`
///
/// The program field is characters 1..4 of an exposure filename from the
/// visit (e.g. `ib1f01abq_flt.fits` -> `b1f`).
///
/// # Errors
/// Returns [`NamingError::FilenameTooShort`] if `filename` has fewer than
/// four characters.
pub fn manifest_name(
    instrument: &str,
    obset_id: &str,
    filename: &str,
) -> Result<String, NamingError> {
    validate_field("instrument", instrument)?;
    validate_field("obset_id", obset_id)?;
    let program = filename
        .get(1..4)
        .ok_or_else(|| NamingError::FilenameTooShort {
            filename: filename.to_string(),
            needed: 4,
        })?;
    Ok(format!("{instrument}_{program}_{obset_id}_manifest.txt"))
}

/// Errors raised while deriving product names
#[derive(Debug, thiserror::Error)]
pub enum NamingError {
    /// A required identity field was empty
    #[error("identity field '{field}' is empty")]
    EmptyField {
        /// Name of the offending field
        field: &'static str,
    },

    /// A field contained the `_` name separator
    #[error("identity field '{field}' contains '_': {value}")]
    EmbeddedSeparator {
        /// Name of the offending field
        field: &'static str,
        /// Rejected value
        value: String,
    },

    /// The exposure filename is too short to derive the token
    #[error("filename '{filename}' is shorter than {needed} characters")]
    FilenameTooShort {
        /// Rejected filename
        filename: String,
        /// Characters required
        needed: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn exposure_identity() -> ProductIdentity {
        ProductIdentity::exposure("245", "01", "wfc3", "uvis", "ib1f01abq_flt.fits", "drc")
            .unwrap()
    }

    #[test]
    fn exposure_basename_matches_reference() {
        let identity = exposure_identity();
        assert_eq!(identity.basename(), "hst_00245_01_wfc3_uvis_ib1f01a");
    }

    #[test]
    fn proposal_id_zero_padded() {
        let identity = exposure_identity();
        assert_eq!(identity.prop_id(), "00245");
    }

    #[test]
    fn wide_proposal_id_kept() {
        let identity = ProductIdentity::exposure(
            "123456",
            "01",
            "wfc3",
            "uvis",
            "ib1f01abq_flt.fits",
            "drc",
        )
        .unwrap();
        assert_eq!(identity.prop_id(), "123456");
    }

    #[test]
    fn filter_basename_carries_filter_segment() {
        let identity = ProductIdentity::filter(
            "245",
            "01",
            "wfc3",
            "uvis",
            "ib1f01abq_flt.fits",
            "f275w",
            "drc",
        )
        .unwrap();
        assert_eq!(identity.basename(), "hst_00245_01_wfc3_uvis_f275w_ib1f01");
    }

    #[test]
    fn total_basename_uses_visit_token() {
        let identity =
            ProductIdentity::total("245", "01", "wfc3", "uvis", "ib1f01abq_flt.fits", "drc")
                .unwrap();
        assert_eq!(identity.basename(), "hst_00245_01_wfc3_uvis_ib1f01");
    }

    #[test]
    fn basename_generation_is_pure() {
        let identity = exposure_identity();
        assert_eq!(identity.basename(), identity.basename());
    }

    #[test]
    fn tiers_never_collide_for_same_exposure() {
        let exposure = exposure_identity();
        let filter = ProductIdentity::filter(
            "245",
            "01",
            "wfc3",
            "uvis",
            "ib1f01abq_flt.fits",
            "f275w",
            "drc",
        )
        .unwrap();
        let total =
            ProductIdentity::total("245", "01", "wfc3", "uvis", "ib1f01abq_flt.fits", "drc")
                .unwrap();

        assert_ne!(exposure.basename(), filter.basename());
        assert_ne!(exposure.basename(), total.basename());
        assert_ne!(filter.basename(), total.basename());
    }

    #[test]
    fn short_filename_rejected() {
        let result = ProductIdentity::exposure("245", "01", "wfc3", "uvis", "ib1f", "drc");
        assert!(matches!(
            result,
            Err(NamingError::FilenameTooShort { needed: 7, .. })
        ));
    }

    #[test]
    fn empty_field_rejected() {
        let result =
            ProductIdentity::exposure("245", "", "wfc3", "uvis", "ib1f01abq_flt.fits", "drc");
        assert!(matches!(
            result,
            Err(NamingError::EmptyField { field: "obset_id" })
        ));
    }

    #[test]
    fn separator_in_field_rejected() {
        let result = ProductIdentity::filter(
            "245",
            "01",
            "wfc3",
            "uvis",
            "ib1f01abq_flt.fits",
            "f275w_clear",
            "drc",
        );
        assert!(matches!(
            result,
            Err(NamingError::EmbeddedSeparator { field: "filter", .. })
        ));
    }

    #[test]
    fn manifest_name_visit_scoped() {
        let name = manifest_name("wfc3", "01", "ib1f01abq_flt.fits").unwrap();
        assert_eq!(name, "wfc3_b1f_01_manifest.txt");
    }

    #[test]
    fn manifest_name_short_filename_rejected() {
        let result = manifest_name("wfc3", "01", "ib1");
        assert!(matches!(
            result,
            Err(NamingError::FilenameTooShort { needed: 4, .. })
        ));
    }

    #[test]
    fn display_is_basename() {
        let identity = exposure_identity();
        assert_eq!(identity.to_string(), identity.basename());
    }
}
