//! Exposure-tier product

use std::path::PathBuf;

use crate::drizzle::{run_drizzle, CombineContext, DrizzleRun};
use crate::error::ProductError;
use crate::state::CombineState;
use hap_naming::ProductIdentity;
use hap_services::{DrizzleParams, ExposureMetadataSource, ExposureTiming, WcsDescriptor};
use indexmap::IndexMap;
use serde_json::Value;

/// One input exposure and its drizzle-combined single-image product
///
/// Created once per input exposure before any processing; timing metadata
/// is read from the exposure's own header at construction and fixed from
/// then on. Owned by the visit's exposure registry and referenced by
/// exactly one filter product and, transitively, the total product.
#[derive(Debug)]
pub struct ExposureProduct {
    identity: ProductIdentity,
    full_filename: String,
    filter: String,
    timing: ExposureTiming,
    regions: IndexMap<String, Value>,
    params: Option<DrizzleParams>,
    state: CombineState,
}

impl ExposureProduct {
    /// Construct an exposure product, reading timing through `metadata`
    ///
    /// # Errors
    /// Propagates [`hap_services::MetadataError`] if either timing value is
    /// absent (timing feeds later alignment logic, so it is never
    /// defaulted), or a naming error for malformed identity fields.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        prop_id: &str,
        obset_id: &str,
        instrument: &str,
        detector: &str,
        filename: &str,
        filter: &str,
        filetype: &str,
        metadata: &dyn ExposureMetadataSource,
    ) -> Result<Self, ProductError> {
        let identity =
            ProductIdentity::exposure(prop_id, obset_id, instrument, detector, filename, filetype)?;
        let timing = metadata.observation_timing(filename)?;

        tracing::info!(exposure = %identity, filename, "exposure product created");

        Ok(Self {
            identity,
            full_filename: filename.to_string(),
            filter: filter.to_string(),
            timing,
            regions: IndexMap::new(),
            params: None,
            state: CombineState::Uncreated,
        })
    }

    /// Identity fields
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &ProductIdentity {
        &self.identity
    }

    /// Canonical basename
    #[inline]
    #[must_use]
    pub fn basename(&self) -> String {
        self.identity.basename()
    }

    /// Full input filename
    #[inline]
    #[must_use]
    pub fn full_filename(&self) -> &str {
        &self.full_filename
    }

    /// Filter this exposure was taken through
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Observation timing read at construction
    #[inline]
    #[must_use]
    pub fn timing(&self) -> ExposureTiming {
        self.timing
    }

    /// Headerlet name used to re-apply an alternate WCS solution
    #[inline]
    #[must_use]
    pub fn headerlet_filename(&self) -> String {
        self.identity.headerlet_filename()
    }

    /// Combined-image lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> CombineState {
        self.state
    }

    /// Attach the late-bound drizzle parameter set
    pub fn set_params(&mut self, params: DrizzleParams) {
        self.params = Some(params);
    }

    /// Attached parameter set, if configured
    #[inline]
    #[must_use]
    pub fn params(&self) -> Option<&DrizzleParams> {
        self.params.as_ref()
    }

    /// Record a region annotation
    pub fn annotate_region(&mut self, key: impl Into<String>, value: Value) {
        self.regions.insert(key.into(), value);
    }

    /// Region annotations
    #[inline]
    #[must_use]
    pub fn regions(&self) -> &IndexMap<String, Value> {
        &self.regions
    }

    /// Drizzle this exposure alone onto the shared reference frame
    ///
    /// Writes the combined image and promotes the run log to the trailer
    /// text name. Not idempotent across different reference frames; each
    /// call overwrites the combined output.
    ///
    /// # Errors
    /// Fails fast if no parameters are attached, and propagates
    /// [`ProductError::CombinationFailed`] if the service errors.
    pub fn combine(
        &mut self,
        wcs: &WcsDescriptor,
        ctx: &CombineContext<'_>,
    ) -> Result<PathBuf, ProductError> {
        let run = DrizzleRun {
            tier: "exposure",
            basename: self.basename(),
            inputs: vec![self.full_filename.clone()],
            output_name: self.identity.drizzle_filename(),
            trailer_log: self.identity.trailer_log_filename(),
            trailer_txt: self.identity.trailer_filename(),
        };
        run_drizzle(&run, &mut self.state, self.params.as_ref(), wcs, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hap_services::MetadataError;
    use hap_test_utils::{
        sample_params, sample_timing, sample_wcs, RecordingCombiner, StubMetadataSource,
    };
    use pretty_assertions::assert_eq;

    fn source() -> StubMetadataSource {
        StubMetadataSource::new().with("ib1f01abq_flt.fits", sample_timing())
    }

    fn product() -> ExposureProduct {
        ExposureProduct::new(
            "245",
            "01",
            "wfc3",
            "uvis",
            "ib1f01abq_flt.fits",
            "f275w",
            "drc",
            &source(),
        )
        .unwrap()
    }

    #[test]
    fn construction_reads_timing_once() {
        let exposure = product();
        assert_eq!(exposure.timing(), sample_timing());
        assert_eq!(exposure.basename(), "hst_00245_01_wfc3_uvis_ib1f01a");
        assert_eq!(
            exposure.headerlet_filename(),
            "hst_00245_01_wfc3_uvis_ib1f01a_hlet.fits"
        );
    }

    #[test]
    fn missing_metadata_aborts_construction() {
        let result = ExposureProduct::new(
            "245",
            "01",
            "wfc3",
            "uvis",
            "ib1f01c4q_flt.fits",
            "f275w",
            "drc",
            &source(),
        );
        assert!(matches!(
            result,
            Err(ProductError::Metadata(MetadataError::MissingKeyword {
                keyword: "EXPSTART",
                ..
            }))
        ));
    }

    #[test]
    fn combine_uses_single_input() {
        let dir = tempfile::tempdir().unwrap();
        let service = RecordingCombiner::new();
        let ctx = CombineContext::new(&service, dir.path());
        let mut exposure = product();
        exposure.set_params(sample_params());

        let output = exposure.combine(&sample_wcs(), &ctx).unwrap();

        assert!(output.ends_with("hst_00245_01_wfc3_uvis_ib1f01a_drc.fits"));
        assert_eq!(exposure.state(), CombineState::Combined);
        let calls = service.calls();
        assert_eq!(calls[0].inputs, vec!["ib1f01abq_flt.fits"]);
        assert!(dir
            .path()
            .join("hst_00245_01_wfc3_uvis_ib1f01a_trl.txt")
            .exists());
    }

    #[test]
    fn combine_without_params_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let service = RecordingCombiner::new();
        let ctx = CombineContext::new(&service, dir.path());
        let mut exposure = product();

        let result = exposure.combine(&sample_wcs(), &ctx);
        assert!(matches!(result, Err(ProductError::NotConfigured { .. })));
    }

    #[test]
    fn region_annotations_are_recorded() {
        let mut exposure = product();
        exposure.annotate_region("chip1", serde_json::json!({"x": 12, "y": 40}));
        assert_eq!(exposure.regions().len(), 1);
        assert!(exposure.regions().contains_key("chip1"));
    }
}
