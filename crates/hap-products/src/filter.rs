//! Filter-tier mosaic product

use std::path::PathBuf;

use crate::drizzle::{run_drizzle, CombineContext, DrizzleRun};
use crate::error::ProductError;
use crate::registry::{ExposureId, ExposureRegistry};
use crate::state::CombineState;
use hap_naming::ProductIdentity;
use hap_services::{
    AlignmentService, AlignmentTable, AlignOptions, DrizzleParams, WcsDescriptor,
};
use indexmap::IndexMap;
use serde_json::Value;

/// Result of one filter-level alignment pass
///
/// Tagged so callers can distinguish "the fit ran and found nothing" from
/// "the service crashed"; both degrade to processing with the default WCS,
/// but tests and diagnostics need the distinction.
#[derive(Debug)]
pub enum AlignmentOutcome {
    /// The fit succeeded and produced a results table
    Aligned(AlignmentTable),
    /// The fit ran but found no usable solution (or there was nothing to
    /// fit)
    NoSolution,
    /// The alignment service itself failed; recovered locally
    ServiceError(String),
}

impl AlignmentOutcome {
    /// True if an astrometric correction was obtained
    #[inline]
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        matches!(self, Self::Aligned(_))
    }

    /// Results table, if the fit succeeded
    #[inline]
    #[must_use]
    pub fn table(&self) -> Option<&AlignmentTable> {
        match self {
            Self::Aligned(table) => Some(table),
            _ => None,
        }
    }
}

/// Per-filter mosaic: all exposures of one instrument/detector/filter in a
/// visit
///
/// Members are appended as exposures are classified and never removed. All
/// members share the product's instrument, detector, and filter.
#[derive(Debug)]
pub struct FilterProduct {
    identity: ProductIdentity,
    filter: String,
    members: Vec<ExposureId>,
    regions: IndexMap<String, Value>,
    params: Option<DrizzleParams>,
    state: CombineState,
}

impl FilterProduct {
    /// Construct a filter product for one (instrument, detector, filter)
    ///
    /// # Errors
    /// Returns a naming error for malformed identity fields.
    pub fn new(
        prop_id: &str,
        obset_id: &str,
        instrument: &str,
        detector: &str,
        filename: &str,
        filter: &str,
        filetype: &str,
    ) -> Result<Self, ProductError> {
        let identity = ProductIdentity::filter(
            prop_id, obset_id, instrument, detector, filename, filter, filetype,
        )?;

        tracing::info!(product = %identity, filter, "filter product created");

        Ok(Self {
            identity,
            filter: filter.to_string(),
            members: Vec::new(),
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

    /// Filter name
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Member handles in registration order
    #[inline]
    #[must_use]
    pub fn members(&self) -> &[ExposureId] {
        &self.members
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

    /// Append an exposure member
    ///
    /// # Errors
    /// Returns [`ProductError::DuplicateMember`] if the handle is already a
    /// member.
    pub fn add_member(
        &mut self,
        id: ExposureId,
        registry: &ExposureRegistry,
    ) -> Result<(), ProductError> {
        if self.members.contains(&id) {
            return Err(ProductError::DuplicateMember {
                member: registry.get(id)?.basename(),
                product: self.basename(),
            });
        }
        self.members.push(id);
        Ok(())
    }

    /// Fit every member exposure to the absolute astrometric reference
    ///
    /// Calls the alignment service once over the full member list. Never
    /// lets a service failure escape: a crash is caught, logged, and
    /// returned as [`AlignmentOutcome::ServiceError`] so sibling filters
    /// and the total product keep processing with the uncorrected WCS.
    ///
    /// Returns the tagged outcome together with the member filenames that
    /// were handed to the service (empty when there were no members).
    #[must_use]
    pub fn align_to_reference(
        &self,
        registry: &ExposureRegistry,
        service: &dyn AlignmentService,
    ) -> (AlignmentOutcome, Vec<String>) {
        if self.members.is_empty() {
            return (AlignmentOutcome::NoSolution, Vec::new());
        }

        let mut filenames = Vec::with_capacity(self.members.len());
        let mut headerlet_names = IndexMap::new();
        for id in &self.members {
            let exposure = match registry.get(*id) {
                Ok(exposure) => exposure,
                Err(err) => {
                    tracing::warn!(
                        product = %self.identity,
                        error = %err,
                        "alignment skipped: member handle did not resolve"
                    );
                    return (AlignmentOutcome::ServiceError(err.to_string()), filenames);
                }
            };
            filenames.push(exposure.full_filename().to_string());
            headerlet_names.insert(
                exposure.full_filename().to_string(),
                exposure.headerlet_filename(),
            );
        }

        let options = AlignOptions {
            headerlet_names,
            ..AlignOptions::default()
        };

        match service.align(&filenames, &options) {
            Ok(table) if table.is_empty() => (AlignmentOutcome::NoSolution, filenames),
            Ok(table) => {
                tracing::info!(
                    product = %self.identity,
                    fits = table.len(),
                    "astrometric alignment succeeded"
                );
                (AlignmentOutcome::Aligned(table), filenames)
            }
            Err(err) => {
                tracing::warn!(
                    product = %self.identity,
                    error = %err,
                    "alignment failed; no correction to absolute frame applied"
                );
                (AlignmentOutcome::ServiceError(err.to_string()), filenames)
            }
        }
    }

    /// Drizzle all member exposures into the per-filter mosaic
    ///
    /// # Errors
    /// Fails fast on an unconfigured or memberless product, and propagates
    /// [`ProductError::CombinationFailed`] if the service errors.
    pub fn combine(
        &mut self,
        registry: &ExposureRegistry,
        wcs: &WcsDescriptor,
        ctx: &CombineContext<'_>,
    ) -> Result<PathBuf, ProductError> {
        let run = DrizzleRun {
            tier: "filter",
            basename: self.basename(),
            inputs: registry.filenames(&self.members)?,
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
    use crate::exposure::ExposureProduct;
    use hap_test_utils::{
        sample_params, sample_wcs, EmptyAligner, FailingAligner, RecordingCombiner,
        StubMetadataSource, TableAligner,
    };
    use pretty_assertions::assert_eq;

    fn setup() -> (ExposureRegistry, FilterProduct, Vec<ExposureId>) {
        let metadata = StubMetadataSource::new()
            .with_all(&["ib1f01abq_flt.fits", "ib1f01b2q_flt.fits"]);
        let mut registry = ExposureRegistry::new();
        let mut ids = Vec::new();
        for filename in ["ib1f01abq_flt.fits", "ib1f01b2q_flt.fits"] {
            let exposure = ExposureProduct::new(
                "245", "01", "wfc3", "uvis", filename, "f275w", "drc", &metadata,
            )
            .unwrap();
            ids.push(registry.register(exposure).unwrap());
        }

        let mut filter = FilterProduct::new(
            "245",
            "01",
            "wfc3",
            "uvis",
            "ib1f01abq_flt.fits",
            "f275w",
            "drc",
        )
        .unwrap();
        for id in &ids {
            filter.add_member(*id, &registry).unwrap();
        }
        (registry, filter, ids)
    }

    #[test]
    fn basename_includes_filter() {
        let (_, filter, _) = setup();
        assert_eq!(filter.basename(), "hst_00245_01_wfc3_uvis_f275w_ib1f01");
    }

    #[test]
    fn duplicate_member_rejected() {
        let (registry, mut filter, ids) = setup();
        let result = filter.add_member(ids[0], &registry);
        assert!(matches!(result, Err(ProductError::DuplicateMember { .. })));
        assert_eq!(filter.members().len(), 2);
    }

    #[test]
    fn align_delegates_full_member_list() {
        let (registry, filter, _) = setup();
        let service = TableAligner::new();

        let (outcome, filenames) = filter.align_to_reference(&registry, &service);

        assert!(outcome.is_aligned());
        assert_eq!(
            filenames,
            vec!["ib1f01abq_flt.fits", "ib1f01b2q_flt.fits"]
        );
        let calls = service.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, filenames);
        assert_eq!(
            calls[0].1.headerlet_names.get("ib1f01abq_flt.fits").unwrap(),
            "hst_00245_01_wfc3_uvis_ib1f01a_hlet.fits"
        );
        assert!(calls[0].1.update_header_wcs);
    }

    #[test]
    fn align_service_fault_is_contained() {
        let (registry, filter, _) = setup();

        let (outcome, filenames) = filter.align_to_reference(&registry, &FailingAligner);

        assert!(matches!(outcome, AlignmentOutcome::ServiceError(_)));
        assert_eq!(
            filenames,
            vec!["ib1f01abq_flt.fits", "ib1f01b2q_flt.fits"]
        );
    }

    #[test]
    fn align_empty_table_is_no_solution() {
        let (registry, filter, _) = setup();
        let (outcome, _) = filter.align_to_reference(&registry, &EmptyAligner);
        assert!(matches!(outcome, AlignmentOutcome::NoSolution));
    }

    #[test]
    fn align_with_no_members_returns_null_result() {
        let filter = FilterProduct::new(
            "245",
            "01",
            "wfc3",
            "uvis",
            "ib1f01abq_flt.fits",
            "f336w",
            "drc",
        )
        .unwrap();
        let registry = ExposureRegistry::new();

        let (outcome, filenames) = filter.align_to_reference(&registry, &TableAligner::new());

        assert!(matches!(outcome, AlignmentOutcome::NoSolution));
        assert!(filenames.is_empty());
    }

    #[test]
    fn region_annotations_are_recorded() {
        let (_, mut filter, _) = setup();
        filter.annotate_region("footprint", serde_json::json!({"vertices": 4}));
        assert!(filter.regions().contains_key("footprint"));
    }

    #[test]
    fn combine_resamples_all_members() {
        let (registry, mut filter, _) = setup();
        let dir = tempfile::tempdir().unwrap();
        let service = RecordingCombiner::new();
        let ctx = CombineContext::new(&service, dir.path());
        filter.set_params(sample_params());

        let output = filter.combine(&registry, &sample_wcs(), &ctx).unwrap();

        assert!(output.ends_with("hst_00245_01_wfc3_uvis_f275w_ib1f01_drc.fits"));
        let calls = service.calls();
        assert_eq!(
            calls[0].inputs,
            vec!["ib1f01abq_flt.fits", "ib1f01b2q_flt.fits"]
        );
        assert_eq!(filter.state(), CombineState::Combined);
    }
}
