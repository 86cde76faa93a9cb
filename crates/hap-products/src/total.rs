//! Total-tier ("white light") mosaic product

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::drizzle::{run_drizzle, CombineContext, DrizzleRun};
use crate::error::ProductError;
use crate::filter::FilterProduct;
use crate::registry::{ExposureId, ExposureRegistry, FilterId};
use crate::state::CombineState;
use hap_naming::{manifest_name, ProductIdentity};
use hap_services::{DrizzleParams, ReferenceFrameBuilder, WcsDescriptor};
use indexmap::IndexMap;
use serde_json::Value;

/// Mosaic orientation is pinned to celestial north-up so every tier shares
/// one grid orientation and pixel scale.
const NORTH_UP_ROTATION: f64 = 0.0;

/// Total-detection mosaic: one instrument/detector, all filters, all
/// exposures of a visit
///
/// Exactly one exists per (instrument, detector) per visit. It is created
/// before its members, mutated by member registration, and finalized once
/// the shared reference frame and combined image exist. The union of
/// exposures reachable through its filter members must equal its own
/// exposure list.
#[derive(Debug)]
pub struct TotalProduct {
    identity: ProductIdentity,
    manifest_name: String,
    exposure_members: Vec<ExposureId>,
    filter_members: Vec<FilterId>,
    regions: IndexMap<String, Value>,
    meta_wcs: Option<WcsDescriptor>,
    params: Option<DrizzleParams>,
    state: CombineState,
}

impl TotalProduct {
    /// Construct the total product for one instrument/detector
    ///
    /// # Errors
    /// Returns a naming error for malformed identity fields.
    pub fn new(
        prop_id: &str,
        obset_id: &str,
        instrument: &str,
        detector: &str,
        filename: &str,
        filetype: &str,
    ) -> Result<Self, ProductError> {
        let identity =
            ProductIdentity::total(prop_id, obset_id, instrument, detector, filename, filetype)?;
        let manifest = manifest_name(instrument, obset_id, filename)?;

        tracing::info!(instrument, detector, "total detection product created");

        Ok(Self {
            identity,
            manifest_name: manifest,
            exposure_members: Vec::new(),
            filter_members: Vec::new(),
            regions: IndexMap::new(),
            meta_wcs: None,
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

    /// Visit-scoped manifest filename
    #[inline]
    #[must_use]
    pub fn manifest_name(&self) -> &str {
        &self.manifest_name
    }

    /// Exposure member handles, across all filters
    #[inline]
    #[must_use]
    pub fn exposure_members(&self) -> &[ExposureId] {
        &self.exposure_members
    }

    /// Filter member handles
    #[inline]
    #[must_use]
    pub fn filter_members(&self) -> &[FilterId] {
        &self.filter_members
    }

    /// Shared reference frame, once computed
    #[inline]
    #[must_use]
    pub fn reference_frame(&self) -> Option<&WcsDescriptor> {
        self.meta_wcs.as_ref()
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

    /// Register an exposure member
    ///
    /// # Errors
    /// Returns [`ProductError::DuplicateMember`] if the handle is already
    /// registered.
    pub fn add_exposure_member(
        &mut self,
        id: ExposureId,
        registry: &ExposureRegistry,
    ) -> Result<(), ProductError> {
        if self.exposure_members.contains(&id) {
            return Err(ProductError::DuplicateMember {
                member: registry.get(id)?.basename(),
                product: self.basename(),
            });
        }
        self.exposure_members.push(id);
        Ok(())
    }

    /// Register a filter member
    ///
    /// # Errors
    /// Returns [`ProductError::DuplicateMember`] if the handle is already
    /// registered.
    pub fn add_filter_member(
        &mut self,
        id: FilterId,
        product: &FilterProduct,
    ) -> Result<(), ProductError> {
        if self.filter_members.contains(&id) {
            return Err(ProductError::DuplicateMember {
                member: product.basename(),
                product: self.basename(),
            });
        }
        self.filter_members.push(id);
        Ok(())
    }

    /// Build the one shared WCS every tier resamples onto
    ///
    /// Gathers the filenames of every exposure member (flattened across
    /// filters) and delegates exactly that list, with rotation pinned to
    /// [`NORTH_UP_ROTATION`], to the frame builder. The frame is computed
    /// once and cached; later calls return the cached frame without
    /// re-invoking the builder.
    ///
    /// # Errors
    /// Returns [`ProductError::EmptyMembership`] when no exposures are
    /// registered, or propagates the builder's [`hap_services::FrameError`].
    pub fn compute_reference_frame(
        &mut self,
        registry: &ExposureRegistry,
        builder: &dyn ReferenceFrameBuilder,
    ) -> Result<&WcsDescriptor, ProductError> {
        if self.meta_wcs.is_none() {
            if self.exposure_members.is_empty() {
                return Err(ProductError::EmptyMembership {
                    basename: self.basename(),
                });
            }
            let filenames = registry.filenames(&self.exposure_members)?;
            tracing::info!(
                product = %self.identity,
                exposures = filenames.len(),
                "computing common reference frame"
            );
            let wcs = builder.build_frame(&filenames, NORTH_UP_ROTATION)?;
            self.meta_wcs = Some(wcs);
        } else {
            tracing::debug!(product = %self.identity, "reusing cached reference frame");
        }
        self.meta_wcs
            .as_ref()
            .ok_or(ProductError::MissingReferenceFrame)
    }

    /// Verify the composition-consistency invariant
    ///
    /// The union of exposures reachable through the filter members must
    /// equal this product's direct exposure list: no orphaned and no
    /// duplicated exposures.
    ///
    /// # Errors
    /// Returns [`ProductError::MembershipInconsistent`] describing the
    /// divergence, or [`ProductError::UnknownFilter`] for a dangling
    /// filter handle.
    pub fn verify_membership(&self, filters: &[FilterProduct]) -> Result<(), ProductError> {
        let direct: BTreeSet<ExposureId> = self.exposure_members.iter().copied().collect();
        let mut reachable: BTreeSet<ExposureId> = BTreeSet::new();
        for id in &self.filter_members {
            let filter = filters
                .get(id.index())
                .ok_or(ProductError::UnknownFilter(*id))?;
            reachable.extend(filter.members().iter().copied());
        }

        if direct == reachable {
            return Ok(());
        }

        let orphaned = reachable.difference(&direct).count();
        let missing = direct.difference(&reachable).count();
        Err(ProductError::MembershipInconsistent {
            basename: self.basename(),
            detail: format!(
                "{orphaned} exposure(s) reachable only via filters, {missing} only direct"
            ),
        })
    }

    /// Drizzle every exposure across all filters into the total mosaic
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
            tier: "total",
            basename: self.basename(),
            inputs: registry.filenames(&self.exposure_members)?,
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
        sample_params, sample_wcs, RecordingCombiner, RecordingFrameBuilder, StubMetadataSource,
    };
    use pretty_assertions::assert_eq;

    const FILES: [&str; 3] = [
        "ib1f01abq_flt.fits",
        "ib1f01b2q_flt.fits",
        "ib1f01c4q_flt.fits",
    ];

    fn setup() -> (ExposureRegistry, Vec<ExposureId>, TotalProduct) {
        let metadata = StubMetadataSource::new().with_all(&FILES);
        let mut registry = ExposureRegistry::new();
        let mut ids = Vec::new();
        for (i, filename) in FILES.iter().enumerate() {
            let filter = if i < 2 { "f275w" } else { "f336w" };
            let exposure = ExposureProduct::new(
                "245", "01", "wfc3", "uvis", filename, filter, "drc", &metadata,
            )
            .unwrap();
            ids.push(registry.register(exposure).unwrap());
        }

        let mut total =
            TotalProduct::new("245", "01", "wfc3", "uvis", FILES[0], "drc").unwrap();
        for id in &ids {
            total.add_exposure_member(*id, &registry).unwrap();
        }
        (registry, ids, total)
    }

    fn filter_with_members(
        registry: &ExposureRegistry,
        name: &str,
        ids: &[ExposureId],
    ) -> FilterProduct {
        let mut filter =
            FilterProduct::new("245", "01", "wfc3", "uvis", FILES[0], name, "drc").unwrap();
        for id in ids {
            filter.add_member(*id, registry).unwrap();
        }
        filter
    }

    #[test]
    fn basename_and_manifest() {
        let (_, _, total) = setup();
        assert_eq!(total.basename(), "hst_00245_01_wfc3_uvis_ib1f01");
        assert_eq!(total.manifest_name(), "wfc3_b1f_01_manifest.txt");
    }

    #[test]
    fn region_annotations_are_recorded() {
        let (_, _, mut total) = setup();
        total.annotate_region("mosaic", serde_json::json!({"chips": 2}));
        assert!(total.regions().contains_key("mosaic"));
    }

    #[test]
    fn frame_delegates_exact_list_with_zero_rotation() {
        let (registry, _, mut total) = setup();
        let builder = RecordingFrameBuilder::new();

        let wcs = total.compute_reference_frame(&registry, &builder).unwrap();
        assert!(wcs.is_north_up());

        let calls = builder.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, FILES.map(String::from).to_vec());
        assert_eq!(calls[0].1, 0.0);
    }

    #[test]
    fn frame_is_computed_once() {
        let (registry, _, mut total) = setup();
        let builder = RecordingFrameBuilder::new();

        total.compute_reference_frame(&registry, &builder).unwrap();
        total.compute_reference_frame(&registry, &builder).unwrap();

        assert_eq!(builder.calls().len(), 1);
        assert!(total.reference_frame().is_some());
    }

    #[test]
    fn frame_with_no_members_is_reported() {
        let registry = ExposureRegistry::new();
        let mut total =
            TotalProduct::new("245", "01", "wfc3", "uvis", FILES[0], "drc").unwrap();
        let builder = RecordingFrameBuilder::new();

        let result = total.compute_reference_frame(&registry, &builder);
        assert!(matches!(result, Err(ProductError::EmptyMembership { .. })));
        assert!(total.reference_frame().is_none());
        assert!(builder.calls().is_empty());
    }

    #[test]
    fn duplicate_exposure_member_rejected() {
        let (registry, ids, mut total) = setup();
        let result = total.add_exposure_member(ids[0], &registry);
        assert!(matches!(result, Err(ProductError::DuplicateMember { .. })));
    }

    #[test]
    fn membership_consistency_holds() {
        let (registry, ids, mut total) = setup();
        let filters = vec![
            filter_with_members(&registry, "f275w", &ids[..2]),
            filter_with_members(&registry, "f336w", &ids[2..]),
        ];
        total.add_filter_member(FilterId(0), &filters[0]).unwrap();
        total.add_filter_member(FilterId(1), &filters[1]).unwrap();

        assert!(total.verify_membership(&filters).is_ok());
    }

    #[test]
    fn membership_divergence_detected() {
        let (registry, ids, mut total) = setup();
        // The f336w exposure is registered on the total product but on no
        // filter product.
        let filters = vec![filter_with_members(&registry, "f275w", &ids[..2])];
        total.add_filter_member(FilterId(0), &filters[0]).unwrap();

        let result = total.verify_membership(&filters);
        assert!(matches!(
            result,
            Err(ProductError::MembershipInconsistent { .. })
        ));
    }

    #[test]
    fn combine_spans_all_filters() {
        let (registry, _, mut total) = setup();
        let dir = tempfile::tempdir().unwrap();
        let service = RecordingCombiner::new();
        let ctx = CombineContext::new(&service, dir.path());
        total.set_params(sample_params());

        let output = total.combine(&registry, &sample_wcs(), &ctx).unwrap();

        assert!(output.ends_with("hst_00245_01_wfc3_uvis_ib1f01_drc.fits"));
        assert_eq!(service.calls()[0].inputs, FILES.map(String::from).to_vec());
        assert_eq!(total.state(), CombineState::Combined);
    }
}
