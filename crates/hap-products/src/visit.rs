//! Visit assembly and end-to-end processing
//!
//! A [`Visit`] owns the exposure registry, the filter products, and the
//! total product for one (instrument, detector), wires membership during
//! assembly, and drives the per-visit flow: attach configuration, compute
//! the shared reference frame, align each filter group, combine every tier
//! against the one shared frame, and write the visit manifest.

use std::fs;
use std::path::{Path, PathBuf};

use crate::drizzle::CombineContext;
use crate::error::ProductError;
use crate::exposure::ExposureProduct;
use crate::filter::{AlignmentOutcome, FilterProduct};
use crate::registry::{ExposureRegistry, FilterId};
use crate::total::TotalProduct;
use hap_services::{
    AlignmentService, CombinationService, ConfigProvider, ExposureMetadataSource,
    ReferenceFrameBuilder, WcsDescriptor, DRIZZLE_STAGE,
};
use indexmap::IndexMap;

/// One input exposure of a visit
#[derive(Debug, Clone)]
pub struct ExposureSpec {
    /// Input exposure filename
    pub filename: String,
    /// Filter the exposure was taken through
    pub filter: String,
}

impl ExposureSpec {
    /// Convenience constructor
    #[inline]
    #[must_use]
    pub fn new(filename: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            filter: filter.into(),
        }
    }
}

/// Everything needed to assemble one visit
#[derive(Debug, Clone)]
pub struct VisitSpec {
    /// Proposal ID (normalized during assembly)
    pub prop_id: String,
    /// Visit/obset ID
    pub obset_id: String,
    /// Instrument name
    pub instrument: String,
    /// Detector name
    pub detector: String,
    /// Filetype tag for the drizzled outputs
    pub filetype: String,
    /// Input exposures in classification order
    pub exposures: Vec<ExposureSpec>,
}

/// External collaborators driving one visit's processing
#[derive(Clone, Copy)]
pub struct VisitServices<'a> {
    /// Common reference-frame builder
    pub frame: &'a dyn ReferenceFrameBuilder,
    /// Astrometric alignment service
    pub alignment: &'a dyn AlignmentService,
    /// Resampling/co-addition service
    pub combination: &'a dyn CombinationService,
}

/// Alignment result for one filter group
#[derive(Debug)]
pub struct FilterAlignment {
    /// Filter name
    pub filter: String,
    /// Tagged fit outcome
    pub outcome: AlignmentOutcome,
    /// Filenames handed to the alignment service
    pub inputs: Vec<String>,
}

/// One product whose combination failed during the run
#[derive(Debug)]
pub struct ProductFailure {
    /// Basename of the failed product
    pub basename: String,
    /// The failure; terminal for that product, siblings continue
    pub error: ProductError,
}

/// Outcome of one visit's processing
#[derive(Debug)]
pub struct VisitSummary {
    /// The shared frame every tier was resampled onto
    pub reference_frame: WcsDescriptor,
    /// Per-filter alignment outcomes
    pub alignments: Vec<FilterAlignment>,
    /// Combined images written, in production order
    pub artifacts: Vec<PathBuf>,
    /// Products whose combination failed
    pub failures: Vec<ProductFailure>,
    /// The manifest file written for the visit
    pub manifest_path: PathBuf,
}

/// All products of one visit for one instrument/detector
#[derive(Debug)]
pub struct Visit {
    registry: ExposureRegistry,
    filters: Vec<FilterProduct>,
    filter_ids: IndexMap<String, FilterId>,
    total: TotalProduct,
}

impl Visit {
    /// Assemble the product hierarchy for one visit
    ///
    /// Constructs every exposure product (reading timing metadata),
    /// classifies exposures into filter products created on first use,
    /// registers all members on the total product, and verifies the
    /// composition-consistency invariant before returning.
    ///
    /// # Errors
    /// Propagates metadata, naming, and duplicate-registration errors; an
    /// empty exposure list is reported as [`ProductError::EmptyMembership`].
    pub fn assemble(
        spec: &VisitSpec,
        metadata: &dyn ExposureMetadataSource,
    ) -> Result<Self, ProductError> {
        let first = spec
            .exposures
            .first()
            .ok_or_else(|| ProductError::EmptyMembership {
                basename: format!(
                    "{}/{} visit {}",
                    spec.instrument, spec.detector, spec.obset_id
                ),
            })?;

        let mut total = TotalProduct::new(
            &spec.prop_id,
            &spec.obset_id,
            &spec.instrument,
            &spec.detector,
            &first.filename,
            &spec.filetype,
        )?;
        let mut registry = ExposureRegistry::new();
        let mut filters: Vec<FilterProduct> = Vec::new();
        let mut filter_ids: IndexMap<String, FilterId> = IndexMap::new();

        for exposure_spec in &spec.exposures {
            let exposure = ExposureProduct::new(
                &spec.prop_id,
                &spec.obset_id,
                &spec.instrument,
                &spec.detector,
                &exposure_spec.filename,
                &exposure_spec.filter,
                &spec.filetype,
                metadata,
            )?;
            let id = registry.register(exposure)?;
            total.add_exposure_member(id, &registry)?;

            let filter_id = match filter_ids.get(&exposure_spec.filter) {
                Some(fid) => *fid,
                None => {
                    let product = FilterProduct::new(
                        &spec.prop_id,
                        &spec.obset_id,
                        &spec.instrument,
                        &spec.detector,
                        &exposure_spec.filename,
                        &exposure_spec.filter,
                        &spec.filetype,
                    )?;
                    let fid = FilterId(u32::try_from(filters.len()).unwrap_or(u32::MAX));
                    filters.push(product);
                    filter_ids.insert(exposure_spec.filter.clone(), fid);
                    fid
                }
            };
            filters[filter_id.index()].add_member(id, &registry)?;
        }

        for fid in filter_ids.values() {
            total.add_filter_member(*fid, &filters[fid.index()])?;
        }
        total.verify_membership(&filters)?;

        tracing::info!(
            exposures = registry.len(),
            filters = filters.len(),
            total = %total.identity(),
            "visit assembled"
        );

        Ok(Self {
            registry,
            filters,
            filter_ids,
            total,
        })
    }

    /// Exposure registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ExposureRegistry {
        &self.registry
    }

    /// Filter products in creation order
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[FilterProduct] {
        &self.filters
    }

    /// Look up a filter product by filter name
    #[must_use]
    pub fn filter_by_name(&self, filter: &str) -> Option<&FilterProduct> {
        self.filter_ids
            .get(filter)
            .and_then(|fid| self.filters.get(fid.index()))
    }

    /// Total product
    #[inline]
    #[must_use]
    pub fn total(&self) -> &TotalProduct {
        &self.total
    }

    /// Resolve the `"astrodrizzle"` parameter set and attach it to every
    /// product
    ///
    /// Must run before [`Visit::process`]; until then every combine
    /// operation fails fast with a not-configured error.
    ///
    /// # Errors
    /// Propagates the provider's [`hap_services::ConfigError`].
    pub fn attach_config(&mut self, provider: &dyn ConfigProvider) -> Result<(), ProductError> {
        let params = provider.get_pars(DRIZZLE_STAGE)?;
        for (_, exposure) in self.registry.iter_mut() {
            exposure.set_params(params.clone());
        }
        for filter in &mut self.filters {
            filter.set_params(params.clone());
        }
        self.total.set_params(params.clone());
        Ok(())
    }

    /// Run the visit end to end
    ///
    /// Computes the shared reference frame, aligns each filter group
    /// (failures degrade to the default WCS), combines the filter,
    /// exposure, and total tiers against the shared frame, and writes the
    /// visit manifest. A combination failure marks that product failed and
    /// is collected in the summary; sibling products keep processing.
    ///
    /// # Errors
    /// Returns an error if the visit is unconfigured, the reference frame
    /// cannot be computed, or the manifest cannot be written.
    pub fn process(
        &mut self,
        services: &VisitServices<'_>,
        out_dir: &Path,
    ) -> Result<VisitSummary, ProductError> {
        if self.total.params().is_none() {
            return Err(ProductError::NotConfigured {
                basename: self.total.basename(),
            });
        }

        let wcs = self
            .total
            .compute_reference_frame(&self.registry, services.frame)?
            .clone();

        let mut alignments = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            let (outcome, inputs) = filter.align_to_reference(&self.registry, services.alignment);
            alignments.push(FilterAlignment {
                filter: filter.filter().to_string(),
                outcome,
                inputs,
            });
        }

        let ctx = CombineContext::new(services.combination, out_dir);
        let mut artifacts = Vec::new();
        let mut failures = Vec::new();
        let mut manifest_lines = Vec::new();

        for filter in &mut self.filters {
            match filter.combine(&self.registry, &wcs, &ctx) {
                Ok(path) => {
                    let identity = filter.identity();
                    manifest_lines.push(identity.drizzle_filename());
                    manifest_lines.push(identity.trailer_filename());
                    manifest_lines.push(identity.point_catalog_filename());
                    manifest_lines.push(identity.segment_catalog_filename());
                    artifacts.push(path);
                }
                Err(error) => failures.push(ProductFailure {
                    basename: filter.basename(),
                    error,
                }),
            }
        }

        for (_, exposure) in self.registry.iter_mut() {
            match exposure.combine(&wcs, &ctx) {
                Ok(path) => {
                    let identity = exposure.identity();
                    manifest_lines.push(identity.drizzle_filename());
                    manifest_lines.push(identity.trailer_filename());
                    artifacts.push(path);
                }
                Err(error) => failures.push(ProductFailure {
                    basename: exposure.basename(),
                    error,
                }),
            }
        }

        match self.total.combine(&self.registry, &wcs, &ctx) {
            Ok(path) => {
                let identity = self.total.identity();
                manifest_lines.push(identity.drizzle_filename());
                manifest_lines.push(identity.trailer_filename());
                manifest_lines.push(identity.point_catalog_filename());
                manifest_lines.push(identity.segment_catalog_filename());
                artifacts.push(path);
            }
            Err(error) => failures.push(ProductFailure {
                basename: self.total.basename(),
                error,
            }),
        }

        let manifest_path = out_dir.join(self.total.manifest_name());
        let mut contents = manifest_lines.join("\n");
        contents.push('\n');
        fs::write(&manifest_path, contents).map_err(|source| ProductError::Manifest {
            path: manifest_path.to_string_lossy().into_owned(),
            source,
        })?;

        if failures.is_empty() {
            tracing::info!(artifacts = artifacts.len(), "visit processing complete");
        } else {
            tracing::warn!(
                artifacts = artifacts.len(),
                failed = failures.len(),
                "visit processing complete with failed products"
            );
        }

        Ok(VisitSummary {
            reference_frame: wcs,
            alignments,
            artifacts,
            failures,
            manifest_path,
        })
    }
}
