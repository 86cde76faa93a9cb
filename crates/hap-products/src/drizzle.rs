//! Shared combination driver
//!
//! All three product tiers drive the combination service the same way:
//! preflight the product (configured, not failed, non-empty membership),
//! point the parameter set at the shared reference frame and this product's
//! run log, invoke the service, then promote the run log to the canonical
//! trailer text name. Only the member list differs per tier.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ProductError;
use crate::state::CombineState;
use hap_services::{CombinationService, DrizzleParams, WcsDescriptor};

/// Collaborators and output location for combination operations
#[derive(Clone, Copy)]
pub struct CombineContext<'a> {
    /// Resampling/co-addition service
    pub service: &'a dyn CombinationService,
    /// Directory the combined image, run log, and trailer land in
    pub out_dir: &'a Path,
}

impl<'a> CombineContext<'a> {
    /// Create a context
    #[inline]
    #[must_use]
    pub fn new(service: &'a dyn CombinationService, out_dir: &'a Path) -> Self {
        Self { service, out_dir }
    }
}

/// One tier-agnostic combination request
pub(crate) struct DrizzleRun {
    pub(crate) tier: &'static str,
    pub(crate) basename: String,
    pub(crate) inputs: Vec<String>,
    pub(crate) output_name: String,
    pub(crate) trailer_log: String,
    pub(crate) trailer_txt: String,
}

/// Drive one combination call and promote its trailer
///
/// State transitions: `Combining` on entry, then `Combined` on success or
/// `Failed` if the service (or the trailer promotion) errors. The run log
/// is left untouched when the service fails before producing output.
pub(crate) fn run_drizzle(
    run: &DrizzleRun,
    state: &mut CombineState,
    params: Option<&DrizzleParams>,
    wcs: &WcsDescriptor,
    ctx: &CombineContext<'_>,
) -> Result<PathBuf, ProductError> {
    let params = params.ok_or_else(|| ProductError::NotConfigured {
        basename: run.basename.clone(),
    })?;
    if state.is_failed() {
        return Err(ProductError::CombineAfterFailure {
            basename: run.basename.clone(),
        });
    }
    if run.inputs.is_empty() {
        return Err(ProductError::EmptyMembership {
            basename: run.basename.clone(),
        });
    }

    let output_path = ctx.out_dir.join(&run.output_name);
    let log_path = ctx.out_dir.join(&run.trailer_log);
    let txt_path = ctx.out_dir.join(&run.trailer_txt);

    let mut pars = params.clone();
    pars.final_refimage = Some(wcs.clone());
    pars.runfile = Some(log_path.to_string_lossy().into_owned());

    *state = CombineState::Combining;
    tracing::info!(
        tier = run.tier,
        basename = %run.basename,
        inputs = run.inputs.len(),
        "running drizzle combination"
    );

    if let Err(source) = ctx.service.combine(
        &run.inputs,
        &output_path.to_string_lossy(),
        &pars,
    ) {
        *state = CombineState::Failed;
        tracing::error!(
            tier = run.tier,
            basename = %run.basename,
            error = %source,
            "combination service failed"
        );
        return Err(ProductError::CombinationFailed {
            basename: run.basename.clone(),
            source,
        });
    }

    if let Err(source) = fs::rename(&log_path, &txt_path) {
        *state = CombineState::Failed;
        return Err(ProductError::TrailerPromotion {
            log: log_path.to_string_lossy().into_owned(),
            txt: txt_path.to_string_lossy().into_owned(),
            source,
        });
    }

    *state = CombineState::Combined;
    tracing::info!(
        tier = run.tier,
        basename = %run.basename,
        output = %output_path.display(),
        "combined image written, trailer promoted"
    );
    Ok(output_path)
}
