//! Testing utilities for the HAP workspace
//!
//! Shared fake collaborators and fixtures. The fakes record the calls they
//! receive behind a `Mutex` so tests can assert on the exact filename lists
//! and options the products delegated.

#![allow(missing_docs)]

use std::fs;
use std::sync::Mutex;

use indexmap::IndexMap;
use hap_services::{
    AlignmentError, AlignmentRecord, AlignmentService, AlignmentTable, AlignOptions,
    CombinationError, CombinationService, ConfigError, ConfigProvider, DrizzleParams,
    ExposureMetadataSource, ExposureTiming, FrameError, MetadataError, ReferenceFrameBuilder,
    WcsDescriptor, DRIZZLE_STAGE,
};

/// Timing used by most fixtures: an early-2009 WFC3 visit.
pub fn sample_timing() -> ExposureTiming {
    ExposureTiming {
        start_mjd: 55_090.213,
        duration_s: 450.0,
    }
}

pub fn sample_wcs() -> WcsDescriptor {
    WcsDescriptor {
        crval1: 210.802,
        crval2: 54.349,
        pixel_scale: 0.04,
        orientation: 0.0,
        naxis1: 4213,
        naxis2: 4213,
    }
}

/// Default astrodrizzle parameter set used by fixtures.
pub fn sample_params() -> DrizzleParams {
    let mut params = DrizzleParams::new();
    params.set("final_pixfrac", 0.8);
    params.set("final_wht_type", "EXP");
    params.set("skysub", true);
    params
}

/// Metadata source backed by an in-memory filename -> timing map
///
/// Unknown filenames report a missing `EXPSTART` keyword, mimicking an
/// exposure whose header lacks timing.
#[derive(Debug, Default)]
pub struct StubMetadataSource {
    timings: IndexMap<String, ExposureTiming>,
}

impl StubMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, filename: &str, timing: ExposureTiming) -> Self {
        self.timings.insert(filename.to_string(), timing);
        self
    }

    /// Every filename in `filenames` gets [`sample_timing`].
    #[must_use]
    pub fn with_all(mut self, filenames: &[&str]) -> Self {
        for filename in filenames {
            self.timings.insert((*filename).to_string(), sample_timing());
        }
        self
    }
}

impl ExposureMetadataSource for StubMetadataSource {
    fn observation_timing(&self, filename: &str) -> Result<ExposureTiming, MetadataError> {
        self.timings
            .get(filename)
            .copied()
            .ok_or(MetadataError::MissingKeyword {
                filename: filename.to_string(),
                keyword: "EXPSTART",
            })
    }
}

/// Frame builder returning [`sample_wcs`] with the requested rotation,
/// recording every call.
#[derive(Debug, Default)]
pub struct RecordingFrameBuilder {
    calls: Mutex<Vec<(Vec<String>, f64)>>,
}

impl RecordingFrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(Vec<String>, f64)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReferenceFrameBuilder for RecordingFrameBuilder {
    fn build_frame(
        &self,
        filenames: &[String],
        rotation: f64,
    ) -> Result<WcsDescriptor, FrameError> {
        if filenames.is_empty() {
            return Err(FrameError::NoInputs);
        }
        self.calls
            .lock()
            .unwrap()
            .push((filenames.to_vec(), rotation));
        let mut wcs = sample_wcs();
        wcs.orientation = rotation;
        Ok(wcs)
    }
}

/// One recorded combination call.
#[derive(Debug, Clone)]
pub struct CombineCall {
    pub inputs: Vec<String>,
    pub output: String,
    pub params: DrizzleParams,
}

/// Combination service that records calls and writes the run log the real
/// service would leave behind.
#[derive(Debug, Default)]
pub struct RecordingCombiner {
    calls: Mutex<Vec<CombineCall>>,
}

impl RecordingCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<CombineCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl CombinationService for RecordingCombiner {
    fn combine(
        &self,
        inputs: &[String],
        output: &str,
        params: &DrizzleParams,
    ) -> Result<(), CombinationError> {
        if let Some(runfile) = &params.runfile {
            fs::write(runfile, format!("drizzle run over {} inputs\n", inputs.len()))?;
        }
        fs::write(output, b"SIMPLE  =                    T\n")?;
        self.calls.lock().unwrap().push(CombineCall {
            inputs: inputs.to_vec(),
            output: output.to_string(),
            params: params.clone(),
        });
        Ok(())
    }
}

/// Combination service that always fails, writing nothing.
#[derive(Debug)]
pub struct FailingCombiner {
    pub error: fn() -> CombinationError,
}

impl FailingCombiner {
    pub fn structural() -> Self {
        Self {
            error: || CombinationError::RejectedInputs("incompatible chip layout".to_string()),
        }
    }

    pub fn transient() -> Self {
        Self {
            error: || CombinationError::Unavailable("service offline".to_string()),
        }
    }
}

impl CombinationService for FailingCombiner {
    fn combine(
        &self,
        _inputs: &[String],
        _output: &str,
        _params: &DrizzleParams,
    ) -> Result<(), CombinationError> {
        Err((self.error)())
    }
}

/// Alignment service returning one clean record per input, recording the
/// options of every call.
#[derive(Debug, Default)]
pub struct TableAligner {
    calls: Mutex<Vec<(Vec<String>, AlignOptions)>>,
}

impl TableAligner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(Vec<String>, AlignOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

impl AlignmentService for TableAligner {
    fn align(
        &self,
        filenames: &[String],
        options: &AlignOptions,
    ) -> Result<AlignmentTable, AlignmentError> {
        self.calls
            .lock()
            .unwrap()
            .push((filenames.to_vec(), options.clone()));
        Ok(filenames
            .iter()
            .map(|name| AlignmentRecord {
                image_name: name.clone(),
                offset_x: 0.11,
                offset_y: -0.07,
                rotation: 0.001,
                scale: 1.0,
                rms_x: 0.05,
                rms_y: 0.05,
                fit_rms: 0.004,
                total_rms: 0.005,
                status: 0,
                fit_quality: 1,
                matched_sources: 180,
            })
            .collect())
    }
}

/// Alignment service that always crashes.
#[derive(Debug, Default)]
pub struct FailingAligner;

impl AlignmentService for FailingAligner {
    fn align(
        &self,
        _filenames: &[String],
        _options: &AlignOptions,
    ) -> Result<AlignmentTable, AlignmentError> {
        Err(AlignmentError::Failed(
            "catalog query returned no overlap".to_string(),
        ))
    }
}

/// Alignment service that completes but finds no usable solution.
#[derive(Debug, Default)]
pub struct EmptyAligner;

impl AlignmentService for EmptyAligner {
    fn align(
        &self,
        _filenames: &[String],
        _options: &AlignOptions,
    ) -> Result<AlignmentTable, AlignmentError> {
        Ok(AlignmentTable::new())
    }
}

/// Configuration provider with a fixed astrodrizzle parameter set.
#[derive(Debug)]
pub struct StaticConfig {
    params: DrizzleParams,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self {
            params: sample_params(),
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigProvider for StaticConfig {
    fn get_pars(&self, stage: &str) -> Result<DrizzleParams, ConfigError> {
        if stage == DRIZZLE_STAGE {
            Ok(self.params.clone())
        } else {
            Err(ConfigError::UnknownStage(stage.to_string()))
        }
    }
}
