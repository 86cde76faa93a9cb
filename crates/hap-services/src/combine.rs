//! Resampling/co-addition contract

use crate::config::DrizzleParams;

/// Resamples and co-adds input exposures onto a reference frame
///
/// A successful call writes the combined FITS image at `output` and a run
/// log at the parameter set's `runfile` path. The caller promotes that log
/// to the canonical trailer text name afterwards.
pub trait CombinationService {
    /// Run one resampling/co-addition pass
    ///
    /// # Errors
    /// Returns [`CombinationError`] if the service fails; in that case no
    /// run log is promoted and the product is marked failed.
    fn combine(
        &self,
        inputs: &[String],
        output: &str,
        params: &DrizzleParams,
    ) -> Result<(), CombinationError>;
}

/// Errors raised by a combination service
#[derive(Debug, thiserror::Error)]
pub enum CombinationError {
    /// The service rejected the inputs (bad geometry, incompatible
    /// headers); retrying the same call cannot succeed
    #[error("inputs rejected: {0}")]
    RejectedInputs(String),

    /// The resampling run itself failed
    #[error("combination run failed: {0}")]
    Failed(String),

    /// The service was unavailable (not installed, busy, crashed on start)
    #[error("combination service unavailable: {0}")]
    Unavailable(String),

    /// I/O failure while writing the output image or run log
    #[error("combination i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl CombinationError {
    /// Check if retrying the same call could succeed
    ///
    /// Transient failures (service unavailable, I/O) are retryable;
    /// structural ones (rejected inputs, failed runs) are not.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}
