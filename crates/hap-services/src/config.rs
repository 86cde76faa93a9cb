//! Drizzle parameter sets and the configuration provider contract

use crate::wcs::WcsDescriptor;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter set stage consumed by every combine operation
pub const DRIZZLE_STAGE: &str = "astrodrizzle";

/// Parameter set for one resampling/co-addition run
///
/// Resolved by a [`ConfigProvider`] after all products exist, then attached
/// per product. The combine driver fills in `final_refimage` and `runfile`
/// just before invoking the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrizzleParams {
    /// Reference frame the inputs are resampled onto
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_refimage: Option<WcsDescriptor>,
    /// Run-log path for this combination pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runfile: Option<String>,
    /// Remaining stage parameters, order-preserving
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl DrizzleParams {
    /// Empty parameter set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a stage parameter, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    /// Look up a stage parameter
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Supplies resolved parameter sets per processing stage
///
/// Resolution depends on cross-cutting survey metadata, so products are
/// constructed first and configured afterwards; a combine on an
/// unconfigured product fails fast rather than using defaults.
pub trait ConfigProvider {
    /// Resolve the parameter set for `stage` (e.g. [`DRIZZLE_STAGE`])
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the stage is unknown or its parameters
    /// cannot be resolved.
    fn get_pars(&self, stage: &str) -> Result<DrizzleParams, ConfigError>;
}

/// Errors raised by a configuration provider
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No parameter set exists for the requested stage
    #[error("unknown configuration stage '{0}'")]
    UnknownStage(String),

    /// The stage exists but its parameters could not be resolved
    #[error("parameter resolution failed for stage '{stage}': {reason}")]
    Unresolvable {
        /// Requested stage
        stage: String,
        /// Provider-reported reason
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn params_set_and_get() {
        let mut params = DrizzleParams::new();
        params.set("final_pixfrac", 0.8);
        params.set("skysub", true);
        assert_eq!(params.get("final_pixfrac"), Some(&Value::from(0.8)));
        assert_eq!(params.get("skysub"), Some(&Value::from(true)));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn extra_params_flatten_in_json() {
        let mut params = DrizzleParams::new();
        params.set("final_pixfrac", 0.8);
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["final_pixfrac"], Value::from(0.8));
        // Unset refimage/runfile stay out of the serialized form.
        assert!(json.get("final_refimage").is_none());
        assert!(json.get("runfile").is_none());
    }
}
