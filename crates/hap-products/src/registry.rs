//! Exposure registry: arena ownership with handle-based membership
//!
//! Exposures are referenced by both a filter product and the total product.
//! That is a non-owning multi-reference relationship, so the registry owns
//! every [`ExposureProduct`] for the visit and products hold [`ExposureId`]
//! handles into it, never duplicate copies.

use crate::error::ProductError;
use crate::exposure::ExposureProduct;
use indexmap::IndexMap;

/// Handle to an exposure owned by an [`ExposureRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExposureId(u32);

impl ExposureId {
    /// Position of the exposure in registration order
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a filter product owned by a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(pub(crate) u32);

impl FilterId {
    /// Position of the filter product in creation order
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Arena owning every exposure product of one visit, keyed by basename
#[derive(Debug, Default)]
pub struct ExposureRegistry {
    exposures: Vec<ExposureProduct>,
    by_basename: IndexMap<String, ExposureId>,
}

impl ExposureRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exposure, returning its handle
    ///
    /// # Errors
    /// Returns [`ProductError::DuplicateExposure`] if an exposure with the
    /// same basename is already registered.
    pub fn register(&mut self, exposure: ExposureProduct) -> Result<ExposureId, ProductError> {
        let basename = exposure.basename();
        if self.by_basename.contains_key(&basename) {
            return Err(ProductError::DuplicateExposure { basename });
        }
        let id = ExposureId(u32::try_from(self.exposures.len()).unwrap_or(u32::MAX));
        self.by_basename.insert(basename, id);
        self.exposures.push(exposure);
        Ok(id)
    }

    /// Resolve a handle
    ///
    /// # Errors
    /// Returns [`ProductError::UnknownExposure`] for a handle this registry
    /// did not issue.
    pub fn get(&self, id: ExposureId) -> Result<&ExposureProduct, ProductError> {
        self.exposures
            .get(id.index())
            .ok_or(ProductError::UnknownExposure(id))
    }

    /// Resolve a handle mutably
    ///
    /// # Errors
    /// Returns [`ProductError::UnknownExposure`] for a handle this registry
    /// did not issue.
    pub fn get_mut(&mut self, id: ExposureId) -> Result<&mut ExposureProduct, ProductError> {
        self.exposures
            .get_mut(id.index())
            .ok_or(ProductError::UnknownExposure(id))
    }

    /// Look up a handle by basename
    #[inline]
    #[must_use]
    pub fn lookup(&self, basename: &str) -> Option<ExposureId> {
        self.by_basename.get(basename).copied()
    }

    /// Full input filenames for an ordered list of handles
    ///
    /// # Errors
    /// Returns [`ProductError::UnknownExposure`] if any handle does not
    /// resolve.
    pub fn filenames(&self, ids: &[ExposureId]) -> Result<Vec<String>, ProductError> {
        ids.iter()
            .map(|id| self.get(*id).map(|e| e.full_filename().to_string()))
            .collect()
    }

    /// Iterate over registered exposures in registration order
    pub fn iter(&self) -> impl Iterator<Item = (ExposureId, &ExposureProduct)> {
        self.exposures
            .iter()
            .enumerate()
            .map(|(i, e)| (ExposureId(i as u32), e))
    }

    /// Iterate mutably over registered exposures in registration order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ExposureId, &mut ExposureProduct)> {
        self.exposures
            .iter_mut()
            .enumerate()
            .map(|(i, e)| (ExposureId(i as u32), e))
    }

    /// Number of registered exposures
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.exposures.len()
    }

    /// True if no exposures are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exposures.is_empty()
    }
}
