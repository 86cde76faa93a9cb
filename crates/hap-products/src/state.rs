//! Combined-image lifecycle state

/// Lifecycle of a product's combined-image artifact
///
/// `Uncreated -> Combining -> Combined` on success, or
/// `Uncreated -> Combining -> Failed` if the combination service errors.
/// `Failed` is terminal for the product within a run: there is no automatic
/// retry, and further combine calls are rejected. A `Combined` product may
/// combine again (a later call with a different reference frame overwrites
/// the output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineState {
    /// No combined image has been produced
    #[default]
    Uncreated,
    /// A combination call is in flight
    Combining,
    /// The combined image and trailer exist
    Combined,
    /// The combination service failed; terminal for this run
    Failed,
}

impl CombineState {
    /// True if this product's combination failed
    #[inline]
    #[must_use]
    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// True if a combined image has been produced
    #[inline]
    #[must_use]
    pub fn is_combined(self) -> bool {
        matches!(self, Self::Combined)
    }
}
