use thiserror::Error;

/// Errors raised by the growth model core.
///
/// All of them are precondition failures: nothing is clamped or retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A model or sampler parameter is outside its domain.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    /// Threshold fraction outside `(P0/K, 1)`.
    #[error("fraction must be in the range ({min}, 1), but is {fraction}")]
    InvalidFraction { fraction: f64, min: f64 },
    /// Nothing to compute.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),
    /// Negative, non-finite or out-of-order time point.
    #[error("invalid time point {0}")]
    InvalidTimePoint(f64),
    /// Curves that do not fit their collection.
    #[error("inconsistent collection: {0}")]
    InconsistentCollection(String),
}

impl ModelError {
    pub(crate) fn param(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
