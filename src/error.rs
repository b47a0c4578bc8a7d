//! Error types for subblock comparison runs.

use thiserror::Error;

/// Errors that can occur while configuring or reporting a comparison run.
///
/// Points that fall outside a model or cannot be resolved are *not* errors;
/// they are counted in the resolution outcomes and surfaced in the report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareError {
    /// The two models do not span the same physical extent, so no shared
    /// comparison grid exists.
    #[error(
        "incompatible model extents: [{:.6}, {:.6}, {:.6}] vs [{:.6}, {:.6}, {:.6}]",
        .left[0], .left[1], .left[2], .right[0], .right[1], .right[2]
    )]
    IncompatibleExtents { left: [f64; 3], right: [f64; 3] },

    /// The comparison grid would have more cells than the configured ceiling.
    #[error("comparison grid too large: {estimated} cells exceeds the limit of {limit}")]
    GridTooLarge { estimated: u128, limit: u128 },

    /// A smallest-subblock-size hint was non-positive, non-numeric or malformed.
    #[error("invalid subblock size hint {input:?}: {reason}")]
    InvalidSizeHint { input: String, reason: String },

    /// A percentage was requested over zero resolved pairs.
    #[error("no resolved pairs to report on")]
    NoData,

    /// None of the selector's rules matched a categorical attribute.
    #[error("no categorical attribute found (available: {})", .available.join(", "))]
    NoCategoricalAttribute { available: Vec<String> },

    /// Two parallel arrays disagree on length.
    #[error("{what}: expected {expected} entries, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// The model description itself is unusable (zero resolution, bad counts).
    #[error("invalid model: {0}")]
    InvalidModel(String),
}
