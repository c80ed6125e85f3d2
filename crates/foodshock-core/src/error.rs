use thiserror::Error;

/// Errors surfaced by parameter derivation and the optimizer.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A scenario field failed validation. Reports the field by name.
    #[error("invalid scenario input `{field}`: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// A derived constant came out NaN or infinite. Reports the key so the
    /// culprit can be traced back through the derivation.
    #[error("derived constant `{0}` is not finite")]
    NotFinite(&'static str),

    /// An internal consistency check failed (series length, negative demand,
    /// calorie conservation in the shift cascade, ...).
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// The LP solver did not return an optimal solution. For a well-formed
    /// scenario this means the scenario itself is impossible.
    #[error("scenario is impossible: {0}")]
    Infeasible(#[from] good_lp::ResolutionError),

    /// Post-solve audit found a constraint that does not hold.
    #[error("solution audit failed: {0}")]
    Audit(String),
}
