//! Build-time configuration errors.
//!
//! Match-time failure is never an error: every matcher and every parse entry
//! point reports "no match" as `None`. The variants here are only produced
//! while a grammar is being put together.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("invalid repetition bounds: min {min}, max {}", fmt_max(.max))]
    InvalidBounds { min: usize, max: Option<usize> },

    #[error("forward reference is already defined")]
    ForwardAlreadyDefined,

    #[error("forward reference {index} was never defined")]
    ForwardUndefined { index: usize },

    #[error("operator grammar needs at least one level")]
    EmptyOperatorTable,

    #[error("operator level {level} has no operand level below it")]
    MissingOperand { level: usize },
}

fn fmt_max(max: &Option<usize>) -> String {
    match max {
        Some(n) => n.to_string(),
        None => "unbounded".to_string(),
    }
}

/// Check repetition bounds: not both zero, and `min <= max` when bounded.
pub(crate) fn check_bounds(min: usize, max: Option<usize>) -> Result<(), BuildError> {
    match max {
        Some(0) if min == 0 => Err(BuildError::InvalidBounds { min, max }),
        Some(m) if min > m => Err(BuildError::InvalidBounds { min, max }),
        _ => Ok(()),
    }
}
