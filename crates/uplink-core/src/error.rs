//! Error types for `uplink-core`.

use std::time::Duration;

use thiserror::Error;

use crate::score::Criterion;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{criterion} score {value} is outside [0, 100]")]
  ScoreOutOfRange { criterion: Criterion, value: f64 },

  #[error("overall score {0} is outside [0, 100]")]
  OverallOutOfRange(f64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of an external AI evaluator (idea scorer or match evaluator).
///
/// Every variant is recoverable: callers substitute a deterministic result or
/// report the analysis as pending.
#[derive(Debug, Clone, Error)]
pub enum EvaluatorError {
  #[error("evaluator unavailable: {0}")]
  Unavailable(String),

  #[error("evaluator returned malformed output: {0}")]
  Malformed(String),

  #[error("evaluator timed out after {0:?}")]
  Timeout(Duration),

  #[error("evaluator disabled")]
  Disabled,
}
