use thiserror::Error;

/// Failure kinds surfaced by fitting, evaluation and vine construction.
#[derive(Error, Debug)]
pub enum CopulaError {
  /// Theta outside its bounds or flagged invalid, wrong parameter arity,
  /// unknown family name, or use of a model that has no parameters yet.
  #[error("invalid parameter for {family}: {reason}")]
  InvalidParameter { family: &'static str, reason: String },

  /// Optimizer or root search did not converge, the optimum was rejected,
  /// or every tournament candidate failed.
  #[error("fit failure: {0}")]
  FitFailure(String),

  /// Sample too small, length-mismatched or degenerate.
  #[error("insufficient data: {0}")]
  DataInsufficiency(String),

  /// Input outside the domain the operation requires.
  #[error("domain error: {0}")]
  DomainError(String),
}

pub type Result<T> = std::result::Result<T, CopulaError>;
