use selser_dom::DomError;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Normalized output failed the structural self-check. This points at
    /// corrupted input rather than a cosmetic difference.
    #[error("Normalization produced malformed output: {reason}")]
    NormalizationFailed { reason: String, output: String },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl EngineError {
    pub fn normalization_failed(reason: impl Into<String>, output: impl Into<String>) -> Self {
        Self::NormalizationFailed {
            reason: reason.into(),
            output: output.into(),
        }
    }
}
