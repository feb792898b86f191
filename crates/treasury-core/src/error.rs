use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Malformed comparison entity or subject data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Simulation parameter outside its allowed range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
