use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The procedure violates a structural invariant of the IR.
    #[error("Malformed IR in `{procedure}`: {reason}")]
    MalformedIr { procedure: String, reason: String },

    /// The fixpoint did not stabilise within the iteration cap.
    #[error("Widening diverged in `{procedure}` after {iterations} iterations")]
    DivergentWidening { procedure: String, iterations: usize },
}

impl AnalysisError {
    pub fn procedure(&self) -> &str {
        match self {
            AnalysisError::MalformedIr { procedure, .. } | AnalysisError::DivergentWidening { procedure, .. } => {
                procedure
            }
        }
    }
}
