use thiserror::Error;

/// Failure taxonomy of the detection/tracking pipeline.
///
/// Every variant except `IsTerminated` leaves the detection engine
/// permanently terminated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("detection failed: {0}")]
    Detection(String),
    #[error("tracking failed: {0}")]
    Tracking(String),
    #[error("detection engine is terminated")]
    IsTerminated,
}

impl PipelineError {
    /// Short headline for the diagnostic raised when this error terminates
    /// the pipeline.
    pub fn caption(&self) -> &'static str {
        match self {
            PipelineError::Initialization(_) => "Face detector initialization error.",
            PipelineError::Detection(_) => "Face detection error.",
            PipelineError::Tracking(_) => "Face tracking error.",
            PipelineError::IsTerminated => "Pipeline is in broken state.",
        }
    }
}
