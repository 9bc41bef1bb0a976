use regrag_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("topic pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Faults inside response synthesis.
///
/// These never reach callers of `Synthesizer::synthesize`; they are logged and replaced by the
/// zero-valued response.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("malformed search result at index {index}: {message}")]
    MalformedRecord { index: usize, message: String },

    #[error("non-finite score {score} at index {index}")]
    NonFiniteScore { index: usize, score: f64 },
}
