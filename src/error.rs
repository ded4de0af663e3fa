use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Startup failures while loading the model or tokenizer artifacts.
#[derive(Error, Debug)]
pub enum ArtifactLoadError {
    #[error("artifact not found: {0}")]
    Missing(PathBuf),

    #[error("failed to load tokenizer from {path}: {reason}")]
    Tokenizer { path: PathBuf, reason: String },

    #[error("failed to load model from {path}: {reason}")]
    Model { path: PathBuf, reason: String },

    #[error("tokenizer vocabulary ({tokenizer_vocab}) does not fit model vocabulary ({model_vocab})")]
    Incompatible {
        tokenizer_vocab: usize,
        model_vocab: usize,
    },

    #[error("built without the `llama` feature; no local model backend available")]
    BackendDisabled,
}

/// Per-request failure of the inference call.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("prompt is {prompt_tokens} tokens, no room left within max length {max_length}")]
    PromptTooLong {
        prompt_tokens: usize,
        max_length: usize,
    },

    #[error("inference failed: {0}")]
    Backend(String),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation worker aborted: {0}")]
    Aborted(String),
}

/// The model answered, but not in the shape the extractor expects.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("generated text does not contain the `[/INST]` delimiter")]
    MissingDelimiter,
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl RunError {
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Generation(GenerationError::Timeout(_)) => "timeout",
            RunError::Generation(_) => "generation",
            RunError::Parse(_) => "parse",
        }
    }

    /// Generation failures may succeed on resubmission; parse failures reflect the model's answer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RunError::Generation(_))
    }
}
