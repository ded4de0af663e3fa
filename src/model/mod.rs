use crate::error::GenerationError;


#[derive(Clone, Debug)]
pub struct SamplingParams {
pub temp: f32,
pub top_p: f32,
pub min_p: f32,
pub repeat_penalty: f32,
}


/// Where the loader finds the model and tokenizer, plus the hub credential.
#[derive(Clone, Debug)]
pub struct ArtifactLocations {
pub model: std::path::PathBuf,
pub tokenizer: std::path::PathBuf,
pub hub_token: Option<String>,
}


/// A loaded generative model. `max_length` bounds prompt plus continuation tokens,
/// and the returned text is the prompt followed by the generated continuation.
#[async_trait::async_trait]
pub trait LlmBackend: Send + Sync + 'static {
async fn generate(&self, prompt: &str, max_length: usize) -> Result<String, GenerationError>;
}


pub mod llama;
