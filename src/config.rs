use crate::model::{llama::LoadOptions, ArtifactLocations, SamplingParams};
use clap::Parser;
use std::{path::PathBuf, time::Duration};

#[derive(Parser, Debug, Clone)]
#[command(about = "Extract condition keywords from clinical notes with a local LLM")]
pub struct Config {
    #[arg(long, env, default_value = "0.0.0.0:8080")]
    pub bind_addr: String,
    #[arg(long, env, default_value = "metadata/fine_tuned")]
    pub model_path: PathBuf,
    #[arg(long, env, default_value = "metadata/tokenft")]
    pub tokenizer_path: PathBuf,
    /// Model hub credential handed to the loader.
    #[arg(long, env, default_value = "auth_token", hide_env_values = true)]
    pub hub_token: String,
    #[arg(long, env, default_value_t = 4096)]
    pub n_ctx: u32,
    #[arg(long, env, default_value_t = 512)]
    pub n_batch: u32,
    /// Layers offloaded to the GPU; the default offloads the whole model.
    #[arg(long, env, default_value_t = 999)]
    pub n_gpu_layers: u32,
    #[arg(long, env = "SAMPLING_TEMP", default_value_t = 0.6)]
    pub temp: f32,
    #[arg(long, env, default_value_t = 0.9)]
    pub top_p: f32,
    #[arg(long, env, default_value_t = 0.05)]
    pub min_p: f32,
    #[arg(long, env, default_value_t = 1.1)]
    pub repeat_penalty: f32,
    #[arg(long, env, default_value_t = 120)]
    pub generation_timeout_secs: u64,
    /// Install the Prometheus recorder and serve `/metrics`.
    #[arg(long, env, default_value_t = true, action = clap::ArgAction::Set)]
    pub metrics: bool,
}

impl Config {
    pub fn artifacts(&self) -> ArtifactLocations {
        ArtifactLocations {
            model: self.model_path.clone(),
            tokenizer: self.tokenizer_path.clone(),
            hub_token: Some(self.hub_token.clone()).filter(|t| !t.is_empty()),
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            n_ctx: self.n_ctx,
            n_batch: self.n_batch,
            n_gpu_layers: self.n_gpu_layers,
            sampling: SamplingParams {
                temp: self.temp,
                top_p: self.top_p,
                min_p: self.min_p,
                repeat_penalty: self.repeat_penalty,
            },
        }
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}
