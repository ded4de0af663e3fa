use super::{ArtifactLocations, LlmBackend, SamplingParams};
use crate::error::{ArtifactLoadError, GenerationError};
use crate::util::{resolve_gguf, resolve_tokenizer};

/// Runtime knobs for the llama.cpp backend.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    pub n_ctx: u32,
    pub n_batch: u32,
    pub n_gpu_layers: u32,
    pub sampling: SamplingParams,
}

// Without the `llama` feature there is no way to run a local model: loading
// still checks the artifact locations, then reports the backend as disabled.
#[cfg(not(feature = "llama"))]
#[derive(Clone, Debug)]
pub struct LlamaBackend {
    _unconstructible: (),
}

#[cfg(not(feature = "llama"))]
impl LlamaBackend {
    pub fn load(loc: &ArtifactLocations, _opts: &LoadOptions) -> Result<Self, ArtifactLoadError> {
        resolve_gguf(&loc.model)?;
        resolve_tokenizer(&loc.tokenizer)?;
        Err(ArtifactLoadError::BackendDisabled)
    }
}

#[cfg(not(feature = "llama"))]
#[async_trait::async_trait]
impl LlmBackend for LlamaBackend {
    async fn generate(&self, _prompt: &str, _max_length: usize) -> Result<String, GenerationError> {
        Err(GenerationError::Backend("built without the `llama` feature".into()))
    }
}


// Real llama.cpp backend using `llama-cpp-2` (enabled with feature `llama`).
#[cfg(feature = "llama")]
mod real_backend {
    use super::*;
    use llama_cpp_2::context::params::LlamaContextParams;
    use llama_cpp_2::llama_backend::LlamaBackend as LLBackend;
    use llama_cpp_2::llama_batch::LlamaBatch;
    use llama_cpp_2::model::params::LlamaModelParams;
    use llama_cpp_2::model::{LlamaModel, Special};
    use llama_cpp_2::sampling::LlamaSampler;
    use llama_cpp_2::token::LlamaToken;
    use llama_cpp_2::{send_logs_to_tracing, LogOptions};
    use parking_lot::Mutex;
    use encoding_rs::{CoderResult, Decoder};
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;
    use tokenizers::Tokenizer;
    use tracing::{debug, info};

    struct Inner {
        backend: LLBackend,
        model: LlamaModel,
        tokenizer: Tokenizer,
        opts: LoadOptions,
        // one generation at a time per loaded model
        busy: Mutex<()>,
    }

    #[derive(Clone)]
    pub struct LlamaBackend {
        inner: Arc<Inner>,
    }

    /// Raised when the awaiting request goes away (timeout or client disconnect).
    struct CancelOnDrop(Arc<AtomicBool>);

    impl Drop for CancelOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::Relaxed);
        }
    }

    fn abandoned() -> GenerationError {
        GenerationError::Aborted("request abandoned before generation finished".into())
    }

    /// Decode `bytes` into `out`, growing it as needed; `last` flushes any pending partial sequence.
    fn append_utf8(decoder: &mut Decoder, mut bytes: &[u8], out: &mut String, last: bool) {
        loop {
            if let Some(n) = decoder.max_utf8_buffer_length(bytes.len()) {
                out.reserve(n);
            }
            let (result, read, _) = decoder.decode_to_string(bytes, out, last);
            bytes = &bytes[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => out.reserve(bytes.len().max(1) * 3 + 4),
            }
        }
    }

    fn backend_err<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> GenerationError {
        move |e| GenerationError::Backend(format!("{what}: {e}"))
    }

    impl LlamaBackend {
        /// Load the GGUF model and the tokenizer once; both stay resident for the process lifetime.
        pub fn load(loc: &ArtifactLocations, opts: &LoadOptions) -> Result<Self, ArtifactLoadError> {
            let model_path = resolve_gguf(&loc.model)?;
            let tokenizer_path = resolve_tokenizer(&loc.tokenizer)?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
                ArtifactLoadError::Tokenizer { path: tokenizer_path.clone(), reason: e.to_string() }
            })?;

            // route llama.cpp logs to tracing so they appear in server logs when RUST_LOG is set
            send_logs_to_tracing(LogOptions::default());

            let model_err = |reason: String| ArtifactLoadError::Model { path: model_path.clone(), reason };
            let backend = LLBackend::init().map_err(|e| model_err(format!("init llama backend: {e}")))?;

            let mut model_params = LlamaModelParams::default();
            if opts.n_gpu_layers > 0 {
                model_params = model_params.with_n_gpu_layers(opts.n_gpu_layers);
            }
            let model = LlamaModel::load_from_file(&backend, &model_path, &model_params)
                .map_err(|e| model_err(e.to_string()))?;

            let model_vocab = model.n_vocab().max(0) as usize;
            let tokenizer_vocab = tokenizer.get_vocab_size(false);
            if tokenizer_vocab > model_vocab {
                return Err(ArtifactLoadError::Incompatible { tokenizer_vocab, model_vocab });
            }

            info!(
                model = %model_path.display(),
                tokenizer = %tokenizer_path.display(),
                model_vocab,
                tokenizer_vocab,
                n_gpu_layers = opts.n_gpu_layers,
                hub_token = loc.hub_token.is_some(),
                "loaded model and tokenizer"
            );

            Ok(Self {
                inner: Arc::new(Inner { backend, model, tokenizer, opts: opts.clone(), busy: Mutex::new(()) }),
            })
        }
    }

    impl Inner {
        fn generate_blocking(
            &self,
            prompt: &str,
            max_length: usize,
            cancelled: &AtomicBool,
        ) -> Result<String, GenerationError> {
            let _busy = self.busy.lock();
            if cancelled.load(Ordering::Relaxed) {
                return Err(abandoned());
            }
            let started = Instant::now();

            let encoding = self.tokenizer.encode(prompt, true).map_err(backend_err("tokenize prompt"))?;
            let ids = encoding.get_ids();
            if ids.is_empty() {
                return Err(GenerationError::Backend("tokenizer produced no tokens".into()));
            }
            let n_vocab = self.model.n_vocab().max(0) as u32;
            if let Some(id) = ids.iter().find(|&&id| id >= n_vocab) {
                return Err(GenerationError::Backend(format!("token id {id} outside model vocabulary")));
            }

            // max_length counts prompt tokens too
            let budget = match NonZeroU32::new(self.opts.n_ctx) {
                Some(n_ctx) => max_length.min(n_ctx.get() as usize),
                None => max_length,
            };
            if ids.len() >= budget {
                return Err(GenerationError::PromptTooLong { prompt_tokens: ids.len(), max_length });
            }
            let max_new = budget - ids.len();

            let threads = num_cpus::get() as i32;
            let n_batch = self.opts.n_batch.max(ids.len() as u32);
            let ctx_params = LlamaContextParams::default()
                .with_n_ctx(NonZeroU32::new(self.opts.n_ctx))
                .with_n_batch(n_batch)
                .with_n_threads(threads)
                .with_n_threads_batch(threads);
            let mut ctx = self
                .model
                .new_context(&self.backend, ctx_params)
                .map_err(backend_err("create llama context"))?;

            let mut batch = LlamaBatch::new(n_batch as usize, 1);
            let last_index = (ids.len() - 1) as i32;
            for (i, &id) in (0_i32..).zip(ids.iter()) {
                batch
                    .add(LlamaToken::new(id as i32), i, &[0], i == last_index)
                    .map_err(backend_err("batch prompt"))?;
            }
            ctx.decode(&mut batch).map_err(backend_err("decode prompt"))?;

            let p = &self.opts.sampling;
            let mut sampler = LlamaSampler::chain_simple([
                LlamaSampler::temp(p.temp),
                LlamaSampler::top_p(p.top_p, 1),
                LlamaSampler::min_p(p.min_p, 1),
                LlamaSampler::penalties(64, p.repeat_penalty, 0.0, 0.0),
                LlamaSampler::greedy(),
            ]);

            let mut n_cur = batch.n_tokens();
            let mut n_new = 0usize;
            let mut out = String::new();
            let mut decoder = encoding_rs::UTF_8.new_decoder();

            while n_new < max_new {
                if cancelled.load(Ordering::Relaxed) {
                    return Err(abandoned());
                }
                let token = sampler.sample(&ctx, batch.n_tokens() - 1);
                sampler.accept(token);

                if self.model.is_eog_token(token) {
                    break;
                }

                let bytes = self
                    .model
                    .token_to_bytes(token, Special::Tokenize)
                    .map_err(backend_err("detokenize"))?;
                append_utf8(&mut decoder, &bytes, &mut out, false);

                batch.clear();
                batch.add(token, n_cur, &[0], true).map_err(backend_err("batch token"))?;
                n_cur += 1;
                ctx.decode(&mut batch).map_err(backend_err("decode step"))?;
                n_new += 1;
            }

            append_utf8(&mut decoder, &[], &mut out, true);

            debug!(
                prompt_tokens = ids.len(),
                new_tokens = n_new,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "generation finished"
            );

            Ok(format!("{prompt}{out}"))
        }
    }

    #[async_trait::async_trait]
    impl LlmBackend for LlamaBackend {
        async fn generate(&self, prompt: &str, max_length: usize) -> Result<String, GenerationError> {
            let inner = self.inner.clone();
            let prompt = prompt.to_string();
            let cancelled = Arc::new(AtomicBool::new(false));
            let _cancel = CancelOnDrop(cancelled.clone());
            tokio::task::spawn_blocking(move || inner.generate_blocking(&prompt, max_length, &cancelled))
                .await
                .map_err(|e| GenerationError::Aborted(e.to_string()))?
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn long_tokens_decode_whole() {
            let token = format!("{}, SOB", "-".repeat(40));
            let mut decoder = encoding_rs::UTF_8.new_decoder();
            let mut out = String::new();
            append_utf8(&mut decoder, token.as_bytes(), &mut out, false);
            append_utf8(&mut decoder, &[], &mut out, true);
            assert_eq!(out, token);
        }

        #[test]
        fn multibyte_char_split_across_tokens() {
            let bytes = "é, 38.9°C".as_bytes();
            let mut decoder = encoding_rs::UTF_8.new_decoder();
            let mut out = String::new();
            append_utf8(&mut decoder, &bytes[..1], &mut out, false);
            append_utf8(&mut decoder, &bytes[1..], &mut out, false);
            append_utf8(&mut decoder, &[], &mut out, true);
            assert_eq!(out, "é, 38.9°C");
        }

        #[test]
        fn dangling_partial_sequence_is_flushed() {
            let mut decoder = encoding_rs::UTF_8.new_decoder();
            let mut out = String::new();
            append_utf8(&mut decoder, b"SOB\xc3", &mut out, false);
            append_utf8(&mut decoder, &[], &mut out, true);
            assert_eq!(out, "SOB\u{FFFD}");
        }

        #[test]
        fn dropping_the_guard_cancels() {
            let flag = Arc::new(AtomicBool::new(false));
            drop(CancelOnDrop(flag.clone()));
            assert!(flag.load(Ordering::Relaxed));
        }
    }
}

#[cfg(feature = "llama")]
pub use real_backend::LlamaBackend;
