//! Note in, keywords out: prompt construction, one generation, parsing.

use crate::error::{GenerationError, RunError};
use crate::extract::{extract_keywords, Extraction};
use crate::model::LlmBackend;
use crate::prompt::{build_prompt, INST_CLOSE};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Total sequence budget (prompt + continuation) for every generation.
pub const MAX_LENGTH: usize = 600;

pub struct Processor<B> {
    backend: B,
    timeout: Duration,
    // requests queue here, inside the timeout, so an abandoned one never reaches the model
    turn: Mutex<()>,
}

impl<B: LlmBackend> Processor<B> {
    pub fn new(backend: B, timeout: Duration) -> Self {
        Self { backend, timeout, turn: Mutex::new(()) }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one note through the model. Generation and parse failures are
    /// returned to the caller untouched; nothing is retried.
    #[instrument(skip_all, fields(note_chars = note.chars().count()))]
    pub async fn run(&self, note: &str) -> Result<Extraction, RunError> {
        if note.contains(INST_CLOSE) {
            warn!("note contains the instruction delimiter; keywords may be cut from the echoed note");
        }
        let prompt = build_prompt(note);

        let started = Instant::now();
        let generate = async {
            let _turn = self.turn.lock().await;
            self.backend.generate(&prompt, MAX_LENGTH).await
        };
        let generated = tokio::time::timeout(self.timeout, generate)
            .await
            .unwrap_or(Err(GenerationError::Timeout(self.timeout)));
        metrics::histogram!("generation_seconds").record(started.elapsed().as_secs_f64());

        let result = generated
            .map_err(RunError::from)
            .and_then(|text| extract_keywords(&text).map_err(RunError::from));

        match &result {
            Ok(extraction) => {
                metrics::counter!("keyword_requests_total", "outcome" => "ok").increment(1);
                metrics::histogram!("keywords_extracted").record(extraction.keywords.len() as f64);
                info!(
                    keywords = extraction.keywords.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "extracted keywords"
                );
            }
            Err(e) => {
                metrics::counter!("keyword_requests_total", "outcome" => e.kind()).increment(1);
                warn!(kind = e.kind(), error = %e, "keyword extraction failed");
            }
        }
        result
    }
}
