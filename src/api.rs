use crate::{
    error::{GenerationError, RunError},
    model::LlmBackend,
    page::{self, Outcome},
    processor::Processor,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct NoteReq {
    pub note: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

pub struct AppState<B> {
    pub processor: Processor<B>,
    pub metrics: Option<PrometheusHandle>,
}

pub fn routes<B: LlmBackend>(processor: Processor<B>, metrics: Option<PrometheusHandle>) -> Router {
    let state = Arc::new(AppState { processor, metrics });
    Router::new()
        .route("/", get(index).post(submit_form::<B>))
        .route("/v1/keywords", post(extract_json::<B>))
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(render_metrics::<B>))
        .with_state(state)
}

fn status_for(e: &RunError) -> StatusCode {
    match e {
        RunError::Generation(GenerationError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        RunError::Generation(_) => StatusCode::SERVICE_UNAVAILABLE,
        RunError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

async fn index() -> Html<String> {
    Html(page::render("", Outcome::Idle))
}

async fn submit_form<B: LlmBackend>(
    State(state): State<Arc<AppState<B>>>,
    Form(req): Form<NoteReq>,
) -> Response {
    match state.processor.run(&req.note).await {
        Ok(extraction) => Html(page::render(&req.note, Outcome::Displayed(&extraction))).into_response(),
        Err(e) => (status_for(&e), Html(page::render(&req.note, Outcome::Failed(&e)))).into_response(),
    }
}

async fn extract_json<B: LlmBackend>(
    State(state): State<Arc<AppState<B>>>,
    Json(req): Json<NoteReq>,
) -> Response {
    match state.processor.run(&req.note).await {
        Ok(extraction) => Json(extraction).into_response(),
        Err(e) => {
            let body = ErrorBody { error: e.kind(), message: e.to_string() };
            (status_for(&e), Json(body)).into_response()
        }
    }
}

async fn render_metrics<B: LlmBackend>(State(state): State<Arc<AppState<B>>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
