use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use metrics_exporter_prometheus::PrometheusBuilder;
use note_keywords::{api, config::Config, model::llama::LlamaBackend, processor::Processor};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};


#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
dotenv().ok();
let cfg = Config::parse();


// logs
let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
fmt().with_env_filter(filter).init();


let metrics = if cfg.metrics {
Some(PrometheusBuilder::new().install_recorder().context("install prometheus recorder")?)
} else {
None
};


// model + tokenizer are loaded once; without them there is nothing to serve
let backend = LlamaBackend::load(&cfg.artifacts(), &cfg.load_options())
.inspect_err(|e| tracing::error!(error = %e, "cannot load model artifacts"))
.context("load model artifacts")?;
let processor = Processor::new(backend, cfg.generation_timeout());


let app = api::routes(processor, metrics);
let addr: SocketAddr = cfg.bind_addr.parse()?;


tracing::info!(%addr, "listening");
axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
.with_graceful_shutdown(shutdown_signal())
.await?;
Ok(())
}


async fn shutdown_signal() {
let ctrl_c = async {
let _ = tokio::signal::ctrl_c().await;
};
#[cfg(unix)]
let terminate = async {
if let Ok(mut sig) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
sig.recv().await;
}
};
#[cfg(not(unix))]
let terminate = std::future::pending::<()>();
tokio::select! {
_ = ctrl_c => {},
_ = terminate => {},
}
tracing::info!("shutting down");
}
