// Grin pool job engine
//
// Template feed -> job repository -> sessions; solved shares -> Redis.

use anyhow::{Context, Result};
use axum::{extract::State, http::{header, StatusCode}, response::IntoResponse, routing::get, Json};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use grin_pool::chain::{ChainPow, Grin};
use grin_pool::config::Config;
use grin_pool::feed::TemplateFeed;
use grin_pool::jobs::JobRepository;
use grin_pool::metrics::prometheus as metrics;
use grin_pool::shares::{PolicyFlags, RedisSolvedShareSink, ResultReporter, ShareProcessor};
use grin_pool::stratum::GrinSessionFactory;

#[derive(Clone)]
struct ApiState {
    repository: Arc<JobRepository<Grin>>,
    sessions: Arc<GrinSessionFactory<Grin>>,
}

async fn api_health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let latest = state.repository.latest();
    Json(json!({
        "status": "ok",
        "chain": Grin::NAME,
        "chainId": state.repository.chain_id(),
        "height": state.repository.current_height(),
        "jobs": state.repository.len(),
        "latestJobId": latest.as_ref().map(|j| format!("{:x}", j.job_id())),
        "latestJobStale": latest.as_ref().map(|j| j.is_stale()),
        "sessions": state.sessions.live_sessions(),
    }))
}

async fn api_metrics() -> impl IntoResponse {
    let body = metrics::render();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("SIGTERM, shutting down"),
                    _ = tokio::signal::ctrl_c() => tracing::info!("SIGINT, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("SIGINT, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Ctrl+C, shutting down");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cfg = Config::load().context("loading pool config")?;
    tracing::info!(
        "🚀 Grin pool job engine: chain_id={}, redis={}, templates={}",
        cfg.chain_id,
        cfg.redis_url,
        cfg.template_channel
    );

    let repository = Arc::new(JobRepository::<Grin>::new(cfg.chain_id, &cfg.jobs));

    let sink = RedisSolvedShareSink::new(&cfg.redis_url, &cfg.solved_share_key, &cfg.solved_share_channel)?;
    let reporter = ResultReporter::new(Arc::new(sink));
    let processor = Arc::new(ShareProcessor::new(
        repository.clone(),
        reporter,
        PolicyFlags::from(&cfg.policy),
    ));
    let sessions = Arc::new(GrinSessionFactory::new(processor, &cfg.session));

    let feed = TemplateFeed::new(repository.clone(), &cfg.redis_url, &cfg.template_channel)?;
    tokio::spawn(feed.run());

    let api_state = ApiState { repository, sessions };
    let api = axum::Router::new()
        .route("/health", get(api_health))
        .route("/metrics", get(api_metrics))
        .with_state(api_state);

    let listener = tokio::net::TcpListener::bind(&cfg.api_listen)
        .await
        .with_context(|| format!("binding {}", cfg.api_listen))?;

    tracing::info!("📡 API listening on {}", cfg.api_listen);
    axum::serve(listener, api)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("🏁 Pool shut down cleanly");
    Ok(())
}
