use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use dgb_core::{
    config::{parse_listen_addr, Config},
    pipeline::CompletionPipeline,
    tasks::TaskSupervisor,
};
use dgb_discord::{build_router, AppState, DiscordFollowup};
use dgb_openai::OpenAiClient;

#[derive(Debug, Parser)]
#[command(name = "dgb", about = "Discord interaction gateway answering /chat with OpenAI")]
struct Cli {
    /// Listen address (`host:port`, or `:port` for all interfaces). Overrides LISTEN_ADDR.
    #[arg(short = 'p', long = "listen")]
    listen: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // Env mutation must happen before any runtime threads exist.
    dgb_core::config::load_dotenv()?;
    let cli = Cli::parse();
    dgb_core::logging::init("dgb")?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?
        .block_on(serve(cli))
}

async fn serve(cli: Cli) -> anyhow::Result<()> {
    let mut cfg = Config::load()?;
    if let Some(raw) = &cli.listen {
        cfg.listen_addr = parse_listen_addr(raw)?;
    }
    let cfg = Arc::new(cfg);

    let openai = Arc::new(OpenAiClient::from_config(&cfg));
    let pipeline = Arc::new(CompletionPipeline::new(
        openai.clone(),
        openai,
        cfg.persona_prompts.clone(),
        cfg.completion_timeout,
    ));
    let followup = Arc::new(DiscordFollowup::from_config(&cfg));
    let tasks = TaskSupervisor::new();
    let state = AppState::new(cfg.clone(), pipeline, followup, tasks.clone())?;

    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
    info!(addr = %cfg.listen_addr, "listening for interactions");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    info!(in_flight = tasks.in_flight(), "draining follow-up tasks");
    if !tasks.drain(cfg.shutdown_grace).await {
        warn!(
            grace_secs = cfg.shutdown_grace.as_secs(),
            "follow-up tasks cancelled after shutdown grace period"
        );
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
