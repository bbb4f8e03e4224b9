//! MCP server initialization for stdio and SSE transports.
//!
//! Provides [`serve_stdio`] and [`serve_sse`] entry points that wire up the embedding
//! engine, LLM judge, generator and corpus provider into a running server.

use crate::tools::{ScribeTools, Services};
use anyhow::{Context, Result};
use rmcp::ServiceExt;
use scribetwin::config::ScribeConfig;
use scribetwin::corpus::{CorpusProvider, RssCorpusProvider};
use scribetwin::embedding::engine::EmbeddingEngine;
use scribetwin::judge::LlmJudge;
use scribetwin::llm::gemini::GeminiClient;
use scribetwin::llm::TextGenerator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared setup: validate config, create the embedding engine, generator, judge and
/// corpus provider. Everything is wrapped in `Arc` for sharing across sessions.
pub fn setup_services(config: ScribeConfig) -> Result<Services> {
    config.validate()?;

    let engine = Arc::new(EmbeddingEngine::from_config(&config)?);
    tracing::info!(provider = %config.embedding.provider, "embedding engine ready");

    let generator: Arc<dyn TextGenerator> =
        Arc::new(GeminiClient::from_config(&config).context("failed to create Gemini client")?);
    let judge = Arc::new(LlmJudge::from_config(Arc::clone(&generator), &config));
    let corpus: Arc<dyn CorpusProvider> = Arc::new(RssCorpusProvider::from_config(&config)?);
    tracing::info!(model = %config.generation.model, judge = %config.scoring.judge_model, "generation ready");

    Ok(Services {
        engine,
        judge,
        generator,
        corpus,
        config: Arc::new(config),
        shutdown: CancellationToken::new(),
    })
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: ScribeConfig) -> Result<()> {
    tracing::info!("starting scribetwin MCP server on stdio");

    let services = setup_services(config)?;
    let shutdown = services.shutdown.clone();

    let tools = ScribeTools::new(services);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    shutdown.cancel();
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP (SSE) transport.
pub async fn serve_sse(config: ScribeConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting scribetwin MCP server on SSE/HTTP");

    let services = setup_services(config)?;
    let shutdown = services.shutdown.clone();

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(ScribeTools::new(services.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down SSE server");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
