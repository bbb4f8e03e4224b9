use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use scribetwin::config::ScribeConfig;
use scribetwin::corpus::RssCorpusProvider;
use scribetwin::embedding::engine::EmbeddingEngine;
use scribetwin::judge::LlmJudge;
use scribetwin::llm::gemini::GeminiClient;
use scribetwin::llm::TextGenerator;
use scribetwin::refine::{RefinementOutcome, StyleRefiner};

/// Options for `scribetwin refine`.
pub struct RefineArgs<'a> {
    pub draft: &'a Path,
    pub feed: Option<String>,
    pub threshold: Option<f64>,
    pub max_attempts: Option<usize>,
    pub json: bool,
}

/// Refine a draft file against a feed and print the result.
pub async fn refine(mut config: ScribeConfig, args: RefineArgs<'_>) -> Result<()> {
    if let Some(threshold) = args.threshold {
        config.refinement.similarity_threshold = threshold;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.refinement.max_rewrite_attempts = max_attempts;
    }
    config.validate()?;

    let url = args.feed.unwrap_or_else(|| config.corpus.feed_url.clone());
    anyhow::ensure!(!url.trim().is_empty(), "no feed URL given and none configured");

    let draft = super::read_text(args.draft)?;

    let engine = Arc::new(EmbeddingEngine::from_config(&config)?);
    let generator: Arc<dyn TextGenerator> =
        Arc::new(GeminiClient::from_config(&config).context("failed to create Gemini client")?);
    let judge = Arc::new(LlmJudge::from_config(Arc::clone(&generator), &config));
    let provider = RssCorpusProvider::from_config(&config)?;
    let refiner = StyleRefiner::new(engine, judge, generator, &config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping after the current stage");
            on_interrupt.cancel();
        }
    });

    let outcome = refiner.refine_from_feed(&draft, &provider, &url, &cancel).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    anyhow::ensure!(
        outcome.success,
        "refinement failed: {}",
        outcome.error.as_deref().unwrap_or("unknown error")
    );
    Ok(())
}

fn fmt_score(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_string(), |s| format!("{s:.4}"))
}

fn print_outcome(outcome: &RefinementOutcome) {
    println!("Style Refinement");
    println!("{}", "=".repeat(40));
    println!("  Run:                 {}", outcome.run_id);
    println!(
        "  Closest author:      {}",
        outcome.closest_author.as_deref().unwrap_or("-")
    );
    println!("  Initial similarity:  {}", fmt_score(outcome.initial_similarity));
    println!("  Final similarity:    {:.4}", outcome.style_similarity);
    println!("    embedding:         {}", fmt_score(outcome.embedding_similarity));
    println!("    llm:               {}", fmt_score(outcome.llm_similarity));
    println!("  Rewrites accepted:   {}", outcome.rewrite_attempts);
    println!("  Stop reason:         {:?}", outcome.stop_reason);
    let history = outcome
        .improvement_history
        .iter()
        .map(|s| format!("{s:.4}"))
        .collect::<Vec<_>>()
        .join(" -> ");
    if !history.is_empty() {
        println!("  History:             {history}");
    }
    if let Some(ref warning) = outcome.warning {
        println!("  Warning:             {warning}");
    }
    if let Some(ref error) = outcome.error {
        println!("  Error:               {error}");
    }
    println!();
    println!("{}", outcome.styled_blog);
}
