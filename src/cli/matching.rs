use anyhow::Result;
use std::path::Path;

use scribetwin::config::ScribeConfig;
use scribetwin::corpus::{CorpusProvider, RssCorpusProvider};
use scribetwin::embedding::engine::EmbeddingEngine;

/// Print every author's similarity to a text, closest first.
pub async fn match_author(config: &ScribeConfig, text: &Path, feed: Option<String>) -> Result<()> {
    let url = feed.unwrap_or_else(|| config.corpus.feed_url.clone());
    anyhow::ensure!(!url.trim().is_empty(), "no feed URL given and none configured");

    let text = super::read_text(text)?;
    anyhow::ensure!(!text.trim().is_empty(), "text is empty");

    let corpus = RssCorpusProvider::from_config(config)?.fetch(&url).await?;
    let engine = EmbeddingEngine::from_config(config)?;

    let ranked = tokio::task::spawn_blocking(move || -> Result<_> {
        let centroids = engine.build_centroids(&corpus)?;
        let (closest, _) = engine.find_closest_author(&centroids, &text)?;
        let mut ranked = Vec::with_capacity(centroids.len());
        for author in centroids.authors() {
            let score = engine.similarity_to_author(&centroids, &text, &author)?;
            ranked.push((author, score));
        }
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok((closest, ranked))
    })
    .await??;

    let (closest, ranked) = ranked;
    println!("Closest author: {closest}");
    println!("{}", "=".repeat(40));
    for (author, score) in ranked {
        println!("  {:<24} {score:.4}", author);
    }
    Ok(())
}
