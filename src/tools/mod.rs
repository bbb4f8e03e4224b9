pub mod match_author;
pub mod refine_style;
pub mod style_features;

use match_author::MatchAuthorParams;
use refine_style::RefineStyleParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;
use style_features::StyleFeaturesParams;
use tokio_util::sync::CancellationToken;

use scribetwin::config::ScribeConfig;
use scribetwin::corpus::{Corpus, CorpusProvider};
use scribetwin::embedding::engine::EmbeddingEngine;
use scribetwin::judge::LlmJudge;
use scribetwin::llm::TextGenerator;
use scribetwin::refine::StyleRefiner;
use scribetwin::style::{describe_style, extract_style_features};

/// Long-lived handles shared by every tool call.
///
/// Centroids are deliberately absent: each call builds its own from the corpus it
/// fetched.
#[derive(Clone)]
pub struct Services {
    pub engine: Arc<EmbeddingEngine>,
    pub judge: Arc<LlmJudge>,
    pub generator: Arc<dyn TextGenerator>,
    pub corpus: Arc<dyn CorpusProvider>,
    pub config: Arc<ScribeConfig>,
    /// Cancelled on server shutdown; each refinement runs under a child token.
    pub shutdown: CancellationToken,
}

/// The scribetwin MCP tool handler.
#[derive(Clone)]
pub struct ScribeTools {
    tool_router: ToolRouter<Self>,
    services: Services,
}

#[tool_router]
impl ScribeTools {
    pub fn new(services: Services) -> Self {
        Self {
            tool_router: Self::tool_router(),
            services,
        }
    }

    fn feed_url(&self, requested: Option<String>) -> Result<String, String> {
        requested
            .or_else(|| Some(self.services.config.corpus.feed_url.clone()))
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| "feed_url is required (none configured)".to_string())
    }

    async fn fetch_corpus(&self, url: &str) -> Result<Corpus, String> {
        self.services
            .corpus
            .fetch(url)
            .await
            .map_err(|e| format!("{}: {e}", e.kind()))
    }

    /// Rewrite a draft toward the closest author's style.
    #[tool(description = "Rewrite a blog draft to match the writing style of the closest author in a feed. Returns the styled text, similarity scores, score history and stop reason.")]
    async fn refine_style(
        &self,
        Parameters(params): Parameters<RefineStyleParams>,
    ) -> Result<String, String> {
        let url = self.feed_url(params.feed_url)?;

        let mut config = (*self.services.config).clone();
        if let Some(threshold) = params.threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err("threshold must be between 0.0 and 1.0".into());
            }
            config.refinement.similarity_threshold = threshold;
        }
        if let Some(max_attempts) = params.max_attempts {
            config.refinement.max_rewrite_attempts = max_attempts;
        }

        tracing::info!(
            draft_len = params.draft.len(),
            url = %url,
            threshold = config.refinement.similarity_threshold,
            "refine_style called"
        );

        let refiner = StyleRefiner::new(
            Arc::clone(&self.services.engine),
            Arc::clone(&self.services.judge),
            Arc::clone(&self.services.generator),
            &config,
        );
        let cancel = self.services.shutdown.child_token();
        let outcome = refiner
            .refine_from_feed(&params.draft, self.services.corpus.as_ref(), &url, &cancel)
            .await;

        tracing::info!(
            run_id = %outcome.run_id,
            success = outcome.success,
            attempts = outcome.rewrite_attempts,
            score = outcome.style_similarity,
            "refine_style finished"
        );
        serde_json::to_string(&outcome).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Rank authors by embedding similarity to a text.
    #[tool(description = "Find which author in a feed writes most like the given text, using embedding centroids. Returns the closest author and every author's cosine similarity.")]
    async fn match_author(
        &self,
        Parameters(params): Parameters<MatchAuthorParams>,
    ) -> Result<String, String> {
        if params.text.trim().is_empty() {
            return Err("text must not be empty".into());
        }
        let url = self.feed_url(params.feed_url)?;
        tracing::info!(text_len = params.text.len(), url = %url, "match_author called");

        let corpus = self.fetch_corpus(&url).await?;
        let engine = Arc::clone(&self.services.engine);
        let text = params.text;

        let (closest, similarity, scores) = tokio::task::spawn_blocking(move || {
            let centroids = engine.build_centroids(&corpus)?;
            let (closest, similarity) = engine.find_closest_author(&centroids, &text)?;
            let scores = centroids
                .authors()
                .into_iter()
                .map(|author| {
                    let score = engine.similarity_to_author(&centroids, &text, &author)?;
                    Ok(serde_json::json!({ "author": author, "similarity": score }))
                })
                .collect::<scribetwin::error::Result<Vec<_>>>()?;
            Ok::<_, scribetwin::error::StyleError>((closest, similarity, scores))
        })
        .await
        .map_err(|e| format!("embedding task failed: {e}"))?
        .map_err(|e| format!("{}: {e}", e.kind()))?;

        Ok(serde_json::json!({
            "closest_author": closest,
            "similarity": similarity,
            "authors": scores,
        })
        .to_string())
    }

    /// Measure the stylistic features of a text.
    #[tool(description = "Extract stylistic features of a text (sentence lengths, punctuation, formatting, tone markers) and a one-line style description.")]
    async fn style_features(
        &self,
        Parameters(params): Parameters<StyleFeaturesParams>,
    ) -> Result<String, String> {
        tracing::info!(text_len = params.text.len(), "style_features called");
        let features = extract_style_features(&params.text);
        Ok(serde_json::json!({
            "description": describe_style(&features),
            "features": features,
        })
        .to_string())
    }
}

#[tool_handler]
impl ServerHandler for ScribeTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "scribetwin rewrites blog drafts toward an author's style. Use match_author \
                 to see which author a text resembles, style_features to inspect a text, \
                 and refine_style to run the rewrite loop."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
