//! The style-refinement loop.
//!
//! One call to [`StyleRefiner::refine`] is one run: it builds centroids from its own
//! corpus snapshot, picks the closest author, scores the draft, then rewrites until the
//! blended score clears the threshold, stops improving, or the attempt budget runs out.
//!
//! Runs never return `Err`. Fatal conditions (bad corpus, no centroids, cancellation)
//! come back as a [`RefinementOutcome`] with `success = false` and an `error` message,
//! so a transport can always render something.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::{ContentConfig, RefinementConfig, ScoringConfig, ScribeConfig, StyleConfig};
use crate::content::validate_content;
use crate::corpus::{Corpus, CorpusProvider};
use crate::embedding::engine::EmbeddingEngine;
use crate::error::{Result, StyleError};
use crate::judge::LlmJudge;
use crate::llm::TextGenerator;
use crate::rewrite::Rewriter;
use crate::scoring::{MultiModalScorer, SimilarityResult};
use crate::style::{describe_style, extract_style_features, select_diverse_examples};
use crate::text::{truncate_chars, word_count};

/// Absorbs float noise in `new - current` so an improvement of exactly
/// `min_improvement` counts as a plateau.
const PLATEAU_EPSILON: f64 = 1e-9;

pub const THRESHOLD_NOT_REACHED: &str = "Similarity threshold not reached";

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EmptyDraft,
    ThresholdMet,
    MaxAttempts,
    Plateau,
    EmptyRewrite,
    RewriteFailed,
    ScoringFailed,
    MissingStyleExamples,
    Cancelled,
    Failed,
}

/// Result of one refinement run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementOutcome {
    pub styled_blog: String,
    pub style_similarity: f64,
    pub embedding_similarity: Option<f64>,
    pub llm_similarity: Option<f64>,
    /// Accepted rewrites only.
    pub rewrite_attempts: usize,
    pub closest_author: Option<String>,
    pub initial_similarity: Option<f64>,
    /// Initial score followed by the score of each accepted rewrite.
    pub improvement_history: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub success: bool,
    pub stop_reason: StopReason,
    pub run_id: String,
}

impl RefinementOutcome {
    fn failure(styled_blog: String, error: String, stop_reason: StopReason, run_id: &str) -> Self {
        Self {
            styled_blog,
            style_similarity: 0.0,
            embedding_similarity: None,
            llm_similarity: None,
            rewrite_attempts: 0,
            closest_author: None,
            initial_similarity: None,
            improvement_history: Vec::new(),
            warning: None,
            error: Some(error),
            success: false,
            stop_reason,
            run_id: run_id.to_string(),
        }
    }

    fn from_error(draft: &str, err: &StyleError, run_id: &str) -> Self {
        let reason = match err {
            StyleError::Cancelled => StopReason::Cancelled,
            _ => StopReason::Failed,
        };
        Self::failure(draft.to_string(), format!("{}: {err}", err.kind()), reason, run_id)
    }
}

/// Per-run mutable state. Never shared between runs.
struct RefinementState {
    text: String,
    score: SimilarityResult,
    attempts: usize,
    history: Vec<f64>,
}

/// Everything a run needs once its author is fixed.
struct RunContext<'a> {
    scorer: MultiModalScorer,
    author: String,
    examples: Vec<String>,
    style_description: String,
    cancel: &'a CancellationToken,
}

pub struct StyleRefiner {
    engine: Arc<EmbeddingEngine>,
    judge: Arc<LlmJudge>,
    rewriter: Rewriter,
    refinement: RefinementConfig,
    style: StyleConfig,
    content: ContentConfig,
    scoring: ScoringConfig,
}

impl StyleRefiner {
    /// `engine` and `judge` are shared handles; their caches may be used by other runs
    /// concurrently.
    pub fn new(
        engine: Arc<EmbeddingEngine>,
        judge: Arc<LlmJudge>,
        generator: Arc<dyn TextGenerator>,
        config: &ScribeConfig,
    ) -> Self {
        Self {
            engine,
            judge,
            rewriter: Rewriter::new(generator, config),
            refinement: config.refinement.clone(),
            style: config.style.clone(),
            content: config.content.clone(),
            scoring: config.scoring.clone(),
        }
    }

    pub fn engine(&self) -> &Arc<EmbeddingEngine> {
        &self.engine
    }

    /// Fetch the corpus through `provider`, then [`refine`](Self::refine).
    pub async fn refine_from_feed(
        &self,
        draft: &str,
        provider: &dyn CorpusProvider,
        url: &str,
        cancel: &CancellationToken,
    ) -> RefinementOutcome {
        let run_id = uuid::Uuid::now_v7().to_string();
        if draft.trim().is_empty() {
            return empty_draft(&run_id);
        }

        let fetched = tokio::select! {
            _ = cancel.cancelled() => Err(StyleError::Cancelled),
            corpus = provider.fetch(url) => corpus,
        };
        match fetched {
            Ok(corpus) => self.run(draft, &corpus, cancel, run_id).await,
            Err(e) => {
                tracing::error!(run_id = %run_id, url, error = %e, "failed to fetch author corpus");
                RefinementOutcome::from_error(draft, &e, &run_id)
            }
        }
    }

    /// Refine `draft` toward the closest author in `corpus`.
    pub async fn refine(
        &self,
        draft: &str,
        corpus: &Corpus,
        cancel: &CancellationToken,
    ) -> RefinementOutcome {
        let run_id = uuid::Uuid::now_v7().to_string();
        if draft.trim().is_empty() {
            return empty_draft(&run_id);
        }
        self.run(draft, corpus, cancel, run_id).await
    }

    async fn run(
        &self,
        draft: &str,
        corpus: &Corpus,
        cancel: &CancellationToken,
        run_id: String,
    ) -> RefinementOutcome {
        let span = tracing::info_span!("refine", run_id = %run_id);
        async {
            tracing::info!(chars = draft.len(), words = word_count(draft), "starting style refinement");
            if let Err(issue) = validate_content(draft, &self.content, false) {
                tracing::warn!(%issue, "draft validation warning");
            }

            match self.run_inner(draft, corpus, cancel, &run_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, kind = e.kind(), "style refinement failed");
                    RefinementOutcome::from_error(draft, &e, &run_id)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_inner(
        &self,
        draft: &str,
        corpus: &Corpus,
        cancel: &CancellationToken,
        run_id: &str,
    ) -> Result<RefinementOutcome> {
        ensure_live(cancel)?;
        let centroids = {
            let engine = Arc::clone(&self.engine);
            let corpus = corpus.clone();
            Arc::new(blocking(move || engine.build_centroids(&corpus)).await?)
        };

        ensure_live(cancel)?;
        let (author, initial_embedding) = {
            let engine = Arc::clone(&self.engine);
            let centroids = Arc::clone(&centroids);
            let draft = draft.to_string();
            blocking(move || engine.find_closest_author(&centroids, &draft)).await?
        };

        let examples = self.style_examples(corpus.get(&author).unwrap_or(""));
        if examples.iter().all(|e| e.trim().is_empty()) {
            tracing::warn!(author = %author, "no style examples for author");
            return Ok(RefinementOutcome {
                styled_blog: draft.to_string(),
                style_similarity: initial_embedding,
                embedding_similarity: Some(initial_embedding),
                llm_similarity: None,
                rewrite_attempts: 0,
                closest_author: Some(author),
                initial_similarity: None,
                improvement_history: Vec::new(),
                warning: None,
                error: Some("No style examples available".into()),
                success: false,
                stop_reason: StopReason::MissingStyleExamples,
                run_id: run_id.to_string(),
            });
        }

        let style_description = if self.style.extract_features {
            let description = describe_style(&extract_style_features(&examples[0]));
            tracing::info!(author = %author, style = %description, "author style");
            description
        } else {
            String::new()
        };

        let ctx = RunContext {
            scorer: MultiModalScorer::new(
                Arc::clone(&self.engine),
                centroids,
                Arc::clone(&self.judge),
                self.scoring.clone(),
            ),
            author,
            examples,
            style_description,
            cancel,
        };
        self.converge(draft, ctx, run_id).await
    }

    /// Score, then rewrite until a stop condition holds.
    async fn converge(
        &self,
        draft: &str,
        ctx: RunContext<'_>,
        run_id: &str,
    ) -> Result<RefinementOutcome> {
        let threshold = self.refinement.similarity_threshold;
        let max_attempts = self.refinement.max_rewrite_attempts;

        ensure_live(ctx.cancel)?;
        let initial = ctx
            .scorer
            .compute_similarity(draft, &ctx.author, &ctx.examples)
            .await;
        tracing::info!(
            author = %ctx.author,
            combined = initial.combined_score,
            embedding = ?initial.embedding_score,
            llm = ?initial.llm_score,
            "matched author"
        );
        if initial.is_empty() {
            return Err(StyleError::ScoringSignalFailure {
                signal: "all",
                message: "no similarity signal produced a score".into(),
            });
        }

        let initial_score = initial.combined_score;
        let mut state = RefinementState {
            text: draft.to_string(),
            history: vec![initial_score],
            score: initial,
            attempts: 0,
        };
        let mut error = None;

        let stop = loop {
            if state.score.combined_score >= threshold {
                tracing::info!(score = state.score.combined_score, threshold, "similarity threshold met");
                break StopReason::ThresholdMet;
            }
            if state.attempts >= max_attempts {
                break StopReason::MaxAttempts;
            }
            if ctx.cancel.is_cancelled() {
                error = Some(format!("{}: {}", StyleError::Cancelled.kind(), StyleError::Cancelled));
                break StopReason::Cancelled;
            }

            let attempt = state.attempts + 1;
            tracing::info!(attempt, max_attempts, current = state.score.combined_score, "rewrite attempt");

            let rewritten = tokio::select! {
                _ = ctx.cancel.cancelled() => Err(StyleError::Cancelled),
                out = self.rewriter.rewrite(&state.text, &ctx.examples, &ctx.author, &ctx.style_description) => out,
            };
            let candidate = match rewritten {
                Ok(candidate) => candidate,
                Err(StyleError::EmptyRewrite) => {
                    tracing::warn!(attempt, "rewrite returned empty text, stopping");
                    break StopReason::EmptyRewrite;
                }
                Err(StyleError::Cancelled) => {
                    error = Some(format!("{}: {}", StyleError::Cancelled.kind(), StyleError::Cancelled));
                    break StopReason::Cancelled;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "rewrite attempt failed");
                    break StopReason::RewriteFailed;
                }
            };

            if let Err(issue) = validate_content(&candidate, &self.content, true) {
                tracing::warn!(attempt, %issue, "rewritten content invalid");
            }

            let rescored = tokio::select! {
                _ = ctx.cancel.cancelled() => None,
                scored = ctx.scorer.compute_similarity(&candidate, &ctx.author, &ctx.examples) => Some(scored),
            };
            let Some(rescored) = rescored else {
                error = Some(format!("{}: {}", StyleError::Cancelled.kind(), StyleError::Cancelled));
                break StopReason::Cancelled;
            };
            if rescored.is_empty() {
                let e = StyleError::ScoringSignalFailure {
                    signal: "all",
                    message: "no similarity signal produced a score".into(),
                };
                tracing::error!(attempt, error = %e, "rescoring failed, keeping last accepted text");
                error = Some(format!("{}: {e}", e.kind()));
                break StopReason::ScoringFailed;
            }

            let improvement = rescored.combined_score - state.score.combined_score;
            tracing::info!(
                attempt,
                from = state.score.combined_score,
                to = rescored.combined_score,
                improvement,
                "rescored rewrite"
            );
            if improvement <= self.refinement.min_improvement + PLATEAU_EPSILON {
                tracing::info!(attempt, improvement, "similarity plateaued, stopping refinement");
                break StopReason::Plateau;
            }

            state.text = candidate;
            state.history.push(rescored.combined_score);
            state.score = rescored;
            state.attempts = attempt;

            let pause = Duration::from_millis(self.refinement.rate_limit_delay_ms);
            if !pause.is_zero() {
                tokio::select! {
                    _ = ctx.cancel.cancelled() => {}
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        };

        if let Err(issue) = validate_content(&state.text, &self.content, true) {
            tracing::warn!(%issue, "final content validation failed");
        }

        let final_score = state.score.combined_score;
        let warning = (final_score < threshold).then(|| {
            tracing::warn!(score = final_score, threshold, "failed to reach similarity threshold");
            THRESHOLD_NOT_REACHED.to_string()
        });
        tracing::info!(
            initial = initial_score,
            final_score,
            attempts = state.attempts,
            stop_reason = ?stop,
            "style refinement complete"
        );

        Ok(RefinementOutcome {
            styled_blog: state.text,
            style_similarity: final_score,
            embedding_similarity: state.score.embedding_score,
            llm_similarity: state.score.llm_score,
            rewrite_attempts: state.attempts,
            closest_author: Some(ctx.author),
            initial_similarity: Some(initial_score),
            improvement_history: state.history,
            warning,
            success: error.is_none(),
            error,
            stop_reason: stop,
            run_id: run_id.to_string(),
        })
    }

    /// Style examples for one author's corpus text.
    fn style_examples(&self, text: &str) -> Vec<String> {
        let num = self.style.num_examples.max(1);
        if self.style.use_multiple_examples {
            select_diverse_examples(text, num, self.style.example_length / num)
        } else {
            vec![truncate_chars(text, self.style.example_length).to_string()]
        }
    }
}

fn empty_draft(run_id: &str) -> RefinementOutcome {
    tracing::error!(run_id = %run_id, "no draft provided to style refinement");
    RefinementOutcome::failure(
        String::new(),
        "No draft provided".into(),
        StopReason::EmptyDraft,
        run_id,
    )
}

fn ensure_live(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(StyleError::Cancelled)
    } else {
        Ok(())
    }
}

/// Run CPU-bound embedding work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StyleError::Embedding(format!("embedding task failed: {e}")))?
}
