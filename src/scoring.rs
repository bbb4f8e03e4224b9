//! Multi-modal similarity scoring.
//!
//! The embedding signal and the LLM judge run concurrently. Either may be disabled in
//! config or fail on its own; an absent signal is simply left out of the weighted mean.

use std::sync::Arc;

use serde::Serialize;

use crate::config::ScoringConfig;
use crate::embedding::engine::{AuthorCentroids, EmbeddingEngine};
use crate::error::StyleError;
use crate::judge::LlmJudge;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub embedding_score: Option<f64>,
    pub llm_score: Option<f64>,
    pub combined_score: f64,
    /// Judge rationale, empty when the LLM signal is off.
    pub rationale: String,
}

impl SimilarityResult {
    /// True when neither signal produced a score.
    pub fn is_empty(&self) -> bool {
        self.embedding_score.is_none() && self.llm_score.is_none()
    }
}

/// Weighted mean of the present scores, renormalized over their weights.
///
/// A lone score is returned as is; no scores give `0.0`. If the present weights sum to
/// zero the plain mean is used.
pub fn combine_scores(embedding: Option<(f64, f64)>, llm: Option<(f64, f64)>) -> f64 {
    match (embedding, llm) {
        (None, None) => 0.0,
        (Some((score, _)), None) | (None, Some((score, _))) => score,
        (Some((s_e, w_e)), Some((s_l, w_l))) => {
            let total = w_e + w_l;
            if total > 0.0 {
                (w_e * s_e + w_l * s_l) / total
            } else {
                (s_e + s_l) / 2.0
            }
        }
    }
}

/// Scores texts against one run's centroids.
///
/// Cheap to build: the engine and judge are shared handles, the centroids belong to
/// the run.
pub struct MultiModalScorer {
    engine: Arc<EmbeddingEngine>,
    centroids: Arc<AuthorCentroids>,
    judge: Arc<LlmJudge>,
    config: ScoringConfig,
}

impl MultiModalScorer {
    pub fn new(
        engine: Arc<EmbeddingEngine>,
        centroids: Arc<AuthorCentroids>,
        judge: Arc<LlmJudge>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            engine,
            centroids,
            judge,
            config,
        }
    }

    pub async fn compute_similarity(
        &self,
        text: &str,
        author: &str,
        style_examples: &[String],
    ) -> SimilarityResult {
        let embedding = async {
            if !self.config.use_embedding_similarity {
                return None;
            }
            match self.embedding_signal(text, author).await {
                Ok(score) => Some(score),
                Err(e) => {
                    tracing::warn!(error = %e, "similarity signal failed");
                    None
                }
            }
        };
        let llm = async {
            if !self.config.use_llm_similarity {
                return None;
            }
            Some(self.judge.score(text, style_examples, author).await)
        };

        let (embedding_score, verdict) = tokio::join!(embedding, llm);
        let llm_score = verdict.as_ref().map(|v| v.score);

        let combined_score = combine_scores(
            embedding_score.map(|s| (s, self.config.embedding_weight)),
            llm_score.map(|s| (s, self.config.llm_weight)),
        );
        if embedding_score.is_none() && llm_score.is_none() {
            tracing::error!(author, "no similarity scores available");
        }
        tracing::info!(
            author,
            embedding = ?embedding_score,
            llm = ?llm_score,
            combined = combined_score,
            "multi-modal similarity"
        );

        SimilarityResult {
            embedding_score,
            llm_score,
            combined_score,
            rationale: verdict.map(|v| v.rationale).unwrap_or_default(),
        }
    }

    async fn embedding_signal(&self, text: &str, author: &str) -> Result<f64, StyleError> {
        let engine = Arc::clone(&self.engine);
        let centroids = Arc::clone(&self.centroids);
        let text = text.to_string();
        let author = author.to_string();
        let joined = tokio::task::spawn_blocking(move || {
            engine.similarity_to_author(&centroids, &text, &author)
        })
        .await;

        match joined {
            Ok(Ok(score)) => Ok(score),
            Ok(Err(e)) => Err(StyleError::ScoringSignalFailure {
                signal: "embedding",
                message: e.to_string(),
            }),
            Err(e) => Err(StyleError::ScoringSignalFailure {
                signal: "embedding",
                message: format!("embedding task failed: {e}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_weights_give_plain_average() {
        let combined = combine_scores(Some((0.4, 1.0)), Some((0.8, 1.0)));
        assert!((combined - 0.6).abs() < 1e-12);
    }

    #[test]
    fn weights_are_renormalized() {
        let combined = combine_scores(Some((0.5, 0.4)), Some((1.0, 0.6)));
        assert!((combined - 0.8).abs() < 1e-12);
    }

    #[test]
    fn lone_signal_is_returned_exactly() {
        assert_eq!(combine_scores(Some((0.37, 0.4)), None), 0.37);
        assert_eq!(combine_scores(None, Some((0.55, 0.6))), 0.55);
    }

    #[test]
    fn no_signals_is_zero() {
        assert_eq!(combine_scores(None, None), 0.0);
    }

    #[test]
    fn zero_weights_fall_back_to_mean() {
        let combined = combine_scores(Some((0.2, 0.0)), Some((0.4, 0.0)));
        assert!((combined - 0.3).abs() < 1e-12);
    }
}
