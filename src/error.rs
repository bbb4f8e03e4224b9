//! Error taxonomy for style scoring and refinement.
//!
//! Library code returns [`StyleError`]; the binary wraps it in `anyhow` at the edges.

use thiserror::Error;

/// Errors raised by the style pipeline.
#[derive(Debug, Error)]
pub enum StyleError {
    /// Invalid configuration (weights, chunk overlap, thresholds). Fatal, surfaced immediately.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A corpus or service request failed after all retries.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed corpus or content.
    #[error("validation error: {0}")]
    Validation(String),

    /// Every author in the corpus was skipped while building centroids.
    #[error("failed to build any valid author centroids")]
    NoValidCentroids,

    /// Similarity was requested against an author with no centroid.
    #[error("author '{author}' not found; available authors: {available:?}")]
    UnknownAuthor {
        author: String,
        available: Vec<String>,
    },

    /// Closest-author search ran before any centroids were built.
    #[error("no author centroids available; build centroids first")]
    NoCentroids,

    /// A rewrite attempt produced no text.
    #[error("rewrite produced no text")]
    EmptyRewrite,

    /// One of the two similarity signals failed.
    #[error("{signal} similarity signal failed: {message}")]
    ScoringSignalFailure {
        signal: &'static str,
        message: String,
    },

    /// The embedding backend failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The generative backend failed or returned an unusable response.
    #[error("generation error: {0}")]
    Generation(String),

    /// The run was cancelled by its caller.
    #[error("refinement cancelled")]
    Cancelled,
}

impl StyleError {
    /// Stable taxonomy name, used in structured failure results.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::Network(_) => "NetworkError",
            Self::Validation(_) => "ValidationError",
            Self::NoValidCentroids => "NoValidCentroids",
            Self::UnknownAuthor { .. } => "UnknownAuthor",
            Self::NoCentroids => "NoCentroids",
            Self::EmptyRewrite => "EmptyRewrite",
            Self::ScoringSignalFailure { .. } => "ScoringSignalFailure",
            Self::Embedding(_) => "EmbeddingError",
            Self::Generation(_) => "GenerationError",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Convenience result alias for the style pipeline.
pub type Result<T> = std::result::Result<T, StyleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(StyleError::NoCentroids.kind(), "NoCentroids");
        assert_eq!(
            StyleError::Configuration("bad".into()).kind(),
            "ConfigurationError"
        );
        assert_eq!(StyleError::Network("down".into()).kind(), "NetworkError");
    }

    #[test]
    fn unknown_author_lists_available() {
        let err = StyleError::UnknownAuthor {
            author: "zed".into(),
            available: vec!["ann".into(), "bob".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("zed"));
        assert!(msg.contains("ann"));
    }
}
