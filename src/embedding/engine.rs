//! Author style centroids and embedding similarity.
//!
//! The [`EmbeddingEngine`] is built once and shared. It owns the embedding provider and
//! a bounded text→vector cache. Centroids are *not* stored in the engine: every
//! refinement run builds its own [`AuthorCentroids`] from its corpus snapshot, so runs
//! with different corpora never see each other's authors.

use std::sync::Arc;

use super::{dot, l2_norm, l2_normalize, EmbeddingProvider};
use crate::cache::{content_hash, BoundedCache, CacheStats};
use crate::chunking::WordChunker;
use crate::corpus::Corpus;
use crate::error::{Result, StyleError};

/// Unit-norm centroid per author, in corpus order.
#[derive(Debug, Clone, Default)]
pub struct AuthorCentroids {
    entries: Vec<(String, Vec<f32>)>,
}

impl AuthorCentroids {
    pub fn get(&self, author: &str) -> Option<&[f32]> {
        self.entries
            .iter()
            .find(|(a, _)| a == author)
            .map(|(_, c)| c.as_slice())
    }

    pub fn authors(&self) -> Vec<String> {
        self.entries.iter().map(|(a, _)| a.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.entries.iter().map(|(a, c)| (a.as_str(), c.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared embedding front end: provider, chunker and bounded vector cache.
pub struct EmbeddingEngine {
    provider: Arc<dyn EmbeddingProvider>,
    chunker: WordChunker,
    cache: BoundedCache<String, Arc<[f32]>>,
}

impl EmbeddingEngine {
    /// `cache_capacity` bounds the text→vector cache. Once it is full, further
    /// embeddings are computed but not cached.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        chunker: WordChunker,
        cache_capacity: usize,
    ) -> Self {
        Self {
            provider,
            chunker,
            cache: BoundedCache::new(cache_capacity),
        }
    }

    /// Build an engine from config, creating the configured provider.
    pub fn from_config(config: &crate::config::ScribeConfig) -> anyhow::Result<Self> {
        let provider: Arc<dyn EmbeddingProvider> =
            Arc::from(super::create_provider(&config.embedding)?);
        let chunker =
            WordChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        Ok(Self::new(provider, chunker, config.embedding.cache_capacity))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop all cached embeddings and log the hit/miss counters.
    pub fn clear_cache(&self) {
        let stats = self.cache.clear();
        tracing::info!(
            entries = stats.entries,
            hits = stats.hits,
            misses = stats.misses,
            "cleared embedding cache"
        );
    }

    /// Embed `text` and normalize to unit length. Deterministic per exact text.
    ///
    /// A zero vector is returned as is, so it scores 0.0 against every centroid.
    ///
    /// # Errors
    ///
    /// [`StyleError::Embedding`] if the provider fails or returns non-finite values.
    pub fn embed_normalized(&self, text: &str) -> Result<Arc<[f32]>> {
        let key = content_hash(&[text]);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let raw = self
            .provider
            .embed(text)
            .map_err(|e| StyleError::Embedding(e.to_string()))?;
        let normalized: Arc<[f32]> = match l2_normalize(&raw) {
            Some(unit) => unit.into(),
            None if l2_norm(&raw) == 0.0 => {
                tracing::debug!("text produced a zero-norm embedding");
                raw.into()
            }
            None => {
                return Err(StyleError::Embedding(
                    "provider returned a non-finite embedding".into(),
                ))
            }
        };

        if !self.cache.insert(key, Arc::clone(&normalized)) {
            tracing::debug!(
                capacity = self.cache.capacity(),
                "embedding cache full, not caching new embeddings"
            );
        }
        Ok(normalized)
    }

    /// Build one centroid per author: chunk, embed, average, re-normalize.
    ///
    /// Authors with no chunks, a failing provider call, or a zero-norm mean are skipped
    /// with a warning. Zero-norm chunk vectors are left out of the mean.
    ///
    /// # Errors
    ///
    /// [`StyleError::Validation`] for an empty corpus, [`StyleError::NoValidCentroids`]
    /// if every author was skipped.
    pub fn build_centroids(&self, corpus: &Corpus) -> Result<AuthorCentroids> {
        if corpus.is_empty() {
            return Err(StyleError::Validation(
                "cannot build centroids: no author data provided".into(),
            ));
        }

        let mut entries = Vec::with_capacity(corpus.len());
        for (author, text) in corpus.iter() {
            match self.author_centroid(text) {
                Ok(Some((centroid, chunks))) => {
                    tracing::info!(author, chunks, "built author centroid");
                    entries.push((author.to_string(), centroid));
                }
                Ok(None) => tracing::warn!(author, "no usable chunks or zero-norm centroid, skipping author"),
                Err(e) => tracing::error!(author, error = %e, "failed to build centroid, skipping author"),
            }
        }

        if entries.is_empty() {
            return Err(StyleError::NoValidCentroids);
        }
        tracing::info!(authors = entries.len(), "built author centroids");
        Ok(AuthorCentroids { entries })
    }

    fn author_centroid(&self, text: &str) -> Result<Option<(Vec<f32>, usize)>> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Ok(None);
        }
        let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let vectors = self
            .provider
            .embed_batch(&refs)
            .map_err(|e| StyleError::Embedding(e.to_string()))?;

        let mut sum = vec![0.0f32; self.provider.dimensions()];
        let mut used = 0usize;
        for unit in vectors.iter().filter_map(|v| l2_normalize(v)) {
            if unit.len() != sum.len() {
                return Err(StyleError::Embedding(format!(
                    "provider returned {} dimensions, expected {}",
                    unit.len(),
                    sum.len()
                )));
            }
            sum.iter_mut().zip(&unit).for_each(|(acc, x)| *acc += x);
            used += 1;
        }
        if used == 0 {
            return Ok(None);
        }
        sum.iter_mut().for_each(|x| *x /= used as f32);
        Ok(l2_normalize(&sum).map(|centroid| (centroid, used)))
    }

    /// Cosine similarity in `[-1, 1]` between `text` and an author's centroid.
    pub fn similarity_to_author(
        &self,
        centroids: &AuthorCentroids,
        text: &str,
        author: &str,
    ) -> Result<f64> {
        let centroid = centroids
            .get(author)
            .ok_or_else(|| StyleError::UnknownAuthor {
                author: author.to_string(),
                available: centroids.authors(),
            })?;
        let embedding = self.embed_normalized(text)?;
        Ok(clamp_cosine(dot(&embedding, centroid)))
    }

    /// Author whose centroid is most similar to `text`.
    ///
    /// Ties go to the author that comes first in centroid order.
    pub fn find_closest_author(
        &self,
        centroids: &AuthorCentroids,
        text: &str,
    ) -> Result<(String, f64)> {
        if centroids.is_empty() {
            return Err(StyleError::NoCentroids);
        }
        let embedding = self.embed_normalized(text)?;

        let mut best: Option<(&str, f64)> = None;
        for (author, centroid) in centroids.iter() {
            let score = clamp_cosine(dot(&embedding, centroid));
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((author, score));
            }
        }

        let (author, score) = best.ok_or(StyleError::NoCentroids)?;
        tracing::info!(author, similarity = score, "closest author");
        Ok((author.to_string(), score))
    }
}

/// Rounding can push a dot product of unit vectors slightly outside `[-1, 1]`.
fn clamp_cosine(value: f32) -> f64 {
    f64::from(value).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::l2_norm;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds each text as a count of the letters a, b, c, plus a call counter.
    struct LetterProvider {
        calls: AtomicUsize,
    }

    impl LetterProvider {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0) }
        }
    }

    impl EmbeddingProvider for LetterProvider {
        fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(['a', 'b', 'c']
                .iter()
                .map(|l| text.chars().filter(|c| c == l).count() as f32)
                .collect())
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    fn engine_with(provider: Arc<LetterProvider>, capacity: usize) -> EmbeddingEngine {
        EmbeddingEngine::new(provider, WordChunker::new(4, 1).unwrap(), capacity)
    }

    fn corpus() -> Corpus {
        [
            ("alice", "aaa aab aaa aba aaa"),
            ("bob", "bbb bbc bbb"),
            ("silent", "xyz zzz"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn centroids_are_unit_norm_and_skip_degenerate_authors() {
        let engine = engine_with(Arc::new(LetterProvider::new()), 10);
        let centroids = engine.build_centroids(&corpus()).unwrap();
        assert_eq!(centroids.authors(), vec!["alice", "bob"]);
        for (_, c) in centroids.iter() {
            assert!((l2_norm(c) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn all_degenerate_authors_is_fatal() {
        let engine = engine_with(Arc::new(LetterProvider::new()), 10);
        let only_silent: Corpus = [("silent", "xyz")].into_iter().collect();
        assert!(matches!(
            engine.build_centroids(&only_silent),
            Err(StyleError::NoValidCentroids)
        ));
        assert!(matches!(
            engine.build_centroids(&Corpus::new()),
            Err(StyleError::Validation(_))
        ));
    }

    #[test]
    fn similarity_requires_known_author() {
        let engine = engine_with(Arc::new(LetterProvider::new()), 10);
        let centroids = engine.build_centroids(&corpus()).unwrap();
        let err = engine
            .similarity_to_author(&centroids, "aaa", "carol")
            .unwrap_err();
        assert!(matches!(err, StyleError::UnknownAuthor { ref author, .. } if author == "carol"));

        let score = engine.similarity_to_author(&centroids, "aaa", "alice").unwrap();
        assert!(score > 0.9 && score <= 1.0);
    }

    #[test]
    fn repeated_similarity_hits_the_cache() {
        let provider = Arc::new(LetterProvider::new());
        let engine = engine_with(Arc::clone(&provider), 10);
        let centroids = engine.build_centroids(&corpus()).unwrap();
        let before = provider.calls.load(Ordering::SeqCst);

        let first = engine.similarity_to_author(&centroids, "ab ab", "bob").unwrap();
        let second = engine.similarity_to_author(&centroids, "ab ab", "bob").unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(provider.calls.load(Ordering::SeqCst), before + 1);
        assert_eq!(engine.cache_stats().hits, 1);
    }

    #[test]
    fn full_cache_still_embeds() {
        let provider = Arc::new(LetterProvider::new());
        let engine = engine_with(Arc::clone(&provider), 1);
        engine.embed_normalized("a").unwrap();
        engine.embed_normalized("b").unwrap();
        engine.embed_normalized("b").unwrap();
        assert_eq!(engine.cache_stats().entries, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

        engine.clear_cache();
        assert_eq!(engine.cache_stats().entries, 0);
    }

    #[test]
    fn closest_author_prefers_first_on_tie() {
        let engine = engine_with(Arc::new(LetterProvider::new()), 10);
        let twins: Corpus = [("first", "aaa"), ("second", "aaa"), ("other", "bbb")]
            .into_iter()
            .collect();
        let centroids = engine.build_centroids(&twins).unwrap();
        let (author, score) = engine.find_closest_author(&centroids, "aa").unwrap();
        assert_eq!(author, "first");
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn closest_author_without_centroids_fails() {
        let engine = engine_with(Arc::new(LetterProvider::new()), 10);
        assert!(matches!(
            engine.find_closest_author(&AuthorCentroids::default(), "a"),
            Err(StyleError::NoCentroids)
        ));
    }

    #[test]
    fn zero_norm_text_embeds_as_zero_vector() {
        let engine = engine_with(Arc::new(LetterProvider::new()), 10);
        let embedding = engine.embed_normalized("xyz").unwrap();
        assert!(embedding.iter().all(|x| *x == 0.0));

        let centroids = engine.build_centroids(&corpus()).unwrap();
        let (author, score) = engine.find_closest_author(&centroids, "xyz").unwrap();
        assert_eq!(author, "alice");
        assert_eq!(score, 0.0);
        assert_eq!(engine.similarity_to_author(&centroids, "xyz", "bob").unwrap(), 0.0);
    }
}
