//! Model-free feature-hashing encoder.
//!
//! Each word unigram, word bigram, and punctuation mark is hashed with SHA-256 into a
//! handful of signed buckets of a fixed-size vector. The sum is L2-normalized. No model
//! files, fully deterministic, and sensitive to the surface features (vocabulary,
//! punctuation habits) that distinguish one writer from another.

use anyhow::Result;
use sha2::{Digest, Sha256};

use super::{l2_normalize, EmbeddingProvider, EMBEDDING_DIM};

/// Buckets touched per feature. Each uses a separate 8-byte slice of the digest.
const BUCKETS_PER_FEATURE: usize = 4;

#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dim: usize,
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self { dim: EMBEDDING_DIM }
    }
}

impl HashingEmbeddingProvider {
    pub fn with_dimensions(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn add_feature(&self, acc: &mut [f32], feature: &str) {
        let mut hasher = Sha256::new();
        hasher.update(b"scribetwin_fh_v1:");
        hasher.update(feature.as_bytes());
        let digest = hasher.finalize();

        for slot in digest.chunks_exact(8).take(BUCKETS_PER_FEATURE) {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(slot);
            let h = u64::from_le_bytes(bytes);
            let bucket = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) & 1 == 1 { 1.0 } else { -1.0 };
            acc[bucket] += sign;
        }
    }
}

/// Lowercased word tokens plus one token per punctuation character.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() || c == '\'' {
            word.extend(c.to_lowercase());
        } else {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            if !c.is_whitespace() {
                tokens.push(c.to_string());
            }
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

impl EmbeddingProvider for HashingEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let tokens = tokenize(text);
        let mut acc = vec![0.0f32; self.dim];

        for token in &tokens {
            self.add_feature(&mut acc, token);
        }
        for pair in tokens.windows(2) {
            self.add_feature(&mut acc, &format!("{} {}", pair[0], pair[1]));
        }

        // Empty text stays a zero vector; the engine treats it as degenerate.
        Ok(l2_normalize(&acc).unwrap_or(acc))
    }

    fn dimensions(&self) -> usize {
        self.dim
    }
}
