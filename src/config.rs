use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::StyleError;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ScribeConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub refinement: RefinementConfig,
    pub style: StyleConfig,
    pub scoring: ScoringConfig,
    pub generation: GenerationConfig,
    pub network: NetworkConfig,
    pub cache: CacheConfig,
    pub content: ContentConfig,
    pub corpus: CorpusConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
    /// Maximum number of text embeddings kept in memory. Once full, new
    /// embeddings are computed but not cached.
    pub cache_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefinementConfig {
    pub similarity_threshold: f64,
    pub max_rewrite_attempts: usize,
    /// A rewrite must raise the combined score by more than this to be accepted.
    pub min_improvement: f64,
    pub rate_limit_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    pub example_length: usize,
    pub use_multiple_examples: bool,
    pub num_examples: usize,
    pub extract_features: bool,
    pub detailed_prompt: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    pub use_llm_similarity: bool,
    pub use_embedding_similarity: bool,
    pub llm_weight: f64,
    pub embedding_weight: f64,
    pub judge_model: String,
    pub cache_llm_scores: bool,
    pub judge_excerpt_chars: usize,
    pub judge_text_chars: usize,
    pub judge_max_tokens: u32,
    pub judge_temperature: f32,
    pub score_cache_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub retry_attempts: usize,
    pub retry_base: f64,
    pub initial_delay_secs: f64,
    pub retry_status_codes: Vec<u16>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ContentConfig {
    pub min_word_count: usize,
    pub max_word_count: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorpusConfig {
    pub feed_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8765,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_scribe_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
            cache_capacity: 1000,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.80,
            max_rewrite_attempts: 3,
            min_improvement: 0.01,
            rate_limit_delay_ms: 500,
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            example_length: 4000,
            use_multiple_examples: true,
            num_examples: 3,
            extract_features: true,
            detailed_prompt: true,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            use_llm_similarity: true,
            use_embedding_similarity: true,
            llm_weight: 0.6,
            embedding_weight: 0.4,
            judge_model: "gemini-2.5-flash-lite".into(),
            cache_llm_scores: true,
            judge_excerpt_chars: 1500,
            judge_text_chars: 2000,
            judge_max_tokens: 800,
            judge_temperature: 0.3,
            score_cache_capacity: 1000,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GOOGLE_API_KEY".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-2.5-flash-lite".into(),
            max_output_tokens: 1024,
            temperature: 0.8,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 20,
            retry_attempts: 5,
            retry_base: 7.0,
            initial_delay_secs: 1.0,
            retry_status_codes: vec![429, 500, 503, 504],
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let dir = default_scribe_dir()
            .join("cache")
            .to_string_lossy()
            .into_owned();
        Self { enabled: true, dir }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_word_count: 150,
            max_word_count: 400,
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            feed_url: "https://api.rss2json.com/v1/api.json?rss_url=https://medium.com/feed/@saurabh2.mishra"
                .into(),
        }
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Returns `~/.scribetwin/`
pub fn default_scribe_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".scribetwin")
}

/// Returns the default config file path: `~/.scribetwin/config.toml`
pub fn default_config_path() -> PathBuf {
    default_scribe_dir().join("config.toml")
}

impl ScribeConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ScribeConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (SCRIBETWIN_LOG_LEVEL, SCRIBETWIN_CACHE_DIR,
    /// SCRIBETWIN_FEED_URL, SCRIBETWIN_THRESHOLD).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SCRIBETWIN_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("SCRIBETWIN_CACHE_DIR") {
            self.cache.dir = val;
        }
        if let Ok(val) = std::env::var("SCRIBETWIN_FEED_URL") {
            self.corpus.feed_url = val;
        }
        if let Ok(val) = std::env::var("SCRIBETWIN_THRESHOLD") {
            match val.parse::<f64>() {
                Ok(threshold) => self.refinement.similarity_threshold = threshold,
                Err(_) => tracing::warn!(value = %val, "ignoring non-numeric SCRIBETWIN_THRESHOLD"),
            }
        }
    }

    /// Check cross-field invariants. Every violation is a configuration error.
    pub fn validate(&self) -> std::result::Result<(), StyleError> {
        let chunking = &self.chunking;
        if chunking.chunk_size == 0 {
            return Err(StyleError::Configuration(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(StyleError::Configuration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }

        let scoring = &self.scoring;
        if scoring.llm_weight < 0.0 || scoring.embedding_weight < 0.0 {
            return Err(StyleError::Configuration(
                "similarity weights must be non-negative".into(),
            ));
        }
        if !scoring.use_llm_similarity && !scoring.use_embedding_similarity {
            return Err(StyleError::Configuration(
                "at least one similarity signal must be enabled".into(),
            ));
        }
        let enabled_weight = if scoring.use_llm_similarity { scoring.llm_weight } else { 0.0 }
            + if scoring.use_embedding_similarity { scoring.embedding_weight } else { 0.0 };
        if enabled_weight <= 0.0 {
            return Err(StyleError::Configuration(
                "enabled similarity signals must carry a positive total weight".into(),
            ));
        }

        let threshold = self.refinement.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(StyleError::Configuration(format!(
                "similarity_threshold ({threshold}) must be between 0.0 and 1.0"
            )));
        }
        if self.refinement.min_improvement < 0.0 {
            return Err(StyleError::Configuration(
                "min_improvement must be non-negative".into(),
            ));
        }
        if self.style.num_examples == 0 {
            return Err(StyleError::Configuration(
                "num_examples must be greater than zero".into(),
            ));
        }
        if self.content.min_word_count > self.content.max_word_count {
            return Err(StyleError::Configuration(format!(
                "min_word_count ({}) exceeds max_word_count ({})",
                self.content.min_word_count, self.content.max_word_count
            )));
        }
        if self.network.retry_base < 1.0 {
            return Err(StyleError::Configuration(
                "retry_base must be at least 1.0".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the on-disk cache directory, expanding `~` if needed.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        expand_tilde(&self.cache.dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
