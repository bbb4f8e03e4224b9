//! Style refinement for blog drafts.
//!
//! scribetwin takes a draft and a pool of author corpora, finds the author whose writing
//! the draft already resembles most, and rewrites the draft toward that author's style
//! until a blended similarity score clears a threshold, stops improving, or runs out of
//! attempts.
//!
//! # Scoring
//!
//! Similarity blends two signals:
//!
//! | Signal | Source | Range |
//! |--------|--------|-------|
//! | **Embedding** | Cosine between the text and the author's centroid | `[-1, 1]` |
//! | **LLM judge** | Score parsed from a generative model's critique | `[0, 1]` |
//!
//! Either signal may be disabled or fail; the combined score is the weighted mean of
//! whichever are present.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`corpus`]: author corpora and the RSS feed provider
//! - [`embedding`]: embedding providers, centroids and closest-author search
//! - [`judge`]: LLM style judge with score parsing and caching
//! - [`scoring`]: multi-modal score blending
//! - [`style`]: stylistic features and style-example selection
//! - [`rewrite`]: rewrite prompts and the rewrite call
//! - [`refine`]: the refinement loop

pub mod cache;
pub mod chunking;
pub mod config;
pub mod content;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod judge;
pub mod llm;
pub mod refine;
pub mod retry;
pub mod rewrite;
pub mod scoring;
pub mod style;
pub mod text;
