//! MCP `refine_style` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `refine_style` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RefineStyleParams {
    /// The draft blog post to restyle.
    #[schemars(description = "The draft blog post to rewrite toward the closest author's style")]
    pub draft: String,

    /// Feed of author posts. Defaults to the configured feed.
    #[schemars(
        description = "rss2json-style feed URL supplying the author corpora. Defaults to the configured feed."
    )]
    pub feed_url: Option<String>,

    /// Similarity the blended score must reach (0.0–1.0).
    #[schemars(description = "Target blended similarity (0.0-1.0). Defaults to the configured threshold.")]
    pub threshold: Option<f64>,

    /// Maximum number of accepted rewrites.
    #[schemars(description = "Maximum number of rewrite attempts. Defaults to the configured budget.")]
    pub max_attempts: Option<usize>,
}
