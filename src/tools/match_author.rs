//! MCP `match_author` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `match_author` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MatchAuthorParams {
    #[schemars(description = "Text to compare against every author's style centroid")]
    pub text: String,

    #[schemars(
        description = "rss2json-style feed URL supplying the author corpora. Defaults to the configured feed."
    )]
    pub feed_url: Option<String>,
}
