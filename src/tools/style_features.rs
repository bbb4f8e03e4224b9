//! MCP `style_features` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StyleFeaturesParams {
    #[schemars(description = "Text to measure (sentence lengths, punctuation, formatting, tone)")]
    pub text: String,
}
