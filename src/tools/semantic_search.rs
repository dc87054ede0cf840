//! Argument schema for the `semantic_search` tool.
//!
//! The wire field is `targetId` (camelCase, matching the host UI's payloads);
//! everything else stays snake_case.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SemanticSearchParams {
    /// ID of the chat whose embedding seeds the similarity search.
    #[serde(rename = "targetId")]
    #[schemars(description = "ID of the chat whose embedding seeds the similarity search")]
    pub target_id: String,

    /// Maximum number of results. Defaults to 5.
    #[schemars(description = "Maximum number of results. Defaults to 5.")]
    pub limit: Option<i64>,

    /// Filter by memory type.
    #[schemars(
        description = "Filter by memory type: 'episodic', 'semantic', 'procedural', 'emotional', 'default'"
    )]
    pub memory_type: Option<String>,

    /// Minimum salience threshold (0.0–1.0).
    #[schemars(description = "Minimum salience threshold (0.0-1.0)")]
    pub min_salience: Option<f64>,
}
