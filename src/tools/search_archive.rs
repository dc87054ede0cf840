//! Argument schema for the `search_archive` tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What a `search_archive` call accepts.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchArchiveParams {
    /// Keyword query matched against titles, summaries, and tags.
    #[schemars(description = "Keyword query matched against titles, summaries, and tags")]
    pub query: String,

    /// Filter by memory type: `"episodic"`, `"semantic"`, `"procedural"`,
    /// `"emotional"`, or `"default"`.
    #[schemars(
        description = "Filter by memory type: 'episodic', 'semantic', 'procedural', 'emotional', 'default'"
    )]
    pub memory_type: Option<String>,

    /// Minimum salience threshold (0.0–1.0).
    #[schemars(description = "Minimum salience threshold (0.0-1.0)")]
    pub min_salience: Option<f64>,
}
