//! Argument schema for the `list_recent_chats` tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListRecentChatsParams {
    /// Number of items to return. Defaults to 5; clamped to at least 1.
    #[schemars(description = "Number of items to return. Defaults to 5; clamped to at least 1.")]
    pub count: Option<i64>,
}
