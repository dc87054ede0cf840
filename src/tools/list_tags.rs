//! Argument schema for the `list_tags` tool — it takes nothing, but the
//! router still wants a typed (empty) parameter struct.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListTagsParams {}
