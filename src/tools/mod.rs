pub mod list_recent_chats;
pub mod list_tags;
pub mod search_archive;
pub mod semantic_search;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, ErrorData, ListResourcesResult, PaginatedRequestParam, RawResource,
    ReadResourceRequestParam, ReadResourceResult, Resource, ResourceContents,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use serde::Serialize;
use sqlx::PgPool;

use list_recent_chats::ListRecentChatsParams;
use list_tags::ListTagsParams;
use search_archive::SearchArchiveParams;
use semantic_search::SemanticSearchParams;

use crate::archive::search::{self, SearchFilters};
use crate::archive::store;
use crate::archive::types::{Item, MemoryType};
use crate::error::StoreError;

/// URI scheme prefix for chat resources.
const CHAT_URI_PREFIX: &str = "chronicle://chats/";

/// Default result count for `semantic_search` and `list_recent_chats`.
const DEFAULT_RESULT_COUNT: i64 = 5;

/// Compact item projection returned by the search tools.
#[derive(Debug, Serialize)]
struct ItemEntry {
    id: String,
    title: String,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_type: Option<MemoryType>,
    salience: f64,
}

impl ItemEntry {
    fn from_item(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            summary: item.summary.clone(),
            memory_type: item.memory_type,
            salience: item.salience,
        }
    }
}

/// A semantic search hit with its similarity score.
#[derive(Debug, Serialize)]
struct ScoredEntry {
    #[serde(flatten)]
    entry: ItemEntry,
    /// `1 − cosine_distance`, higher is closer.
    score: f64,
}

/// Extract the chat id from a `chronicle://chats/<id>` URI.
pub(crate) fn parse_chat_uri(uri: &str) -> Option<&str> {
    let id = uri.strip_prefix(CHAT_URI_PREFIX)?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Render the markdown resource body for one archived item.
pub(crate) fn render_markdown(item: &Item) -> String {
    use chrono::TimeZone;

    let date = chrono::Local
        .timestamp_millis_opt(item.created_at)
        .single()
        .map(|d| d.format("%-m/%-d/%Y").to_string())
        .unwrap_or_default();
    let memory_type = item
        .memory_type
        .map(|t| t.as_str().to_string())
        .unwrap_or_default();

    format!(
        "# {title}\n\
         **Date:** {date}\n\
         **Source:** {source}\n\
         **Tags:** {tags}\n\
         **Memory Type:** {memory_type}\n\
         **Salience:** {salience:.2}\n\
         \n\
         ## Summary\n\
         {summary}\n\
         \n\
         ## Transcript\n\
         {content}",
        title = item.title,
        source = item.source,
        tags = item.tags.join(", "),
        salience = item.salience,
        summary = item.summary,
        content = item.content,
    )
}

/// Parse an optional memory-type filter string from tool arguments.
fn parse_type_filter(value: Option<&str>) -> Result<Option<MemoryType>, String> {
    value
        .map(|s| s.parse::<MemoryType>())
        .transpose()
        .map_err(|e| format!("invalid memory_type: {e}"))
}

/// The Chronicle MCP handler. Holds the shared pool and exposes the archive
/// as resources plus the four search tools.
#[derive(Clone)]
pub struct ChronicleTools {
    tool_router: ToolRouter<Self>,
    pool: PgPool,
    embedding_dim: usize,
}

#[tool_router]
impl ChronicleTools {
    pub fn new(pool: PgPool, embedding_dim: usize) -> Self {
        Self {
            tool_router: Self::tool_router(),
            pool,
            embedding_dim,
        }
    }

    /// Keyword search across the archive.
    #[tool(
        description = "Search the chat archive by keyword. Matches titles, summaries, and tags; returns up to 10 items, newest first."
    )]
    async fn search_archive(
        &self,
        Parameters(params): Parameters<SearchArchiveParams>,
    ) -> Result<String, String> {
        if params.query.is_empty() {
            return Err("query must not be empty".into());
        }
        let filters = SearchFilters {
            memory_type: parse_type_filter(params.memory_type.as_deref())?,
            min_salience: params.min_salience,
            exclude_id: None,
        };

        tracing::debug!(query = %params.query, "keyword search");

        let items = search::keyword_search(&self.pool, &params.query, &filters)
            .await
            .map_err(|e| format!("search failed: {e}"))?;
        let entries: Vec<ItemEntry> = items.iter().map(ItemEntry::from_item).collect();
        serde_json::to_string(&entries).map_err(|e| format!("could not encode results: {e}"))
    }

    /// Find items semantically similar to a target chat.
    #[tool(
        description = "Find chats semantically similar to a target chat, ranked by embedding similarity. The target itself is excluded."
    )]
    async fn semantic_search(
        &self,
        Parameters(params): Parameters<SemanticSearchParams>,
    ) -> Result<String, String> {
        let limit = params.limit.unwrap_or(DEFAULT_RESULT_COUNT).max(1);
        let filters = SearchFilters {
            memory_type: parse_type_filter(params.memory_type.as_deref())?,
            min_salience: params.min_salience,
            exclude_id: Some(params.target_id.clone()),
        };

        tracing::debug!(target = %params.target_id, limit, "similarity search");

        let target = match store::get_item(&self.pool, &params.target_id).await {
            Ok(item) => item,
            Err(StoreError::NotFound(_)) => {
                return Err("Target chat not found or has no vector data.".into())
            }
            Err(e) => return Err(format!("target lookup failed: {e}")),
        };
        let Some(embedding) = target.embedding else {
            return Err("Target chat not found or has no vector data.".into());
        };

        let hits = search::vector_knn(&self.pool, &embedding, limit, &filters, self.embedding_dim)
            .await
            .map_err(|e| format!("vector search failed: {e}"))?;

        let entries: Vec<ScoredEntry> = hits
            .iter()
            .map(|hit| ScoredEntry {
                entry: ItemEntry::from_item(&hit.item),
                score: 1.0 - hit.distance,
            })
            .collect();
        serde_json::to_string(&entries).map_err(|e| format!("could not encode results: {e}"))
    }

    /// List the most recently imported chats.
    #[tool(description = "List the most recently archived chats, newest first.")]
    async fn list_recent_chats(
        &self,
        Parameters(params): Parameters<ListRecentChatsParams>,
    ) -> Result<String, String> {
        let count = params.count.unwrap_or(DEFAULT_RESULT_COUNT).max(1);
        let items = store::list_recent(&self.pool, count)
            .await
            .map_err(|e| format!("listing failed: {e}"))?;
        let entries: Vec<ItemEntry> = items.iter().map(ItemEntry::from_item).collect();
        serde_json::to_string(&entries).map_err(|e| format!("could not encode results: {e}"))
    }

    /// Enumerate every tag in the archive.
    #[tool(description = "List all distinct tags in the archive as a comma-separated string.")]
    async fn list_tags(
        &self,
        Parameters(_params): Parameters<ListTagsParams>,
    ) -> Result<String, String> {
        let tags = store::list_tags(&self.pool)
            .await
            .map_err(|e| format!("tag listing failed: {e}"))?;
        Ok(tags.join(", "))
    }
}

#[tool_handler]
impl ServerHandler for ChronicleTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Chronicle is a salience-aware archive of AI conversations and notes. \
                 Browse chats as resources, search with search_archive or semantic_search, \
                 and discover structure with list_recent_chats and list_tags."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let items = store::load_items(&self.pool)
            .await
            .map_err(|e| ErrorData::internal_error(format!("load failed: {e}"), None))?;

        let resources: Vec<Resource> = items
            .iter()
            .map(|item| {
                let mut raw = RawResource::new(
                    format!("{CHAT_URI_PREFIX}{}", item.id),
                    item.title.clone(),
                );
                raw.description = Some(item.summary.clone());
                raw.mime_type = Some("text/markdown".into());
                raw.no_annotation()
            })
            .collect();

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let id = parse_chat_uri(&request.uri).ok_or_else(|| {
            ErrorData::invalid_params(
                format!("unrecognised resource URI: {}", request.uri),
                None,
            )
        })?;

        let item = store::get_item(&self.pool, id).await.map_err(|e| match e {
            StoreError::NotFound(_) => {
                ErrorData::resource_not_found(format!("no chat with id {id}"), None)
            }
            other => ErrorData::internal_error(format!("read failed: {other}"), None),
        })?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(render_markdown(&item), request.uri)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::types::{DecayMetadata, ItemKind};

    fn sample_item() -> Item {
        Item {
            id: "chat-42".into(),
            kind: ItemKind::Chat,
            title: "Planning the garden".into(),
            summary: "Raised beds and companion planting.".into(),
            content: "Full transcript body.".into(),
            tags: vec!["garden".into(), "spring".into()],
            source: "Claude".into(),
            file_name: None,
            assets: vec![],
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_000,
            embedding: None,
            memory_type: Some(MemoryType::Semantic),
            salience: 0.62,
            recall_count: 3,
            last_accessed_at: 1_700_000_000_000,
            decay_metadata: DecayMetadata::default(),
        }
    }

    #[test]
    fn parse_chat_uri_extracts_id() {
        assert_eq!(parse_chat_uri("chronicle://chats/abc-123"), Some("abc-123"));
        assert_eq!(parse_chat_uri("chronicle://chats/"), None);
        assert_eq!(parse_chat_uri("chronicle://tags/abc"), None);
        assert_eq!(parse_chat_uri("file:///tmp/x"), None);
    }

    #[test]
    fn render_markdown_includes_all_sections() {
        let md = render_markdown(&sample_item());
        assert!(md.starts_with("# Planning the garden\n"));
        assert!(md.contains("**Source:** Claude"));
        assert!(md.contains("**Tags:** garden, spring"));
        assert!(md.contains("**Memory Type:** semantic"));
        assert!(md.contains("**Salience:** 0.62"));
        assert!(md.contains("## Summary\nRaised beds and companion planting."));
        assert!(md.contains("## Transcript\nFull transcript body."));
    }

    #[test]
    fn render_markdown_handles_untyped_items() {
        let mut item = sample_item();
        item.memory_type = None;
        item.tags.clear();
        let md = render_markdown(&item);
        assert!(md.contains("**Memory Type:** \n"));
        assert!(md.contains("**Tags:** \n"));
    }

    #[test]
    fn type_filter_rejects_unknown_values() {
        assert!(parse_type_filter(Some("episodic")).unwrap().is_some());
        assert!(parse_type_filter(None).unwrap().is_none());
        assert!(parse_type_filter(Some("entity")).is_err());
    }

    #[test]
    fn item_entry_keeps_tool_payload_compact() {
        let entry = ItemEntry::from_item(&sample_item());
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], "chat-42");
        assert_eq!(json["memory_type"], "semantic");
        // Full content never leaks into search payloads
        assert!(json.get("content").is_none());
    }

    #[test]
    fn scored_entry_flattens_item_fields() {
        let scored = ScoredEntry {
            entry: ItemEntry::from_item(&sample_item()),
            score: 0.97,
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["id"], "chat-42");
        assert!((json["score"].as_f64().unwrap() - 0.97).abs() < 1e-9);
    }
}
