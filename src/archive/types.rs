//! The archive's data model: [`Item`] (a chat or note) with its
//! [`ItemKind`] and [`MemoryType`], [`Fact`] (a temporal triple), [`Link`]
//! (a manual edge between items), and the decay bookkeeping that rides
//! along with every item and fact row.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of decay-history entries retained per row.
pub const DECAY_HISTORY_CAP: usize = 10;

/// Whether an archived item is an imported conversation or a user note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Chat,
    Note,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Note => "note",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::Chat),
            "note" => Ok(Self::Note),
            _ => Err(format!("not an item kind: {s}")),
        }
    }
}

/// Cognitive memory category. Each type carries its own half-life and
/// salience floor in the decay engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Events and session logs — fast decay (24 h half-life).
    Episodic,
    /// Facts and knowledge — slow decay (168 h half-life).
    Semantic,
    /// Workflows and how-to — slowest decay (720 h half-life).
    Procedural,
    /// Emotionally charged memories — fast decay but strong rehearsal response.
    Emotional,
    /// Untyped items (72 h half-life).
    Default,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
            Self::Emotional => "emotional",
            Self::Default => "default",
        }
    }

    /// Lowest salience this type can decay to. Every salience mutation is
    /// clamped to `[salience_floor(), 1.0]`.
    pub fn salience_floor(&self) -> f64 {
        match self {
            Self::Episodic => 0.10,
            Self::Semantic => 0.15,
            Self::Procedural => 0.20,
            Self::Emotional => 0.12,
            Self::Default => 0.10,
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "episodic" => Ok(Self::Episodic),
            "semantic" => Ok(Self::Semantic),
            "procedural" => Ok(Self::Procedural),
            "emotional" => Ok(Self::Emotional),
            "default" => Ok(Self::Default),
            _ => Err(format!("not a memory type: {s}")),
        }
    }
}

/// An archived item: an imported chat transcript or a user-authored note.
///
/// Matches the `chats` table. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Opaque unique id, assigned by the importer.
    pub id: String,
    pub kind: ItemKind,
    pub title: String,
    pub summary: String,
    pub content: String,
    /// Ordered tag set; duplicates collapsed on write, first occurrence wins.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Origin label. A small set is privileged by the UI (ChatGPT, Claude,
    /// Gemini, Qwen, LocalLLM, Other, Manual) but any string is accepted.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Opaque asset blobs/URIs attached to the item.
    #[serde(default)]
    pub assets: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Fixed-dimension vector; dimension is a deployment constant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<MemoryType>,
    /// Memory strength in `[0, 1]`.
    #[serde(default = "default_salience")]
    pub salience: f64,
    #[serde(default)]
    pub recall_count: i32,
    /// Initialised from `created_at` when a payload omits it.
    #[serde(default)]
    pub last_accessed_at: i64,
    #[serde(default)]
    pub decay_metadata: DecayMetadata,
}

fn default_salience() -> f64 {
    0.4
}

impl Item {
    /// Effective memory type for decay purposes (untyped items decay as
    /// [`MemoryType::Default`]).
    pub fn effective_memory_type(&self) -> MemoryType {
        self.memory_type.unwrap_or(MemoryType::Default)
    }
}

/// A temporal `(subject, predicate, object)` triple extracted from a chat.
///
/// `valid_to = None` means the fact is currently live. Re-extraction closes
/// the prior live fact for the same `(subject, predicate)` instead of
/// deleting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub id: Uuid,
    pub chat_id: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub confidence: f64,
    pub salience: f64,
    pub valid_from: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<i64>,
    pub created_at: i64,
    pub last_accessed_at: i64,
    pub recall_count: i32,
    #[serde(default)]
    pub decay_metadata: DecayMetadata,
}

/// A fact as produced by the external extraction collaborator, before it
/// gains an id and validity interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub confidence: f64,
}

/// A manual edge between two items. Stored one direction; removal treats
/// `(a, b)` and `(b, a)` as the same edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub from_id: String,
    pub to_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    pub created_at: i64,
}

/// Modifier values recorded by the decay engine for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayModifiers {
    pub ltp_factor: f64,
    pub recall_boost: f64,
    pub env_multiplier: f64,
    pub ebbinghaus: f64,
}

impl DecayModifiers {
    /// Identity modifiers for the under-15-minutes guard, where no decay is
    /// applied.
    pub fn identity() -> Self {
        Self {
            ltp_factor: 1.0,
            recall_boost: 0.0,
            env_multiplier: 1.0,
            ebbinghaus: 1.0,
        }
    }
}

/// One entry of the per-row decay history FIFO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayHistoryEntry {
    pub previous_salience: f64,
    pub new_salience: f64,
    pub hours_since_access: f64,
    pub modifiers: DecayModifiers,
}

/// Decay bookkeeping persisted as JSONB alongside each item and fact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecayMetadata {
    /// Millisecond timestamp of the last decay application, or `None` if the
    /// row has never been processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_decay_run: Option<i64>,
    /// Bounded FIFO of the most recent decay applications (newest last).
    #[serde(default)]
    pub history: Vec<DecayHistoryEntry>,
}

impl DecayMetadata {
    /// Record a decay application, truncating the history to
    /// [`DECAY_HISTORY_CAP`] entries. Truncation happens here, before the
    /// row is written, to keep row sizes bounded.
    pub fn record(&mut self, run_at: i64, entry: DecayHistoryEntry) {
        self.last_decay_run = Some(run_at);
        self.history.push(entry);
        if self.history.len() > DECAY_HISTORY_CAP {
            let excess = self.history.len() - DECAY_HISTORY_CAP;
            self.history.drain(..excess);
        }
    }
}

/// One row of the append-only `salience_decay_metrics` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayRunMetric {
    pub run_timestamp: i64,
    pub items_processed: i64,
    pub items_decayed: i64,
    pub error_count: i64,
    pub average_decay_amount: f64,
    pub memory_entropy: f64,
    pub environmental_context: String,
    pub processing_duration_ms: i64,
}

/// Collapse duplicate tags preserving first occurrence order.
pub fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
