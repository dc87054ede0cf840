//! Salience-aware archive engine for AI conversations and notes.
//!
//! Chronicle persists imported chats and user notes in Postgres, extracts
//! structure into temporal fact triples and manual links, and keeps every
//! row's *salience* — a scalar memory strength in `[0, 1]` — alive through a
//! biologically motivated decay model:
//!
//! | Memory type | Half-life | Floor |
//! |-------------|----------:|------:|
//! | episodic    | 24 h      | 0.10  |
//! | semantic    | 168 h     | 0.15  |
//! | procedural  | 720 h     | 0.20  |
//! | emotional   | 48 h      | 0.12  |
//! | default     | 72 h      | 0.10  |
//!
//! # Architecture
//!
//! - **Storage**: Postgres with [pgvector](https://github.com/pgvector/pgvector)
//!   for cosine-indexed embedding search, accessed through a shared `sqlx`
//!   pool with one transaction per write
//! - **Decay**: a pure engine (exponential half-life blended with an
//!   Ebbinghaus forgetting curve, LTP resistance, recall boosts, diurnal
//!   context) driven by a periodic cursor-paginated scheduler
//! - **Transport**: MCP over stdio — archived chats as markdown resources,
//!   plus keyword and semantic search tools
//!
//! # Modules
//!
//! - [`config`] — layered settings: defaults, `~/.chronicle/config.toml`, env vars
//! - [`db`] — Pool construction with startup backoff, schema, and migrations
//! - [`archive`] — The store: items, temporal facts, links, and search
//! - [`similarity`] — Cosine similarity, KNN selection, and memory entropy
//! - [`decay`] — The decay engine and the periodic scheduler
//! - [`bindings`] — The host API surface consumed by the presentation layer

pub mod archive;
pub mod bindings;
pub mod cli;
pub mod config;
pub mod db;
pub mod decay;
pub mod error;
pub mod server;
pub mod similarity;
pub mod tools;
