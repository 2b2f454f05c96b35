//! # paper-rag
//!
//! Retrieval-augmented question answering over a fixed collection of
//! academic papers.
//!
//! The offline side turns per-paper structured extraction output
//! (`*_content_list.json`) into a corpus of uniquely identified text
//! chunks and embeds them into a vector index. The online side embeds a
//! question, retrieves the nearest chunks, packs them into a
//! character-budgeted context with source attribution, and asks a chat
//! model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ content lists│──▶│  extract + │──▶│ papers.json │──▶│ embed+upsert │
//! │  per paper   │   │  document  │   │  (corpus)   │   │ SQLite index │
//! └──────────────┘   └────────────┘   └─────────────┘   └──────┬───────┘
//!                                                              │
//!             question ──▶ embed ──▶ query ──▶ context ──▶ chat model
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML + environment configuration |
//! | [`models`] | Core data types |
//! | [`extract`] | Content item → normalized text |
//! | [`document`] | Content list → document with chunks |
//! | [`corpus`] | Discovery, corpus build, persistence |
//! | [`context`] | Budgeted context assembly |
//! | [`rag`] | Retrieval orchestration |
//! | [`embedding`] | Embedding providers and retry |
//! | [`chat`] | Chat-completion providers |
//! | [`store`] | Vector index trait, SQLite and in-memory indexes |
//! | [`index_cmd`] | Batch indexing driver |
//! | [`stats`] | Corpus and index statistics |

pub mod chat;
pub mod config;
pub mod context;
pub mod corpus;
pub mod db;
pub mod document;
pub mod embedding;
pub mod extract;
pub mod index_cmd;
pub mod migrate;
pub mod models;
pub mod rag;
pub mod stats;
pub mod store;
