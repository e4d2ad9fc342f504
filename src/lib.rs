//! Shared knowledge store for cooperating AI agents.
//!
//! Agents post short summaries tagged by feature, agent and branch, and read
//! them back with exact-match filters and pagination. The store is a single
//! SQLite table; the MCP server exposes it as `agent_knowledge_*` tools and
//! `knowledge://` resources over JSON-RPC 2.0 stdio.

pub mod config;
pub mod format;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod state;
pub mod store;
pub mod tools;
pub mod validation;

pub mod schema;
