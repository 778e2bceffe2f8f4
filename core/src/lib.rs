#![deny(missing_docs)]
//! cronlytic_core: config, API client, validation and MCP tool handlers for Cronlytic.

/// Configuration loading (overrides, env, JSON files, defaults).
pub mod cfg;
/// Error taxonomy shared by the client, validators and tools.
pub mod error;
/// Tracing/log initialization helpers.
pub mod logx;
/// Validated job model.
pub mod job;
/// Field validators guarding every mutating call.
pub mod validate;
/// Cron expression validation, previews and descriptions.
pub mod cron;
/// Network seam for the API client.
pub mod transport;
/// Cronlytic REST API client with retry/backoff.
pub mod client;
/// Tool handlers and their JSON-schema definitions.
pub mod tools;
/// Read-only `cronlytic://` resources.
pub mod resources;
/// Prompt catalog.
pub mod prompts;
/// Markdown rendering of tool results.
pub mod format;
/// In-process operation timing.
pub mod monitor;

pub use client::ApiClient;
pub use error::{CronlyticError, Result};
