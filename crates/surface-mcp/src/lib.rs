//! # manifold-surface-mcp
//!
//! Compiles tool-bound registry entries into MCP-shaped tool definitions
//! and dispatches tool calls with the shared validation, error, and
//! progress semantics.
//!
//! The wire types here ([`ToolDefinition`], [`ToolCallResponse`],
//! [`ProgressNotification`]) are defined locally as plain serde structs:
//! this crate specifies the contract any concrete protocol transport must
//! satisfy, it does not bind to a protocol SDK. A server embedding Manifold
//! serializes these directly into its transport's messages.
//!
//! Errors never surface as raised exceptions or transport faults; every
//! handler failure becomes an `isError` response whose payload carries the
//! taxonomy category, so a calling agent can branch on it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod call;
mod definition;
mod progress;

pub use call::{ToolCallRequest, ToolCallResponse, ToolContent, call_tool};
pub use definition::{McpBuildOptions, ToolDefinition, build_mcp_tools};
pub use progress::{ProgressBridge, ProgressNotification, ProgressNotifier, ProgressToken};
