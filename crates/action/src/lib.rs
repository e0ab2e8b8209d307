//! # manifold-action
//!
//! The declarative action model at the heart of Manifold.
//!
//! An [`ActionSpec`] describes one operation exactly once (its identity,
//! input contract, handler, and zero or more surface bindings), and the
//! surface adapters (`manifold-surface-cli`, `manifold-surface-mcp`) compile
//! it into their native command/tool shapes without duplicating validation,
//! error handling, or progress reporting.
//!
//! ## Core types
//!
//! - [`ActionSpec`]: the declarative unit, built once at startup
//! - [`ActionRegistry`]: ordered, keyed collection with surface-filtered
//!   queries
//! - [`ActionContext`]: request-scoped context threaded into every handler
//! - [`StreamEvent`] / [`ProgressCallback`]: transport-neutral progress
//!   vocabulary
//! - [`CliBinding`] / [`ToolBinding`] / [`ApiBinding`]: tagged per-surface
//!   bindings; adapters pattern-match on presence
//!
//! ## Quick start
//!
//! ```rust
//! use manifold_action::{ActionOutput, ActionRegistry, ActionSpec, handler};
//! use manifold_schema::Schema;
//!
//! let spec = ActionSpec::new(
//!     "docs.list",
//!     Schema::object([("cwd", Schema::string().optional())]),
//!     handler(|input, _ctx| async move { Ok(ActionOutput::value(input)) }),
//! )
//! .with_description("List documentation files");
//!
//! let mut registry = ActionRegistry::new();
//! registry.add(spec).unwrap();
//! assert!(registry.get("docs.list").is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Tagged per-surface bindings and the surface tag set.
pub mod binding;
/// Request-scoped context threaded into every handler call.
pub mod context;
/// Type-erased handler contract and its success payload.
pub mod handler;
/// Ordered, keyed action collection with surface-filtered queries.
pub mod registry;
/// The declarative action unit.
pub mod spec;
/// Transport-neutral progress event vocabulary.
pub mod stream;

pub use binding::{ApiBinding, CliBinding, CliInvocation, CliOption, Surface, ToolAnnotations, ToolBinding};
pub use context::{ActionContext, RequestId};
pub use handler::{ActionOutput, HandlerFn, HandlerFuture, handler};
pub use registry::ActionRegistry;
pub use spec::ActionSpec;
pub use stream::{ProgressCallback, StepStatus, StreamEvent};
