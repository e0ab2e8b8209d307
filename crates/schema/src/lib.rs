//! # manifold-schema
//!
//! Composable validation schemas for action input contracts, plus the
//! compiler that turns them into a portable, serializable description.
//!
//! A [`Schema`] is a closed tree of node kinds (primitives, objects, arrays,
//! enums, unions, and the chain combinators `optional` / `default` /
//! `transform` / `pipe` / `describe`). The same value drives two things:
//!
//! - **Runtime validation** via [`Schema::conform`], which checks a JSON
//!   value against the schema, fills defaults, and applies transforms.
//! - **Schema compilation** via [`compile`], which produces a
//!   [`CompiledSchema`]: a JSON-Schema-shaped tree that any surface can
//!   advertise (CLI help, tool definitions, generated docs) without knowing
//!   which combinators built it.
//!
//! The subtle part is optionality propagation through chains; the exact
//! rules live on [`Schema::is_optional`] and are what the compiler uses to
//! build `required` lists.
//!
//! ## Quick start
//!
//! ```rust
//! use manifold_schema::{Schema, compile};
//!
//! let input = Schema::object([
//!     ("path", Schema::string().describe("File to inspect")),
//!     ("limit", Schema::number().int().gte(1.0).default_value(10.into())),
//! ]);
//!
//! let compiled = compile(&input).unwrap();
//! assert_eq!(compiled.required, Some(vec!["path".to_owned()]));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ast;
mod compile;
mod conform;

pub use ast::{NumberCheck, Schema, StringFormat, TransformFn};
pub use compile::{CompileError, CompiledSchema, compile};
pub use conform::ConformError;
