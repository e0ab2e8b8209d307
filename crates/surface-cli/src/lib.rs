//! # manifold-surface-cli
//!
//! Compiles CLI-bound registry entries into `clap` command definitions and
//! executes them with uniform validation, error, and output semantics.
//!
//! Per action: declared options become parser options, the binding's
//! `map_input` turns parsed argv into the typed input, the input schema
//! validates it, and only then does the handler run. Every failure exits
//! through the shared error taxonomy's exit-code projection; every success
//! renders through the shared [`OutputSink`].
//!
//! Output mode (`human` / `json` / `jsonl`) is resolved exclusively through
//! the shared `--output` flag and `MANIFOLD_OUTPUT` environment variable.
//! No individual command may declare its own `--json` flag; that is
//! enforced at build time and by a guardrail scan, with a central
//! allow-list for the rare sanctioned exception.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod build;
mod output;
mod run;

pub use build::{
    CliBuildOptions, CompiledCommand, GuardrailViolation, build_cli_commands, scan_json_guardrail,
};
pub use output::{CaptureSink, OutputMode, OutputSink, StdoutSink};
pub use run::{CliSurface, run_action};
