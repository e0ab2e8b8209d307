//! # manifold-error
//!
//! The closed error taxonomy shared by every Manifold dispatch surface.
//!
//! Handlers never raise: they return [`DispatchError`] inside the `Err`
//! variant of an ordinary `Result`. Each error carries exactly one
//! [`ErrorCategory`], and every surface projects that category into its own
//! native failure vocabulary: a process exit code for the CLI, a protocol
//! error code for the tool surface, an HTTP status for an API surface.
//!
//! The taxonomy is deliberately closed: adapters are allowed to `match`
//! exhaustively on [`ErrorCategory`], and adding a category is a breaking
//! change that every surface must handle.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// The closed set of failure categories.
///
/// Every error produced anywhere in the dispatch path carries exactly one
/// of these. Free-form error kinds are not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad input; user-correctable. Includes every schema-validation
    /// failure generated by an adapter before the handler runs.
    Validation,
    /// A referenced resource or id does not exist.
    NotFound,
    /// Unexpected handler-side failure, or a contract violation caught at
    /// the adapter boundary.
    Internal,
    /// The user or calling agent aborted an interactive step.
    Cancelled,
}

impl ErrorCategory {
    /// Stable machine-readable name, as serialized on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Cancelled => "cancelled",
        }
    }

    /// Process exit code for the CLI surface.
    ///
    /// `2` follows the usage-error convention; `130` mirrors the shell's
    /// `128 + SIGINT` convention for interrupted runs.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Validation => 2,
            Self::NotFound => 3,
            Self::Internal => 1,
            Self::Cancelled => 130,
        }
    }

    /// JSON-RPC error code for the tool-invocation protocol surface.
    pub fn protocol_code(self) -> i64 {
        match self {
            Self::Validation => -32602, // invalid params
            Self::NotFound => -32002,   // resource not found
            Self::Internal => -32603,   // internal error
            Self::Cancelled => -32800,  // request cancelled
        }
    }

    /// HTTP status for an API surface.
    ///
    /// The HTTP adapter itself lives outside this workspace; the projection
    /// is defined here so all surfaces agree on it.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Internal => 500,
            Self::Cancelled => 499,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged error value returned by handlers and adapters.
///
/// Always constructed explicitly via the category helpers; never a wrapped
/// panic or a stringly-typed catch-all.
///
/// # Example
///
/// ```rust
/// use manifold_error::{DispatchError, ErrorCategory};
///
/// let err = DispatchError::not_found("no action with id `docs.sync`")
///     .with_context(serde_json::json!({"id": "docs.sync"}));
///
/// assert_eq!(err.category, ErrorCategory::NotFound);
/// assert_eq!(err.category.exit_code(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("{category}: {message}")]
pub struct DispatchError {
    /// Which taxonomy category this failure belongs to.
    pub category: ErrorCategory,
    /// Human-readable, single-line summary.
    pub message: String,
    /// Optional structured detail for verbose/machine output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl DispatchError {
    /// Create an error with an explicit category.
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            context: None,
        }
    }

    /// Bad input, user-correctable.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, message)
    }

    /// Missing resource or id.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, message)
    }

    /// Unexpected handler-side failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, message)
    }

    /// User or agent aborted an interactive step.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Cancelled, message)
    }

    /// Attach structured context to this error.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Process exit code for the CLI surface.
    pub fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    /// JSON-RPC error code for the tool surface.
    pub fn protocol_code(&self) -> i64 {
        self.category.protocol_code()
    }
}
