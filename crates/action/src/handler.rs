//! The handler contract: an async function from typed input to a Result.
//!
//! Handlers are type-erased at the registry boundary (JSON in, JSON out)
//! so the registry can hold heterogeneous actions. The contract is strict:
//! a handler must **never** panic; it always returns a `Result` whose error
//! is a categorized [`DispatchError`]. Adapters keep a runtime boundary as
//! defense in depth, but the contract is the primary enforcement.

use std::sync::Arc;

use futures::future::BoxFuture;
use manifold_error::DispatchError;

use crate::context::ActionContext;

/// Successful handler payload.
///
/// Usually just a JSON value; handlers signalling partial success can embed
/// an explicit exit code the CLI surface propagates instead of forcing `0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutput {
    /// The result value rendered by the surface's output sink.
    pub value: serde_json::Value,
    /// Overrides the CLI's success exit code when set.
    pub exit_code: Option<i32>,
}

impl ActionOutput {
    /// A plain success payload.
    pub fn value(value: serde_json::Value) -> Self {
        Self {
            value,
            exit_code: None,
        }
    }

    /// Override the CLI exit code (partial-success convention).
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }
}

impl From<serde_json::Value> for ActionOutput {
    fn from(value: serde_json::Value) -> Self {
        Self::value(value)
    }
}

/// The boxed future a handler invocation returns.
pub type HandlerFuture = BoxFuture<'static, Result<ActionOutput, DispatchError>>;

/// Type-erased handler: conformed JSON input plus request context in, a
/// Result out. Shared (`Arc`) so a spec can be cloned across invocations.
pub type HandlerFn = Arc<dyn Fn(serde_json::Value, ActionContext) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure as a [`HandlerFn`].
///
/// Exists purely to anchor type inference at the declaration site; it does
/// no validation of its own.
///
/// ```rust
/// use manifold_action::{ActionOutput, handler};
///
/// let h = handler(|input, _ctx| async move { Ok(ActionOutput::value(input)) });
/// # let _ = h;
/// ```
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(serde_json::Value, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ActionOutput, DispatchError>> + Send + 'static,
{
    Arc::new(move |input, ctx| Box::pin(f(input, ctx)))
}
