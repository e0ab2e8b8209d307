//! Request-scoped context threaded into every handler call.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use manifold_error::DispatchError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::stream::{ProgressCallback, StreamEvent};

/// Unique identifier for one surface invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// A fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything a handler may consume from its invocation, and nothing more.
///
/// Built fresh by the adapter for each invocation. Progress reporting is a
/// field here rather than ambient state on purpose: the coupling between a
/// handler and its transport stays visible at the call site.
#[derive(Clone)]
pub struct ActionContext {
    /// Fresh id for this invocation.
    pub request_id: RequestId,
    /// The action being invoked.
    pub action_id: String,
    /// The caller's working directory.
    pub cwd: PathBuf,
    /// Tracing span scoped with `action_id` and `request_id`. Adapters
    /// enter it around the handler call.
    pub span: tracing::Span,
    /// Cooperative cancellation signal. The adapter never force-aborts a
    /// running handler; honoring the token is the handler's choice.
    pub cancellation: CancellationToken,
    env: HashMap<String, String>,
    progress: Option<ProgressCallback>,
}

impl ActionContext {
    /// Build a context for `action_id`, snapshotting the process's current
    /// working directory and environment.
    pub fn for_action(action_id: impl Into<String>) -> Self {
        let action_id = action_id.into();
        let request_id = RequestId::new();
        let span = tracing::info_span!(
            "action",
            action_id = %action_id,
            request_id = %request_id,
        );
        Self {
            request_id,
            action_id,
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            span,
            cancellation: CancellationToken::new(),
            env: std::env::vars().collect(),
            progress: None,
        }
    }

    /// Override the working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Replace the environment snapshot.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Use a pre-existing cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Wire a progress callback for this invocation.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Read a variable from the environment snapshot.
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Whether a transport is listening for progress events.
    pub fn has_progress(&self) -> bool {
        self.progress.is_some()
    }

    /// Report a progress event. No-op when no callback is wired, so
    /// handlers emit unconditionally.
    pub fn emit(&self, event: StreamEvent) {
        if let Some(progress) = &self.progress {
            progress(event);
        }
    }

    /// Check whether the invocation has been cancelled.
    ///
    /// # Errors
    ///
    /// Returns a `cancelled` [`DispatchError`] once the token has fired.
    pub fn check_cancelled(&self) -> Result<(), DispatchError> {
        if self.cancellation.is_cancelled() {
            Err(DispatchError::cancelled(format!(
                "action `{}` was cancelled",
                self.action_id
            )))
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("request_id", &self.request_id)
            .field("action_id", &self.action_id)
            .field("cwd", &self.cwd)
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("has_progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn fresh_request_ids_differ() {
        let a = ActionContext::for_action("x");
        let b = ActionContext::for_action("x");
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn emit_without_callback_is_a_noop() {
        let ctx = ActionContext::for_action("quiet");
        assert!(!ctx.has_progress());
        ctx.emit(StreamEvent::progress(1, 2));
    }

    #[test]
    fn emit_forwards_to_callback() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let ctx = ActionContext::for_action("loud").with_progress(Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        ctx.emit(StreamEvent::progress(1, 2));
        ctx.emit(StreamEvent::progress(2, 2));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn env_snapshot_is_isolated() {
        let ctx = ActionContext::for_action("env").with_env(HashMap::from([(
            "ONLY_KEY".to_owned(),
            "v".to_owned(),
        )]));
        assert_eq!(ctx.env("ONLY_KEY"), Some("v"));
        assert_eq!(ctx.env("PATH"), None);
    }

    #[test]
    fn check_cancelled_after_cancel() {
        let ctx = ActionContext::for_action("cancel.me");
        assert!(ctx.check_cancelled().is_ok());
        ctx.cancellation.cancel();
        let err = ctx.check_cancelled().unwrap_err();
        assert_eq!(err.category, manifold_error::ErrorCategory::Cancelled);
    }

    #[test]
    fn with_cwd_overrides_snapshot() {
        let ctx = ActionContext::for_action("cwd").with_cwd("/tmp/x");
        assert_eq!(ctx.cwd, PathBuf::from("/tmp/x"));
    }
}
