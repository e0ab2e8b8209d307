//! Dispatching a tool call through the shared pipeline.

use manifold_action::{ActionContext, ActionRegistry, ActionSpec, Surface};
use manifold_error::DispatchError;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::progress::{ProgressBridge, ProgressNotifier, ProgressToken};

/// An incoming tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    /// The advertised tool name.
    pub tool_name: String,
    /// Raw structured parameters.
    pub params: serde_json::Value,
    /// Token for out-of-band progress notifications, when the caller wants
    /// them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_token: Option<ProgressToken>,
}

/// One content block of a tool response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
}

/// The tool-call response shape.
///
/// Failure is data, not a transport fault: `is_error` plus a structured
/// payload carrying the taxonomy category and protocol error code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResponse {
    /// Renderable content blocks.
    pub content: Vec<ToolContent>,
    /// Machine-readable payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<serde_json::Value>,
    /// Whether this response describes a failure.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallResponse {
    fn success(value: serde_json::Value) -> Self {
        let text = match &value {
            serde_json::Value::String(text) => text.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        };
        Self {
            content: vec![ToolContent::Text { text }],
            structured_content: Some(value),
            is_error: false,
        }
    }

    fn failure(error: &DispatchError) -> Self {
        let mut payload = serde_json::json!({
            "category": error.category.as_str(),
            "message": error.message,
            "code": error.protocol_code(),
        });
        if let Some(context) = &error.context {
            payload["context"] = context.clone();
        }
        Self {
            content: vec![ToolContent::Text {
                text: error.to_string(),
            }],
            structured_content: Some(payload),
            is_error: true,
        }
    }
}

/// Dispatch one tool call.
///
/// Never returns an error: every failure (unknown tool, invalid input,
/// handler `Err`, even a contract-violating panic) comes back as an
/// `is_error` response. When the request carries a progress token and the
/// transport supplies a notifier, stream events are bridged into
/// notifications for the duration of the call.
pub async fn call_tool(
    registry: &ActionRegistry,
    request: ToolCallRequest,
    notifier: Option<ProgressNotifier>,
) -> ToolCallResponse {
    let Some(spec) = find_tool(registry, &request.tool_name) else {
        return ToolCallResponse::failure(&DispatchError::not_found(format!(
            "no tool named `{}`",
            request.tool_name
        )));
    };
    if let Err(err) = spec.check_bindings() {
        return ToolCallResponse::failure(&err);
    }
    // find_tool only returns specs with a tool binding.
    let Some(binding) = &spec.tool else {
        return ToolCallResponse::failure(&DispatchError::internal("tool binding disappeared"));
    };

    let mapped = (binding.map_input)(request.params);
    let conformed = match spec.input_schema.conform(mapped) {
        Ok(value) => value,
        Err(err) => {
            let err = DispatchError::validation(err.message.clone())
                .with_context(serde_json::json!({"path": err.path}));
            return ToolCallResponse::failure(&err);
        }
    };

    let mut ctx = ActionContext::for_action(&spec.id);
    if let (Some(token), Some(notifier)) = (request.progress_token, notifier) {
        let bridge = ProgressBridge::new(token, notifier);
        ctx = ctx.with_progress(bridge.callback());
    }

    let span = ctx.span.clone();
    let future = (spec.handler)(conformed, ctx);
    let result = match tokio::spawn(future.instrument(span)).await {
        Ok(result) => result,
        Err(join_err) => Err(DispatchError::internal(format!(
            "handler for `{}` violated the no-panic contract: {join_err}",
            spec.id
        ))),
    };

    match result {
        Ok(output) => ToolCallResponse::success(output.value),
        Err(err) => {
            tracing::debug!(action_id = %spec.id, category = %err.category, "tool call failed");
            ToolCallResponse::failure(&err)
        }
    }
}

fn find_tool(registry: &ActionRegistry, tool_name: &str) -> Option<std::sync::Arc<ActionSpec>> {
    registry
        .for_surface(Surface::Mcp)
        .into_iter()
        .find(|spec| {
            spec.tool
                .as_ref()
                .is_some_and(|binding| binding.name == tool_name)
        })
}
