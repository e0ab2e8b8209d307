//! Compiling registry entries into advertised tool definitions.

use std::collections::HashSet;

use manifold_action::{ActionRegistry, Surface, ToolAnnotations};
use manifold_error::DispatchError;
use manifold_schema::{CompiledSchema, compile};
use serde::{Deserialize, Serialize};

/// One advertised tool: name, compiled input schema, advisory annotations,
/// and the deferred-loading flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Advertised tool name.
    pub name: String,
    /// Tool description, when the binding or spec carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The advertised input schema, compiled from the action's input
    /// contract.
    pub input_schema: CompiledSchema,
    /// Advisory hints carried verbatim from the binding.
    #[serde(default, skip_serializing_if = "annotations_are_empty")]
    pub annotations: ToolAnnotations,
    /// Whether the full definition loads lazily. Core/infrastructure tools
    /// stay eagerly visible to the calling agent.
    pub defer_loading: bool,
}

fn annotations_are_empty(annotations: &ToolAnnotations) -> bool {
    *annotations == ToolAnnotations::default()
}

/// Options for compiling the tool surface.
#[derive(Debug, Clone, Default)]
pub struct McpBuildOptions {
    /// Tool names that are always eagerly visible. A binding's explicit
    /// `defer_loading` still wins over this default.
    pub core_tools: HashSet<String>,
}

impl McpBuildOptions {
    /// Options with no core tools.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a tool name as core (eagerly visible by default).
    pub fn with_core_tool(mut self, name: impl Into<String>) -> Self {
        self.core_tools.insert(name.into());
        self
    }
}

/// Compile every tool-bound registry entry into a tool definition.
///
/// Schema compilation failures are fatal here; an advertised schema must
/// never be a silent approximation of the input contract.
pub fn build_mcp_tools(
    registry: &ActionRegistry,
    options: &McpBuildOptions,
) -> Result<Vec<ToolDefinition>, DispatchError> {
    let mut tools = Vec::new();
    for spec in registry.for_surface(Surface::Mcp) {
        let Some(binding) = &spec.tool else { continue };
        spec.check_bindings()?;

        let input_schema = compile(&spec.input_schema).map_err(|err| {
            DispatchError::internal(format!(
                "input schema of `{}` does not compile: {err}",
                spec.id
            ))
        })?;

        // Domain tools defer by default; core tools are eager unless the
        // binding says otherwise.
        let defer_loading = binding
            .defer_loading
            .unwrap_or_else(|| !options.core_tools.contains(&binding.name));

        tools.push(ToolDefinition {
            name: binding.name.clone(),
            description: binding.description.clone().or_else(|| spec.description.clone()),
            input_schema,
            annotations: binding.annotations,
            defer_loading,
        });
    }
    Ok(tools)
}

#[cfg(test)]
mod tests {
    use manifold_action::{ActionOutput, ActionSpec, ToolBinding, handler};
    use manifold_schema::Schema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn spec_with_tool(id: &str, binding: ToolBinding) -> ActionSpec {
        ActionSpec::new(
            id,
            Schema::object([("path", Schema::string().describe("File to inspect"))]),
            handler(|input, _ctx| async move { Ok(ActionOutput::value(input)) }),
        )
        .with_tool(binding)
    }

    #[test]
    fn compiles_schema_and_defaults_to_deferred() {
        let mut registry = ActionRegistry::new();
        registry
            .add(spec_with_tool("docs.lint", ToolBinding::new("docs_lint")))
            .unwrap();

        let tools = build_mcp_tools(&registry, &McpBuildOptions::new()).unwrap();
        assert_eq!(tools.len(), 1);
        assert!(tools[0].defer_loading);
        let schema = serde_json::to_value(&tools[0].input_schema).unwrap();
        assert_eq!(schema["required"], json!(["path"]));
        assert_eq!(
            schema["properties"]["path"]["description"],
            json!("File to inspect")
        );
    }

    #[test]
    fn core_tools_are_eager() {
        let mut registry = ActionRegistry::new();
        registry
            .add(spec_with_tool("core.list", ToolBinding::new("actions_list")))
            .unwrap();

        let options = McpBuildOptions::new().with_core_tool("actions_list");
        let tools = build_mcp_tools(&registry, &options).unwrap();
        assert!(!tools[0].defer_loading);
    }

    #[test]
    fn explicit_defer_flag_wins_over_core_default() {
        let mut registry = ActionRegistry::new();
        registry
            .add(spec_with_tool(
                "core.slow",
                ToolBinding::new("slow_tool").with_defer_loading(true),
            ))
            .unwrap();

        let options = McpBuildOptions::new().with_core_tool("slow_tool");
        let tools = build_mcp_tools(&registry, &options).unwrap();
        assert!(tools[0].defer_loading);
    }

    #[test]
    fn annotations_carry_through_verbatim() {
        let annotations = ToolAnnotations {
            read_only_hint: Some(true),
            idempotent_hint: Some(true),
            destructive_hint: Some(false),
        };
        let mut registry = ActionRegistry::new();
        registry
            .add(spec_with_tool(
                "docs.read",
                ToolBinding::new("docs_read").with_annotations(annotations),
            ))
            .unwrap();

        let tools = build_mcp_tools(&registry, &McpBuildOptions::new()).unwrap();
        assert_eq!(tools[0].annotations, annotations);

        let wire = serde_json::to_value(&tools[0]).unwrap();
        assert_eq!(wire["annotations"]["readOnlyHint"], json!(true));
        assert_eq!(wire["inputSchema"]["type"], json!("object"));
        assert_eq!(wire["deferLoading"], json!(true));
    }

    #[test]
    fn empty_annotations_are_omitted_from_the_wire() {
        let mut registry = ActionRegistry::new();
        registry
            .add(spec_with_tool("docs.plain", ToolBinding::new("docs_plain")))
            .unwrap();
        let tools = build_mcp_tools(&registry, &McpBuildOptions::new()).unwrap();
        let wire = serde_json::to_value(&tools[0]).unwrap();
        assert!(wire.get("annotations").is_none());
    }

    #[test]
    fn description_falls_back_to_spec() {
        let mut registry = ActionRegistry::new();
        registry
            .add(
                spec_with_tool("docs.sync", ToolBinding::new("docs_sync"))
                    .with_description("Synchronize docs"),
            )
            .unwrap();
        let tools = build_mcp_tools(&registry, &McpBuildOptions::new()).unwrap();
        assert_eq!(tools[0].description.as_deref(), Some("Synchronize docs"));
    }
}
