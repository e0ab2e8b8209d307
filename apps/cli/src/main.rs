//! `manifold`: the command-line host over the Manifold dispatch core.
//!
//! Registers the built-in introspection actions (`actions.list`,
//! `schema.show`, `tools.list`), compiles them into a `clap` tree through
//! [`CliSurface`], and exits with the dispatched action's code.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use manifold_action::{
    ActionOutput, ActionRegistry, ActionSpec, CliBinding, CliOption, Surface, ToolAnnotations,
    ToolBinding, handler,
};
use manifold_error::DispatchError;
use manifold_schema::{Schema, compile};
use manifold_surface_cli::CliSurface;
use manifold_surface_mcp::{McpBuildOptions, build_mcp_tools};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// Snapshot of the assembled registry that the introspection handlers read.
///
/// Filled once after registration so the handlers can describe the registry
/// they themselves live in without holding a reference cycle.
struct Catalog {
    /// One entry per registered action: id, description, surfaces, bindings.
    actions: Vec<Value>,
    /// Compiled input schema per action id.
    schemas: HashMap<String, Value>,
    /// The MCP tool definitions this host advertises.
    tools: Value,
}

type SharedCatalog = Arc<OnceLock<Catalog>>;

fn catalog_of(shared: &SharedCatalog) -> Result<&Catalog, DispatchError> {
    shared
        .get()
        .ok_or_else(|| DispatchError::internal("introspection catalog is not initialised"))
}

/// `actions.list`: enumerate registered actions, optionally filtered to one
/// surface.
fn actions_list(catalog: SharedCatalog) -> ActionSpec {
    let input = Schema::object([(
        "surface",
        Schema::enumeration(["cli", "mcp", "api", "server"]).optional(),
    )]);

    let run = handler(move |input, _ctx| {
        let catalog = Arc::clone(&catalog);
        async move {
            let catalog = catalog_of(&catalog)?;
            let filter = input.get("surface").and_then(Value::as_str).map(str::to_owned);
            let actions: Vec<Value> = catalog
                .actions
                .iter()
                .filter(|entry| match &filter {
                    None => true,
                    // Absent surface list means visible everywhere.
                    Some(surface) => match entry.get("surfaces") {
                        None | Some(Value::Null) => true,
                        Some(Value::Array(list)) => list.iter().any(|s| s.as_str() == Some(surface)),
                        Some(_) => false,
                    },
                })
                .cloned()
                .collect();
            Ok(ActionOutput::value(Value::Array(actions)))
        }
    });

    ActionSpec::new("actions.list", input, run)
        .with_description("List the actions registered with this host")
        .with_cli(
            CliBinding::new("list")
                .with_group("actions")
                .with_description("List registered actions")
                .with_option(
                    CliOption::new("surface")
                        .with_help("Only actions exposed on this surface")
                        .with_value_name("SURFACE"),
                ),
        )
        .with_tool(
            ToolBinding::new("actions_list")
                .with_description("List the actions registered with this host")
                .with_annotations(ToolAnnotations {
                    read_only_hint: Some(true),
                    ..ToolAnnotations::default()
                }),
        )
}

/// `schema.show`: print the compiled input schema of one action.
fn schema_show(catalog: SharedCatalog) -> ActionSpec {
    let input = Schema::object([("action", Schema::string())]);

    let run = handler(move |input, _ctx| {
        let catalog = Arc::clone(&catalog);
        async move {
            let catalog = catalog_of(&catalog)?;
            let id = input
                .get("action")
                .and_then(Value::as_str)
                .ok_or_else(|| DispatchError::validation("`action` must be a string"))?;
            match catalog.schemas.get(id) {
                Some(schema) => Ok(ActionOutput::value(schema.clone())),
                None => Err(DispatchError::not_found(format!("no action with id `{id}`"))
                    .with_context(json!({ "action": id }))),
            }
        }
    });

    ActionSpec::new("schema.show", input, run)
        .with_description("Show the compiled input schema of an action")
        .with_cli(
            CliBinding::new("show")
                .with_group("schema")
                .with_description("Show an action's compiled input schema")
                .with_option(
                    CliOption::new("action")
                        .required()
                        .with_help("Action id to describe")
                        .with_value_name("ID"),
                ),
        )
        .with_tool(
            ToolBinding::new("schema_show")
                .with_description("Show the compiled input schema of an action")
                .with_annotations(ToolAnnotations {
                    read_only_hint: Some(true),
                    ..ToolAnnotations::default()
                }),
        )
}

/// `tools.list`: print the MCP tool definitions this host would advertise.
/// CLI-only by design; an MCP client sees the same data via `tools/list`.
fn tools_list(catalog: SharedCatalog) -> ActionSpec {
    let run = handler(move |_input, _ctx| {
        let catalog = Arc::clone(&catalog);
        async move {
            let catalog = catalog_of(&catalog)?;
            Ok(ActionOutput::value(catalog.tools.clone()))
        }
    });

    ActionSpec::new("tools.list", Schema::object::<_, &str>([]), run)
        .with_description("Print the advertised MCP tool definitions")
        .with_surfaces([Surface::Cli])
        .with_cli(CliBinding::new("tools").with_description("Print the advertised MCP tool definitions"))
}

/// The introspection actions are always available as MCP core tools.
fn mcp_options() -> McpBuildOptions {
    McpBuildOptions::new()
        .with_core_tool("actions_list")
        .with_core_tool("schema_show")
}

fn build_registry() -> anyhow::Result<Arc<ActionRegistry>> {
    let catalog: SharedCatalog = Arc::new(OnceLock::new());

    let mut registry = ActionRegistry::new();
    registry.add(actions_list(Arc::clone(&catalog)))?;
    registry.add(schema_show(Arc::clone(&catalog)))?;
    registry.add(tools_list(Arc::clone(&catalog)))?;
    let registry = Arc::new(registry);

    let mut actions = Vec::new();
    let mut schemas = HashMap::new();
    for spec in registry.list() {
        actions.push(json!({
            "id": spec.id,
            "description": spec.description,
            "surfaces": spec.surfaces.as_ref().map(|list| {
                list.iter().map(|s| s.to_string()).collect::<Vec<_>>()
            }),
            "cli": spec.cli.as_ref().map(|b| b.command.clone()),
            "tool": spec.tool.as_ref().map(|b| b.name.clone()),
        }));
        schemas.insert(spec.id.clone(), serde_json::to_value(compile(&spec.input_schema)?)?);
    }
    let tools = serde_json::to_value(build_mcp_tools(&registry, &mcp_options())?)?;

    // First and only fill; the handlers have not run yet.
    if catalog.set(Catalog { actions, schemas, tools }).is_err() {
        anyhow::bail!("introspection catalog was filled twice");
    }
    Ok(registry)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MANIFOLD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let code = match build_registry() {
        Ok(registry) => {
            CliSurface::new(registry)
                .dispatch("manifold", std::env::args_os())
                .await
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to assemble the action registry");
            eprintln!("manifold: {err:#}");
            1
        }
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_the_builtin_actions() {
        let registry = build_registry().unwrap();
        assert!(registry.get("actions.list").is_some());
        assert!(registry.get("schema.show").is_some());
        assert!(registry.get("tools.list").is_some());
    }

    #[test]
    fn tools_list_is_cli_only() {
        let registry = build_registry().unwrap();
        let tools = build_mcp_tools(&registry, &mcp_options()).unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["actions_list", "schema_show"]);
    }

    #[tokio::test]
    async fn actions_list_filters_by_surface() {
        let registry = build_registry().unwrap();
        let spec = registry.get("actions.list").unwrap();
        let ctx = manifold_action::ActionContext::for_action("actions.list");

        let out = (spec.handler)(serde_json::json!({ "surface": "mcp" }), ctx)
            .await
            .unwrap();
        let ids: Vec<&str> = out.value.as_array().unwrap().iter()
            .map(|entry| entry["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["actions.list", "schema.show"]);
    }
}
