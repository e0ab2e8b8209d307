//! The declarative action unit.

use std::fmt;

use manifold_error::DispatchError;
use manifold_schema::Schema;

use crate::binding::{ApiBinding, CliBinding, Surface, ToolBinding};
use crate::handler::HandlerFn;

/// One declared operation: identity, input contract, handler, and zero or
/// more surface bindings.
///
/// Constructed once at process startup via the builder and never mutated
/// after registration. Structural validation of the bindings happens
/// lazily, the first time an adapter compiles the spec; construction
/// itself only anchors types.
#[derive(Clone)]
pub struct ActionSpec {
    /// Unique identifier; the registry key.
    pub id: String,
    /// Human-readable summary.
    pub description: Option<String>,
    /// Surfaces the action is exposed on. `None` means every surface.
    pub surfaces: Option<Vec<Surface>>,
    /// Validation schema for the handler input.
    pub input_schema: Schema,
    /// Optional output schema, for documentation and tooling only; never
    /// enforced at runtime.
    pub output_schema: Option<Schema>,
    /// The handler. Must never panic; always returns a `Result`.
    pub handler: HandlerFn,
    /// CLI surface binding.
    pub cli: Option<CliBinding>,
    /// Tool surface binding.
    pub tool: Option<ToolBinding>,
    /// HTTP API surface binding (consumed outside this workspace).
    pub api: Option<ApiBinding>,
}

impl ActionSpec {
    /// Declare an action.
    pub fn new(id: impl Into<String>, input_schema: Schema, handler: HandlerFn) -> Self {
        Self {
            id: id.into(),
            description: None,
            surfaces: None,
            input_schema,
            output_schema: None,
            handler,
            cli: None,
            tool: None,
            api: None,
        }
    }

    /// Set the human-readable summary.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restrict the action to the given surfaces.
    pub fn with_surfaces(mut self, surfaces: impl IntoIterator<Item = Surface>) -> Self {
        self.surfaces = Some(surfaces.into_iter().collect());
        self
    }

    /// Record an output schema for documentation and tooling.
    pub fn with_output_schema(mut self, schema: Schema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Bind the action to the CLI surface.
    pub fn with_cli(mut self, binding: CliBinding) -> Self {
        self.cli = Some(binding);
        self
    }

    /// Bind the action to the tool surface.
    pub fn with_tool(mut self, binding: ToolBinding) -> Self {
        self.tool = Some(binding);
        self
    }

    /// Declare an HTTP API route for the action.
    pub fn with_api(mut self, binding: ApiBinding) -> Self {
        self.api = Some(binding);
        self
    }

    /// Whether this action is visible on `surface`.
    ///
    /// An action with no declared surfaces is visible everywhere.
    pub fn exposes(&self, surface: Surface) -> bool {
        match &self.surfaces {
            None => true,
            Some(listed) => listed.contains(&surface),
        }
    }

    /// Check the binding/surface invariant: a binding for a surface
    /// requires that surface to be visible.
    ///
    /// Called by adapters before compiling the spec, not at construction.
    pub fn check_bindings(&self) -> Result<(), DispatchError> {
        let mut violations = Vec::new();
        if self.cli.is_some() && !self.exposes(Surface::Cli) {
            violations.push(Surface::Cli);
        }
        if self.tool.is_some() && !self.exposes(Surface::Mcp) {
            violations.push(Surface::Mcp);
        }
        if self.api.is_some() && !self.exposes(Surface::Api) {
            violations.push(Surface::Api);
        }
        if let Some(surface) = violations.first() {
            return Err(DispatchError::validation(format!(
                "action `{}` has a `{surface}` binding but does not list `{surface}` in its surfaces",
                self.id
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSpec")
            .field("id", &self.id)
            .field("surfaces", &self.surfaces)
            .field("cli", &self.cli.as_ref().map(|b| b.command.as_str()))
            .field("tool", &self.tool.as_ref().map(|b| b.name.as_str()))
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}
