//! Surface tags and tagged per-surface bindings.
//!
//! A binding is data plus a pure input-mapping function; adapters
//! pattern-match on which bindings a spec carries rather than on any type
//! hierarchy.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A transport/context an action can be invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// Command-line interface.
    Cli,
    /// Tool-invocation protocol (MCP).
    Mcp,
    /// HTTP API (adapter out of scope; tag reserved).
    Api,
    /// In-process server call.
    Server,
}

impl Surface {
    /// Every known surface. An action that declares no surfaces is visible
    /// on all of these; opt-out, not opt-in, so a surface added later
    /// cannot silently lose actions.
    pub const ALL: [Surface; 4] = [Surface::Cli, Surface::Mcp, Surface::Api, Surface::Server];
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cli => "cli",
            Self::Mcp => "mcp",
            Self::Api => "api",
            Self::Server => "server",
        })
    }
}

// ── CLI binding ─────────────────────────────────────────────────────────────

/// One declared command-line option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOption {
    /// Long flag name without the leading dashes (`cwd` → `--cwd`). For
    /// positionals, the value name shown in usage.
    pub name: String,
    /// Optional single-character short flag.
    pub short: Option<char>,
    /// Placeholder shown in help for the value.
    pub value_name: Option<String>,
    /// Help text.
    pub help: Option<String>,
    /// Whether the parser must see this option.
    pub required: bool,
    /// Default value, as the parser would have received it.
    pub default: Option<String>,
    /// `true` for boolean switches that take no value.
    pub is_switch: bool,
    /// `true` for positional arguments, which take their place in
    /// declaration order instead of a flag.
    pub is_positional: bool,
}

impl CliOption {
    /// A value-taking option with the given long name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            value_name: None,
            help: None,
            required: false,
            default: None,
            is_switch: false,
            is_positional: false,
        }
    }

    /// A boolean switch with the given long name.
    pub fn switch(name: impl Into<String>) -> Self {
        Self {
            is_switch: true,
            ..Self::new(name)
        }
    }

    /// A positional argument with the given name.
    pub fn positional(name: impl Into<String>) -> Self {
        Self {
            is_positional: true,
            ..Self::new(name)
        }
    }

    /// Set the short flag.
    pub fn with_short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Set the value placeholder shown in help.
    pub fn with_value_name(mut self, value_name: impl Into<String>) -> Self {
        self.value_name = Some(value_name.into());
        self
    }

    /// Mark the option as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set a parser-level default value.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// What the CLI adapter hands to a binding's input-mapping function.
///
/// Pure data: the mapping function must not perform I/O of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct CliInvocation {
    /// Parsed flag values, keyed by option name. Switches appear as
    /// booleans, value options as strings.
    pub flags: serde_json::Map<String, serde_json::Value>,
    /// Positional arguments, in order.
    pub positionals: Vec<String>,
    /// The caller's working directory.
    pub cwd: PathBuf,
}

impl CliInvocation {
    /// A flag value as a string, if present.
    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).and_then(serde_json::Value::as_str)
    }

    /// Whether a switch was set.
    pub fn switch(&self, name: &str) -> bool {
        self.flags
            .get(name)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// A positional argument by zero-based declaration index, if present.
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positionals.get(index).map(String::as_str)
    }
}

/// Pure function from parsed argv to the action's typed input.
pub type MapCliInput = Arc<dyn Fn(&CliInvocation) -> serde_json::Value + Send + Sync>;

/// How an action appears on the CLI surface.
#[derive(Clone)]
pub struct CliBinding {
    /// Command name (`list`, `sync`, ...).
    pub command: String,
    /// Help text; falls back to the spec description.
    pub description: Option<String>,
    /// Declared options.
    pub options: Vec<CliOption>,
    /// Alternative command names.
    pub aliases: Vec<String>,
    /// Group tag; grouped commands nest as `<group> <command>`.
    pub group: Option<String>,
    /// Maps the parsed invocation to the action's input value.
    pub map_input: MapCliInput,
}

impl CliBinding {
    /// A binding with the default input mapping (the flags object as-is).
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: None,
            options: Vec::new(),
            aliases: Vec::new(),
            group: None,
            map_input: Arc::new(|invocation| serde_json::Value::Object(invocation.flags.clone())),
        }
    }

    /// Set the help text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare an option.
    pub fn with_option(mut self, option: CliOption) -> Self {
        self.options.push(option);
        self
    }

    /// Add an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Nest the command under a group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Replace the input-mapping function.
    pub fn with_map_input<F>(mut self, map: F) -> Self
    where
        F: Fn(&CliInvocation) -> serde_json::Value + Send + Sync + 'static,
    {
        self.map_input = Arc::new(map);
        self
    }
}

impl fmt::Debug for CliBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliBinding")
            .field("command", &self.command)
            .field("group", &self.group)
            .field("options", &self.options)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

// ── Tool binding ────────────────────────────────────────────────────────────

/// Advisory behavior hints advertised with a tool definition.
///
/// Carried verbatim from the binding; never inferred. They inform the
/// calling agent; they enforce nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// The tool does not modify its environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    /// Repeated calls with the same arguments have no additional effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    /// The tool may perform destructive updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
}

/// Pure function from raw tool-call params to the action's input value.
pub type MapToolInput = Arc<dyn Fn(serde_json::Value) -> serde_json::Value + Send + Sync>;

/// How an action appears on the tool-invocation protocol surface.
#[derive(Clone)]
pub struct ToolBinding {
    /// Advertised tool name.
    pub name: String,
    /// Tool description; falls back to the spec description.
    pub description: Option<String>,
    /// Whether the full definition loads lazily. `None` defers to the
    /// adapter default (`true` for domain tools, `false` for core tools).
    pub defer_loading: Option<bool>,
    /// Advisory hints, carried verbatim.
    pub annotations: ToolAnnotations,
    /// Maps raw call params to the action's input value.
    pub map_input: MapToolInput,
}

impl ToolBinding {
    /// A binding with the identity input mapping.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            defer_loading: None,
            annotations: ToolAnnotations::default(),
            map_input: Arc::new(|params| params),
        }
    }

    /// Set the tool description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Explicitly set deferred loading.
    pub fn with_defer_loading(mut self, defer: bool) -> Self {
        self.defer_loading = Some(defer);
        self
    }

    /// Set the advisory annotations.
    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Replace the input-mapping function.
    pub fn with_map_input<F>(mut self, map: F) -> Self
    where
        F: Fn(serde_json::Value) -> serde_json::Value + Send + Sync + 'static,
    {
        self.map_input = Arc::new(map);
        self
    }
}

impl fmt::Debug for ToolBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBinding")
            .field("name", &self.name)
            .field("defer_loading", &self.defer_loading)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

// ── API binding ─────────────────────────────────────────────────────────────

/// How an action appears on an HTTP API surface.
///
/// The HTTP adapter lives outside this workspace; the binding exists so a
/// spec can declare the route and adapters elsewhere can consume it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBinding {
    /// HTTP method (`GET`, `POST`, ...).
    pub method: String,
    /// Route template (`/docs/{id}`).
    pub route: String,
}

impl ApiBinding {
    /// Declare a route.
    pub fn new(method: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            route: route.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn default_cli_mapping_passes_flags_through() {
        let binding = CliBinding::new("list");
        let invocation = CliInvocation {
            flags: json!({"cwd": "/tmp/x"}).as_object().unwrap().clone(),
            positionals: vec![],
            cwd: PathBuf::from("/elsewhere"),
        };
        assert_eq!((binding.map_input)(&invocation), json!({"cwd": "/tmp/x"}));
    }

    #[test]
    fn invocation_flag_accessors() {
        let invocation = CliInvocation {
            flags: json!({"cwd": "/tmp/x", "force": true})
                .as_object()
                .unwrap()
                .clone(),
            positionals: vec!["extra".to_owned()],
            cwd: PathBuf::from("."),
        };
        assert_eq!(invocation.flag("cwd"), Some("/tmp/x"));
        assert!(invocation.switch("force"));
        assert!(!invocation.switch("missing"));
        assert_eq!(invocation.positional(0), Some("extra"));
        assert_eq!(invocation.positional(1), None);
    }

    #[test]
    fn tool_annotations_serialize_camel_case_and_sparse() {
        let annotations = ToolAnnotations {
            read_only_hint: Some(true),
            ..ToolAnnotations::default()
        };
        assert_eq!(
            serde_json::to_value(annotations).unwrap(),
            json!({"readOnlyHint": true})
        );
    }

    #[test]
    fn default_tool_mapping_is_identity() {
        let binding = ToolBinding::new("docs_list");
        let params = json!({"cwd": "/tmp/x"});
        assert_eq!((binding.map_input)(params.clone()), params);
    }

    #[test]
    fn option_builders() {
        let option = CliOption::new("cwd")
            .with_short('C')
            .with_value_name("DIR")
            .with_help("Working directory")
            .with_default(".");
        assert_eq!(option.short, Some('C'));
        assert_eq!(option.default.as_deref(), Some("."));
        assert!(!option.is_switch);
        assert!(!option.is_positional);
        assert!(CliOption::switch("force").is_switch);
        assert!(CliOption::positional("id").is_positional);
    }

    #[test]
    fn surface_display_names() {
        assert_eq!(Surface::Cli.to_string(), "cli");
        assert_eq!(Surface::Mcp.to_string(), "mcp");
        assert_eq!(Surface::ALL.len(), 4);
    }
}
