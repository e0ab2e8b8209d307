//! Compiling registry entries into `clap` command definitions.

use std::collections::HashSet;

use clap::{Arg, ArgAction, Command};
use manifold_action::{ActionRegistry, CliOption, Surface};
use manifold_error::DispatchError;

/// Options for compiling the CLI surface.
#[derive(Debug, Clone, Default)]
pub struct CliBuildOptions {
    /// Action ids sanctioned to declare their own `--json` flag. Empty in
    /// production wiring; exceptions are central, never ad hoc.
    pub json_flag_allow_list: HashSet<String>,
}

impl CliBuildOptions {
    /// Options with an empty allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow-list an action id for a bespoke `--json` flag.
    pub fn allow_json_flag(mut self, action_id: impl Into<String>) -> Self {
        self.json_flag_allow_list.insert(action_id.into());
        self
    }
}

/// A registry entry compiled into its parser definition.
#[derive(Debug, Clone)]
pub struct CompiledCommand {
    /// The action this command dispatches to.
    pub action_id: String,
    /// Group tag; grouped commands nest as `<group> <command>`.
    pub group: Option<String>,
    /// The parser definition.
    pub command: Command,
}

/// A CLI binding that declares a reserved output-mode flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardrailViolation {
    /// The offending action.
    pub action_id: String,
    /// The reserved option it declared.
    pub option: String,
}

/// Output-mode flags reserved for the shared resolution path.
const RESERVED_OUTPUT_FLAGS: [&str; 2] = ["json", "output"];

/// Scan every CLI binding for reserved output-mode flags declared outside
/// the allow-list.
///
/// Output mode must flow through the shared `--output` path; a per-command
/// `--json` silently forks the structured-output behavior. The scan is
/// static, inspecting declarations rather than runtime behavior, and backs the
/// guardrail test as well as the hard failure in [`build_cli_commands`].
pub fn scan_json_guardrail(
    registry: &ActionRegistry,
    options: &CliBuildOptions,
) -> Vec<GuardrailViolation> {
    let mut violations = Vec::new();
    for spec in registry.for_surface(Surface::Cli) {
        let Some(binding) = &spec.cli else { continue };
        if options.json_flag_allow_list.contains(&spec.id) {
            continue;
        }
        for option in &binding.options {
            // Positionals carry no flag and cannot shadow --output.
            if option.is_positional {
                continue;
            }
            if RESERVED_OUTPUT_FLAGS.contains(&option.name.as_str()) {
                violations.push(GuardrailViolation {
                    action_id: spec.id.clone(),
                    option: option.name.clone(),
                });
            }
        }
    }
    violations
}

/// Compile every CLI-bound registry entry into a parser definition.
///
/// Checks the binding/surface invariant and the `--json` guardrail before
/// emitting anything; a single bad binding fails the whole build rather
/// than silently dropping a command.
pub fn build_cli_commands(
    registry: &ActionRegistry,
    options: &CliBuildOptions,
) -> Result<Vec<CompiledCommand>, DispatchError> {
    if let Some(violation) = scan_json_guardrail(registry, options).first() {
        return Err(DispatchError::validation(format!(
            "action `{}` declares reserved flag `--{}`; output mode is resolved \
             through the shared --output path",
            violation.action_id, violation.option
        )));
    }

    let mut compiled = Vec::new();
    for spec in registry.for_surface(Surface::Cli) {
        let Some(binding) = &spec.cli else { continue };
        spec.check_bindings()?;

        let mut command = Command::new(binding.command.clone());
        if let Some(about) = binding.description.clone().or_else(|| spec.description.clone()) {
            command = command.about(about);
        }
        for alias in &binding.aliases {
            command = command.visible_alias(alias.clone());
        }
        for option in &binding.options {
            command = command.arg(build_arg(option));
        }
        compiled.push(CompiledCommand {
            action_id: spec.id.clone(),
            group: binding.group.clone(),
            command,
        });
    }
    Ok(compiled)
}

fn build_arg(option: &CliOption) -> Arg {
    let mut arg = Arg::new(option.name.clone());
    // Positionals carry no flag; clap indexes flag-less args in
    // declaration order.
    if !option.is_positional {
        arg = arg.long(option.name.clone());
        if let Some(short) = option.short {
            arg = arg.short(short);
        }
    }
    if let Some(help) = &option.help {
        arg = arg.help(help.clone());
    }
    if option.is_switch && !option.is_positional {
        arg = arg.action(ArgAction::SetTrue);
    } else {
        arg = arg.action(ArgAction::Set);
        if let Some(value_name) = &option.value_name {
            arg = arg.value_name(value_name.clone());
        }
        if let Some(default) = &option.default {
            arg = arg.default_value(default.clone());
        }
        if option.required {
            arg = arg.required(true);
        }
    }
    arg
}
