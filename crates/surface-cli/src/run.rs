//! Executing a compiled command: map, validate, invoke, render, exit.

use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};
use manifold_action::{ActionContext, ActionRegistry, ActionSpec, CliInvocation};
use manifold_error::DispatchError;
use tracing::Instrument;

use crate::build::{CliBuildOptions, build_cli_commands};
use crate::output::{OutputMode, OutputSink, StdoutSink};

/// Run one action against parsed argv and render the outcome.
///
/// Returns the process exit code: `0` on success unless the payload embeds
/// its own code, otherwise the error category's projection. The pipeline:
///
/// 1. collect the parsed flags into a [`CliInvocation`];
/// 2. apply the binding's pure `map_input`;
/// 3. conform the mapped value against the input schema; a failure is a
///    `validation` error and the handler never runs;
/// 4. invoke the handler inside the request span, on its own task so a
///    contract-violating panic is confined and reported as `internal`;
/// 5. render through the sink and map the Result to an exit code.
pub async fn run_action(
    spec: &ActionSpec,
    matches: &ArgMatches,
    mode: OutputMode,
    sink: &dyn OutputSink,
) -> i32 {
    let Some(binding) = &spec.cli else {
        let err = DispatchError::internal(format!("action `{}` has no CLI binding", spec.id));
        sink.emit_error(&err, mode);
        return err.exit_code();
    };

    let ctx = ActionContext::for_action(&spec.id);
    let invocation = collect_invocation(binding, matches, &ctx);

    let mapped = (binding.map_input)(&invocation);
    let conformed = match spec.input_schema.conform(mapped) {
        Ok(value) => value,
        Err(err) => {
            let err = DispatchError::validation(err.message.clone())
                .with_context(serde_json::json!({"path": err.path}));
            sink.emit_error(&err, mode);
            return err.exit_code();
        }
    };

    let span = ctx.span.clone();
    let future = (spec.handler)(conformed, ctx);
    // Contract: handlers never panic. The spawned task is the runtime
    // boundary that keeps a violation from taking the process down.
    let joined = tokio::spawn(future.instrument(span)).await;
    let result = match joined {
        Ok(result) => result,
        Err(join_err) => Err(DispatchError::internal(format!(
            "handler for `{}` violated the no-panic contract: {join_err}",
            spec.id
        ))),
    };

    match result {
        Ok(output) => {
            sink.emit(&output.value, mode);
            output.exit_code.unwrap_or(0)
        }
        Err(err) => {
            tracing::debug!(action_id = %spec.id, category = %err.category, "action failed");
            sink.emit_error(&err, mode);
            err.exit_code()
        }
    }
}

fn collect_invocation(
    binding: &manifold_action::CliBinding,
    matches: &ArgMatches,
    ctx: &ActionContext,
) -> CliInvocation {
    let mut flags = serde_json::Map::new();
    let mut positionals = Vec::new();
    for option in &binding.options {
        if option.is_positional {
            if let Some(value) = matches.get_one::<String>(&option.name) {
                positionals.push(value.clone());
            }
        } else if option.is_switch {
            if matches.get_flag(&option.name) {
                flags.insert(option.name.clone(), serde_json::Value::Bool(true));
            }
        } else if let Some(value) = matches.get_one::<String>(&option.name) {
            flags.insert(
                option.name.clone(),
                serde_json::Value::String(value.clone()),
            );
        }
    }
    CliInvocation {
        flags,
        positionals,
        cwd: ctx.cwd.clone(),
    }
}

/// The assembled CLI surface: a registry compiled into a root command tree
/// plus the dispatch loop.
pub struct CliSurface {
    registry: Arc<ActionRegistry>,
    options: CliBuildOptions,
    sink: Arc<dyn OutputSink>,
}

impl CliSurface {
    /// A surface over `registry` with default build options and the stdout
    /// sink.
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self {
            registry,
            options: CliBuildOptions::new(),
            sink: Arc::new(StdoutSink),
        }
    }

    /// Replace the build options.
    pub fn with_options(mut self, options: CliBuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the output sink.
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Assemble the root command: the shared `--output` flag plus every
    /// compiled command, grouped commands nested under their group.
    pub fn build_root(&self, bin_name: &str) -> Result<Command, DispatchError> {
        let compiled = build_cli_commands(&self.registry, &self.options)?;

        let mut root = Command::new(bin_name.to_owned())
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                Arg::new("output")
                    .long("output")
                    .global(true)
                    .env("MANIFOLD_OUTPUT")
                    .value_parser(OutputMode::VALUES)
                    .default_value("human")
                    .help("Output mode for results")
                    .action(ArgAction::Set),
            );

        let mut groups: Vec<(String, Vec<Command>)> = Vec::new();
        for entry in compiled {
            match entry.group {
                None => root = root.subcommand(entry.command),
                Some(group) => match groups.iter_mut().find(|(name, _)| *name == group) {
                    Some((_, members)) => members.push(entry.command),
                    None => groups.push((group, vec![entry.command])),
                },
            }
        }
        for (group, members) in groups {
            let mut group_command = Command::new(group).subcommand_required(true);
            for member in members {
                group_command = group_command.subcommand(member);
            }
            root = root.subcommand(group_command);
        }
        Ok(root)
    }

    /// Parse argv and dispatch to the matching action.
    ///
    /// Returns the process exit code. Parser errors print clap's own
    /// diagnostics and exit `2`; `--help`/`--version` exit `0`.
    pub async fn dispatch<I, T>(&self, bin_name: &str, argv: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let root = match self.build_root(bin_name) {
            Ok(root) => root,
            Err(err) => {
                self.sink.emit_error(&err, OutputMode::Human);
                return err.exit_code();
            }
        };

        let matches = match root.try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(err) => {
                let code = if err.use_stderr() { 2 } else { 0 };
                let _ = err.print();
                return code;
            }
        };

        let mode = matches
            .get_one::<String>("output")
            .map(String::as_str)
            .unwrap_or("human")
            .parse::<OutputMode>()
            .unwrap_or_default();

        let Some((action_id, leaf)) = self.resolve(&matches) else {
            let err = DispatchError::internal("no subcommand matched a registered action");
            self.sink.emit_error(&err, mode);
            return err.exit_code();
        };
        let Some(spec) = self.registry.get(&action_id) else {
            let err = DispatchError::not_found(format!("no action with id `{action_id}`"));
            self.sink.emit_error(&err, mode);
            return err.exit_code();
        };
        run_action(spec, leaf, mode, self.sink.as_ref()).await
    }

    /// Walk the matched subcommand path back to the owning action id.
    fn resolve<'m>(&self, matches: &'m ArgMatches) -> Option<(String, &'m ArgMatches)> {
        let compiled = build_cli_commands(&self.registry, &self.options).ok()?;
        let (first, first_matches) = matches.subcommand()?;
        match first_matches.subcommand() {
            // `<group> <command>`
            Some((second, leaf)) => compiled
                .iter()
                .find(|c| c.group.as_deref() == Some(first) && c.command.get_name() == second)
                .map(|c| (c.action_id.clone(), leaf)),
            // bare `<command>`
            None => compiled
                .iter()
                .find(|c| c.group.is_none() && c.command.get_name() == first)
                .map(|c| (c.action_id.clone(), first_matches)),
        }
    }
}

#[cfg(test)]
mod tests {
    use manifold_action::{
        ActionOutput, ActionSpec, CliBinding, CliOption, Surface, handler,
    };
    use manifold_schema::Schema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::output::CaptureSink;

    fn docs_list_spec() -> ActionSpec {
        ActionSpec::new(
            "docs.list",
            Schema::object([("cwd", Schema::string())]),
            handler(|input, _ctx| async move { Ok(ActionOutput::value(input)) }),
        )
        .with_cli(
            CliBinding::new("list")
                .with_group("docs")
                .with_option(CliOption::new("cwd"))
                .with_map_input(|invocation| {
                    // Absent --cwd falls back to the caller's directory.
                    let cwd = invocation
                        .flag("cwd")
                        .map_or_else(|| invocation.cwd.display().to_string(), str::to_owned);
                    json!({"cwd": cwd})
                }),
        )
    }

    fn surface_with(specs: Vec<ActionSpec>) -> (CliSurface, Arc<CaptureSink>) {
        let mut registry = ActionRegistry::new();
        for spec in specs {
            registry.add(spec).unwrap();
        }
        let sink = Arc::new(CaptureSink::new());
        let sink_handle: Arc<dyn OutputSink> = sink.clone();
        let surface = CliSurface::new(Arc::new(registry)).with_sink(sink_handle);
        (surface, sink)
    }

    #[tokio::test]
    async fn map_input_uses_explicit_cwd_flag() {
        let (surface, sink) = surface_with(vec![docs_list_spec()]);
        let code = surface
            .dispatch("manifold", ["manifold", "docs", "list", "--cwd", "/tmp/x"])
            .await;
        assert_eq!(code, 0);
        assert_eq!(sink.values()[0].0, json!({"cwd": "/tmp/x"}));
    }

    #[tokio::test]
    async fn map_input_falls_back_to_current_directory() {
        let (surface, sink) = surface_with(vec![docs_list_spec()]);
        let code = surface.dispatch("manifold", ["manifold", "docs", "list"]).await;
        assert_eq!(code, 0);
        let expected = std::env::current_dir().unwrap().display().to_string();
        assert_eq!(sink.values()[0].0, json!({"cwd": expected}));
    }

    #[tokio::test]
    async fn positionals_reach_map_input_in_order() {
        let spec = ActionSpec::new(
            "docs.mv",
            Schema::object([("src", Schema::string()), ("dest", Schema::string())]),
            handler(|input, _ctx| async move { Ok(ActionOutput::value(input)) }),
        )
        .with_cli(
            CliBinding::new("mv")
                .with_option(CliOption::positional("src").required())
                .with_option(CliOption::positional("dest").required())
                .with_map_input(|invocation| {
                    json!({
                        "src": invocation.positional(0),
                        "dest": invocation.positional(1),
                    })
                }),
        );
        let (surface, sink) = surface_with(vec![spec]);

        let code = surface
            .dispatch("manifold", ["manifold", "mv", "a.md", "b.md"])
            .await;
        assert_eq!(code, 0);
        assert_eq!(sink.values()[0].0, json!({"src": "a.md", "dest": "b.md"}));
    }

    #[tokio::test]
    async fn validation_failure_skips_handler_and_exits_2() {
        let spec = ActionSpec::new(
            "strict.run",
            Schema::object([("count", Schema::number())]),
            handler(|_input, _ctx| async move {
                panic!("handler must not run on invalid input");
            }),
        )
        .with_cli(
            CliBinding::new("strict")
                .with_option(CliOption::new("count"))
                .with_map_input(|invocation| {
                    json!({"count": invocation.flag("count").unwrap_or("oops")})
                }),
        );
        let (surface, sink) = surface_with(vec![spec]);

        let code = surface.dispatch("manifold", ["manifold", "strict"]).await;
        assert_eq!(code, 2);
        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0.category, manifold_error::ErrorCategory::Validation);
        assert!(sink.values().is_empty());
    }

    #[tokio::test]
    async fn handler_error_maps_to_category_exit_code() {
        let spec = ActionSpec::new(
            "missing.thing",
            Schema::object::<_, &str>([]),
            handler(|_input, _ctx| async move {
                Err(DispatchError::not_found("no such thing"))
            }),
        )
        .with_cli(CliBinding::new("missing"));
        let (surface, sink) = surface_with(vec![spec]);

        let code = surface.dispatch("manifold", ["manifold", "missing"]).await;
        assert_eq!(code, 3);
        assert_eq!(sink.errors()[0].0.message, "no such thing");
    }

    #[tokio::test]
    async fn payload_exit_code_overrides_zero() {
        let spec = ActionSpec::new(
            "partial.run",
            Schema::object::<_, &str>([]),
            handler(|_input, _ctx| async move {
                Ok(ActionOutput::value(json!({"ok": 2, "failed": 1})).with_exit_code(4))
            }),
        )
        .with_cli(CliBinding::new("partial"));
        let (surface, sink) = surface_with(vec![spec]);

        let code = surface.dispatch("manifold", ["manifold", "partial"]).await;
        assert_eq!(code, 4);
        assert_eq!(sink.values()[0].0, json!({"ok": 2, "failed": 1}));
    }

    #[tokio::test]
    async fn panicking_handler_is_confined_as_internal() {
        let spec = ActionSpec::new(
            "rogue.panic",
            Schema::object::<_, &str>([]),
            handler(|_input, _ctx| async move { panic!("contract violation") }),
        )
        .with_cli(CliBinding::new("rogue"));
        let (surface, sink) = surface_with(vec![spec]);

        let code = surface.dispatch("manifold", ["manifold", "rogue"]).await;
        assert_eq!(code, 1);
        assert_eq!(sink.errors()[0].0.category, manifold_error::ErrorCategory::Internal);
    }

    #[tokio::test]
    async fn output_mode_resolves_through_shared_flag() {
        let (surface, sink) = surface_with(vec![docs_list_spec()]);
        let code = surface
            .dispatch(
                "manifold",
                ["manifold", "docs", "list", "--cwd", "/x", "--output", "json"],
            )
            .await;
        assert_eq!(code, 0);
        assert_eq!(sink.values()[0].1, OutputMode::Json);
    }

    #[tokio::test]
    async fn parse_error_exits_2_without_dispatch() {
        let (surface, sink) = surface_with(vec![docs_list_spec()]);
        let code = surface
            .dispatch("manifold", ["manifold", "docs", "nonexistent"])
            .await;
        assert_eq!(code, 2);
        assert!(sink.values().is_empty());
    }

    #[tokio::test]
    async fn action_not_on_cli_surface_is_unreachable() {
        let tool_only = ActionSpec::new(
            "tool.only",
            Schema::object::<_, &str>([]),
            handler(|input, _ctx| async move { Ok(ActionOutput::value(input)) }),
        )
        .with_surfaces([Surface::Mcp]);
        let (surface, _sink) = surface_with(vec![tool_only, docs_list_spec()]);

        let root = surface.build_root("manifold").unwrap();
        let names: Vec<&str> = root.get_subcommands().map(Command::get_name).collect();
        assert_eq!(names, vec!["docs"]);
    }
}
