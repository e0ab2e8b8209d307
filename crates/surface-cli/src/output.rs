//! Output mode resolution and the rendering sink seam.

use std::str::FromStr;

use manifold_error::DispatchError;
use parking_lot::Mutex;

/// How results are rendered on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Terminal-friendly text.
    #[default]
    Human,
    /// Pretty-printed JSON.
    Json,
    /// One JSON value per line (arrays stream element-wise).
    Jsonl,
}

impl OutputMode {
    /// Accepted values for the shared `--output` flag.
    pub const VALUES: [&'static str; 3] = ["human", "json", "jsonl"];

    /// Stable name, as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
            Self::Jsonl => "jsonl",
        }
    }
}

impl FromStr for OutputMode {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "jsonl" => Ok(Self::Jsonl),
            other => Err(DispatchError::validation(format!(
                "unknown output mode `{other}` (expected human, json, or jsonl)"
            ))),
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where rendered results and errors go.
///
/// The dispatch core never writes to stdout/stderr directly; it hands the
/// final value to a sink. The default sink writes to the process streams;
/// tests swap in [`CaptureSink`].
pub trait OutputSink: Send + Sync {
    /// Render a success payload.
    fn emit(&self, value: &serde_json::Value, mode: OutputMode);

    /// Render an error. Human mode is a single-line summary; structured
    /// modes include the category and context.
    fn emit_error(&self, error: &DispatchError, mode: OutputMode);
}

/// Sink writing results to stdout and errors to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&self, value: &serde_json::Value, mode: OutputMode) {
        match mode {
            OutputMode::Human => match value {
                // Bare strings print raw so handlers can emit preformatted text.
                serde_json::Value::String(text) => println!("{text}"),
                serde_json::Value::Null => {}
                other => println!(
                    "{}",
                    serde_json::to_string_pretty(other).unwrap_or_default()
                ),
            },
            OutputMode::Json => println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_default()
            ),
            OutputMode::Jsonl => match value {
                serde_json::Value::Array(items) => {
                    for item in items {
                        println!("{}", serde_json::to_string(item).unwrap_or_default());
                    }
                }
                other => println!("{}", serde_json::to_string(other).unwrap_or_default()),
            },
        }
    }

    fn emit_error(&self, error: &DispatchError, mode: OutputMode) {
        match mode {
            OutputMode::Human => eprintln!("error: {error}"),
            OutputMode::Json | OutputMode::Jsonl => eprintln!(
                "{}",
                serde_json::to_string(&serde_json::json!({"error": error})).unwrap_or_default()
            ),
        }
    }
}

/// Sink that records everything it is asked to render. Test harness aid.
#[derive(Debug, Default)]
pub struct CaptureSink {
    values: Mutex<Vec<(serde_json::Value, OutputMode)>>,
    errors: Mutex<Vec<(DispatchError, OutputMode)>>,
}

impl CaptureSink {
    /// An empty capture sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every success payload emitted so far.
    pub fn values(&self) -> Vec<(serde_json::Value, OutputMode)> {
        self.values.lock().clone()
    }

    /// Every error emitted so far.
    pub fn errors(&self) -> Vec<(DispatchError, OutputMode)> {
        self.errors.lock().clone()
    }
}

impl OutputSink for CaptureSink {
    fn emit(&self, value: &serde_json::Value, mode: OutputMode) {
        self.values.lock().push((value.clone(), mode));
    }

    fn emit_error(&self, error: &DispatchError, mode: OutputMode) {
        self.errors.lock().push((error.clone(), mode));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("human", OutputMode::Human)]
    #[case("json", OutputMode::Json)]
    #[case("jsonl", OutputMode::Jsonl)]
    fn parses_known_modes(#[case] input: &str, #[case] expected: OutputMode) {
        assert_eq!(input.parse::<OutputMode>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_mode_as_validation() {
        let err = "yaml".parse::<OutputMode>().unwrap_err();
        assert_eq!(err.category, manifold_error::ErrorCategory::Validation);
    }

    #[test]
    fn capture_sink_records_in_order() {
        let sink = CaptureSink::new();
        sink.emit(&serde_json::json!(1), OutputMode::Json);
        sink.emit(&serde_json::json!(2), OutputMode::Human);
        let values = sink.values();
        assert_eq!(values[0].0, serde_json::json!(1));
        assert_eq!(values[1].1, OutputMode::Human);
    }
}
