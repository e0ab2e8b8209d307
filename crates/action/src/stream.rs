//! Transport-neutral progress events.
//!
//! Handlers report progress through a plain callback without knowing which
//! transport (terminal spinner, protocol notification, log line) observes
//! it. The callback carries no buffering or backpressure; the adapter that
//! wires it owns any batching or rate limiting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a named step within a streaming operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step has begun.
    Started,
    /// The step finished successfully.
    Succeeded,
    /// The step failed (the operation itself may continue).
    Failed,
    /// The step was skipped.
    Skipped,
}

impl StepStatus {
    /// Stable machine-readable name, matching the wire encoding.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One event in the progress stream of a single logical operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Emitted exactly once, first, per streaming operation.
    Start {
        /// The operation being run (action id or command path).
        command: String,
        /// Wall-clock start time.
        ts: DateTime<Utc>,
    },
    /// A named step changed status. Any number, any order.
    Step {
        /// Step name.
        name: String,
        /// New status.
        status: StepStatus,
        /// How long the step took, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    /// Numeric progress. `current` must be monotonically non-decreasing
    /// within one logical operation as observed by any single adapter.
    Progress {
        /// Units completed so far.
        current: u64,
        /// Total units, when known up front.
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
        /// Short human-readable note.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl StreamEvent {
    /// A `start` event stamped with the current time.
    pub fn start(command: impl Into<String>) -> Self {
        Self::Start {
            command: command.into(),
            ts: Utc::now(),
        }
    }

    /// A `step` event with no duration.
    pub fn step(name: impl Into<String>, status: StepStatus) -> Self {
        Self::Step {
            name: name.into(),
            status,
            duration_ms: None,
        }
    }

    /// A `progress` event with a known total.
    pub fn progress(current: u64, total: u64) -> Self {
        Self::Progress {
            current,
            total: Some(total),
            message: None,
        }
    }

    /// A `progress` event with no known total.
    pub fn progress_open_ended(current: u64) -> Self {
        Self::Progress {
            current,
            total: None,
            message: None,
        }
    }
}

/// Synchronous callback handlers use to report progress.
///
/// Absence means "do not stream": [`ActionContext::emit`] skips the call
/// without side effects, so handlers never branch on whether a transport is
/// listening.
///
/// [`ActionContext::emit`]: crate::context::ActionContext::emit
pub type ProgressCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn events_tag_with_event_field() {
        let event = StreamEvent::step("lint", StepStatus::Succeeded);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "step", "name": "lint", "status": "succeeded"})
        );
    }

    #[test]
    fn progress_omits_absent_fields() {
        let value = serde_json::to_value(StreamEvent::progress_open_ended(7)).unwrap();
        assert_eq!(value, json!({"event": "progress", "current": 7}));
    }

    #[test]
    fn progress_carries_total() {
        let value = serde_json::to_value(StreamEvent::progress(3, 10)).unwrap();
        assert_eq!(value, json!({"event": "progress", "current": 3, "total": 10}));
    }

    #[test]
    fn start_round_trips() {
        let event = StreamEvent::start("docs.sync");
        let text = serde_json::to_string(&event).unwrap();
        let back: StreamEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back, event);
    }
}
