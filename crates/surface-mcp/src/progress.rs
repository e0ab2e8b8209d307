//! Bridging transport-neutral stream events to protocol progress
//! notifications.

use std::sync::Arc;

use manifold_action::{ProgressCallback, StreamEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Opaque token the caller supplied with its request; echoed on every
/// notification so the caller can correlate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    /// Numeric token.
    Number(i64),
    /// String token.
    Text(String),
}

/// One out-of-band progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressNotification {
    /// The caller's token, echoed back.
    pub progress_token: ProgressToken,
    /// Monotonically non-decreasing progress value.
    pub progress: u64,
    /// Total units, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Short human-readable note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Where notifications go; the transport supplies this.
pub type ProgressNotifier = Arc<dyn Fn(ProgressNotification) + Send + Sync>;

/// Converts [`StreamEvent`]s into progress notifications.
///
/// `progress` events pass `current`/`total` through; `start` and `step`
/// events have no numeric value of their own, so they carry the last known
/// value forward instead of resetting to zero. A misbehaving handler that
/// sends a lower `current` is clamped up, so the emitted sequence is
/// non-decreasing no matter what it observes.
pub struct ProgressBridge {
    token: ProgressToken,
    notifier: ProgressNotifier,
    state: Mutex<BridgeState>,
}

#[derive(Default)]
struct BridgeState {
    last_progress: u64,
    last_total: Option<u64>,
}

impl ProgressBridge {
    /// A bridge forwarding to `notifier` under `token`.
    pub fn new(token: ProgressToken, notifier: ProgressNotifier) -> Arc<Self> {
        Arc::new(Self {
            token,
            notifier,
            state: Mutex::new(BridgeState::default()),
        })
    }

    /// The callback to wire into the action context.
    pub fn callback(self: &Arc<Self>) -> ProgressCallback {
        let bridge = Arc::clone(self);
        Arc::new(move |event| bridge.observe(event))
    }

    fn observe(&self, event: StreamEvent) {
        let mut state = self.state.lock();
        let notification = match event {
            StreamEvent::Progress {
                current,
                total,
                message,
            } => {
                let clamped = current.max(state.last_progress);
                state.last_progress = clamped;
                if total.is_some() {
                    state.last_total = total;
                }
                ProgressNotification {
                    progress_token: self.token.clone(),
                    progress: clamped,
                    total: state.last_total,
                    message,
                }
            }
            StreamEvent::Start { command, .. } => ProgressNotification {
                progress_token: self.token.clone(),
                progress: state.last_progress,
                total: state.last_total,
                message: Some(command),
            },
            StreamEvent::Step { name, status, .. } => ProgressNotification {
                progress_token: self.token.clone(),
                progress: state.last_progress,
                total: state.last_total,
                message: Some(format!("{name}: {}", status.as_str())),
            },
        };
        drop(state);
        (self.notifier)(notification);
    }
}

impl std::fmt::Debug for ProgressBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBridge")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use manifold_action::StepStatus;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn collecting_bridge() -> (Arc<ProgressBridge>, Arc<Mutex<Vec<ProgressNotification>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let bridge = ProgressBridge::new(
            ProgressToken::Number(7),
            Arc::new(move |notification| sink.lock().push(notification)),
        );
        (bridge, seen)
    }

    #[test]
    fn progress_passes_current_and_total_through() {
        let (bridge, seen) = collecting_bridge();
        let callback = bridge.callback();
        callback(StreamEvent::progress(3, 10));
        let seen = seen.lock();
        assert_eq!(seen[0].progress, 3);
        assert_eq!(seen[0].total, Some(10));
        assert_eq!(seen[0].progress_token, ProgressToken::Number(7));
    }

    #[test]
    fn start_and_step_carry_last_value_forward() {
        let (bridge, seen) = collecting_bridge();
        let callback = bridge.callback();
        callback(StreamEvent::progress(5, 10));
        callback(StreamEvent::step("lint", StepStatus::Succeeded));
        callback(StreamEvent::start("docs.sync"));
        let seen = seen.lock();
        assert_eq!(seen[1].progress, 5);
        assert_eq!(seen[1].message.as_deref(), Some("lint: succeeded"));
        assert_eq!(seen[2].progress, 5);
        assert_eq!(seen[2].total, Some(10));
    }

    #[test]
    fn regressing_progress_is_clamped_up() {
        let (bridge, seen) = collecting_bridge();
        let callback = bridge.callback();
        callback(StreamEvent::progress(8, 10));
        callback(StreamEvent::progress(2, 10));
        let seen = seen.lock();
        assert_eq!(seen[1].progress, 8);
    }

    #[test]
    fn total_persists_once_seen() {
        let (bridge, seen) = collecting_bridge();
        let callback = bridge.callback();
        callback(StreamEvent::progress(1, 4));
        callback(StreamEvent::progress_open_ended(2));
        let seen = seen.lock();
        assert_eq!(seen[1].total, Some(4));
        assert_eq!(seen[1].progress, 2);
    }

    #[test]
    fn notification_serializes_camel_case() {
        let notification = ProgressNotification {
            progress_token: ProgressToken::Text("abc".into()),
            progress: 1,
            total: None,
            message: None,
        };
        assert_eq!(
            serde_json::to_value(&notification).unwrap(),
            serde_json::json!({"progressToken": "abc", "progress": 1})
        );
    }

    proptest! {
        // For any event sequence, emitted progress never decreases.
        #[test]
        fn emitted_progress_is_monotonic(events in prop::collection::vec(arb_event(), 0..64)) {
            let (bridge, seen) = collecting_bridge();
            let callback = bridge.callback();
            for event in events {
                callback(event);
            }
            let seen = seen.lock();
            for pair in seen.windows(2) {
                prop_assert!(pair[1].progress >= pair[0].progress);
            }
        }
    }

    fn arb_event() -> impl Strategy<Value = StreamEvent> {
        prop_oneof![
            (any::<u64>(), prop::option::of(any::<u64>())).prop_map(|(current, total)| {
                StreamEvent::Progress {
                    current,
                    total,
                    message: None,
                }
            }),
            Just(StreamEvent::start("op")),
            Just(StreamEvent::step("step", StepStatus::Started)),
        ]
    }
}
