//! Run event types.

use crate::types::RunId;
use serde::{Deserialize, Serialize};

/// Which events a subscriber receives.
#[derive(Clone, Debug)]
pub struct EventFilter {
    /// Only events about these steps (None = all steps).
    /// Run lifecycle events are not step events and ignore this.
    pub steps: Option<Vec<String>>,

    /// Include `RunStarted` / `RunFinished`.
    pub include_lifecycle: bool,

    /// Include `StepSkipped`.
    pub include_skips: bool,

    /// Include `StepInvoked`, `StepRaised` and `ExceptionCleared`.
    pub include_steps: bool,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl EventFilter {
    /// Everything.
    pub fn all() -> Self {
        Self {
            steps: None,
            include_lifecycle: true,
            include_skips: true,
            include_steps: true,
        }
    }

    /// Step events for the named steps only.
    pub fn steps(names: Vec<String>) -> Self {
        Self {
            steps: Some(names),
            include_lifecycle: false,
            include_skips: true,
            include_steps: true,
        }
    }

    /// Run start and finish only.
    pub fn lifecycle() -> Self {
        Self {
            steps: None,
            include_lifecycle: true,
            include_skips: false,
            include_steps: false,
        }
    }

    pub(crate) fn matches(&self, event: &RunEvent) -> bool {
        let step = match event {
            RunEvent::RunStarted { .. } | RunEvent::RunFinished { .. } => {
                return self.include_lifecycle;
            }
            RunEvent::Dropped { .. } => return true,
            RunEvent::StepSkipped { step, .. } => {
                if !self.include_skips {
                    return false;
                }
                step
            }
            RunEvent::StepInvoked { step, .. }
            | RunEvent::StepRaised { step, .. }
            | RunEvent::ExceptionCleared { step, .. } => {
                if !self.include_steps {
                    return false;
                }
                step
            }
        };

        match &self.steps {
            Some(names) => names.iter().any(|n| n == step),
            None => true,
        }
    }
}

/// Why a step was passed over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A handler, and nothing is pending.
    NoException,
    /// Not a handler, and an exception is pending.
    ExceptionPending,
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// Stopped early by `return_after`.
    Stopped { after: String },
    /// A step failure reached the caller.
    Raised { step: String, message: String },
    /// A configuration error (missing arguments, reserved field) aborted the run.
    Aborted { message: String },
}

/// Events emitted while a chain runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    // --- Lifecycle Events ---
    RunStarted {
        run_id: RunId,
        steps: usize,
        /// True if the caller supplied a pending exception.
        in_exception: bool,
    },

    RunFinished {
        run_id: RunId,
        outcome: RunOutcome,
    },

    // --- Step Events ---
    StepInvoked {
        run_id: RunId,
        step: String,
        position: usize,
        in_exception: bool,
    },

    StepSkipped {
        run_id: RunId,
        step: String,
        position: usize,
        reason: SkipReason,
    },

    StepRaised {
        run_id: RunId,
        step: String,
        position: usize,
        message: String,
    },

    /// A step cleared the pending exception.
    ExceptionCleared {
        run_id: RunId,
        step: String,
        position: usize,
    },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to receive run events.
pub struct EventHandle {
    pub id: SubscriptionId,
    pub receiver: crossbeam_channel::Receiver<RunEvent>,
}

impl EventHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<RunEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<RunEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<RunEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything currently buffered.
    pub fn drain(&self) -> Vec<RunEvent> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoked(step: &str) -> RunEvent {
        RunEvent::StepInvoked {
            run_id: RunId(1),
            step: step.to_string(),
            position: 0,
            in_exception: false,
        }
    }

    #[test]
    fn test_filter_by_step_name() {
        let filter = EventFilter::steps(vec!["bar".to_string()]);
        assert!(filter.matches(&invoked("bar")));
        assert!(!filter.matches(&invoked("baz")));
        assert!(!filter.matches(&RunEvent::RunFinished {
            run_id: RunId(1),
            outcome: RunOutcome::Completed,
        }));
    }

    #[test]
    fn test_lifecycle_filter_ignores_steps() {
        let filter = EventFilter::lifecycle();
        assert!(!filter.matches(&invoked("bar")));
        assert!(filter.matches(&RunEvent::RunStarted {
            run_id: RunId(1),
            steps: 3,
            in_exception: false,
        }));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = RunEvent::StepSkipped {
            run_id: RunId(7),
            step: "bloo".to_string(),
            position: 2,
            reason: SkipReason::ExceptionPending,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "step_skipped",
                "run_id": 7,
                "step": "bloo",
                "position": 2,
                "reason": "exception_pending",
            })
        );
    }
}
