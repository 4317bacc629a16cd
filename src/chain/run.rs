//! Running a chain: normal flow and exception fast-forwarding.
//!
//! A run walks the step list with one cursor. When a step fails, the failure
//! is stored in the state and the walk continues in exception mode, where
//! only steps that take `exception` are invoked. Each new failure raised
//! while handling another opens one more handling level; clearing the
//! exception closes every open level, and the normal walk carries on from
//! wherever the cursor got to. The cursor never moves backwards.
//!
//! Levels are kept on an explicit stack rather than the call stack, so the
//! nesting depth is bounded only by the number of steps.

use crate::error::{ChainError, Result};
use crate::events::{RunEvent, RunOutcome, SkipReason};
use crate::exception::Exception;
use crate::resolver::resolve;
use crate::state::State;
use crate::step::Step;
use crate::types::{RunId, RunOptions};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, trace};

use super::structure::{find_unique, Chain};

impl Chain {
    /// Run the steps over `state` and return the final state.
    ///
    /// Returns `ChainError::Step` carrying the original failure if a step
    /// raised and nothing cleared it.
    pub fn run(&self, mut state: State, options: RunOptions) -> Result<State> {
        self.run_in_place(&mut state, options)?;
        Ok(state)
    }

    /// Run with an empty state and default options.
    pub fn run_default(&self) -> Result<State> {
        self.run(State::new(), RunOptions::default())
    }

    /// Run over a caller-owned state, which keeps whatever the steps wrote
    /// even if the run fails.
    pub fn run_in_place(&self, state: &mut State, options: RunOptions) -> Result<()> {
        let raise_immediately = options
            .raise_immediately
            .unwrap_or(self.config.raise_immediately);

        let steps = self.steps();
        let stop_at = match options.return_after.as_deref() {
            Some(name) => Some(find_unique(&steps, name)?),
            None => None,
        };

        let run_id = RunId(self.next_run.fetch_add(1, Ordering::SeqCst));
        let in_exception = state.has_exception();
        let _span = tracing::debug_span!("chain_run", run_id = run_id.0).entered();
        debug!(steps = steps.len(), in_exception, raise_immediately, "run started");
        self.events.publish_with(|| RunEvent::RunStarted {
            run_id,
            steps: steps.len(),
            in_exception,
        });

        let mut run = Run {
            chain: self,
            steps: &steps,
            state,
            cursor: 0,
            stop_at,
            stop_reached: false,
            raise_immediately,
            run_id,
        };
        let result = run.dispatch(in_exception);
        let stopped = run.stop_reached && run.cursor < steps.len();

        let outcome = match &result {
            Ok(()) if stopped => RunOutcome::Stopped {
                after: options.return_after.clone().unwrap_or_default(),
            },
            Ok(()) => RunOutcome::Completed,
            Err(ChainError::Step(exception)) => RunOutcome::Raised {
                step: exception.step().to_string(),
                message: exception.to_string(),
            },
            Err(other) => RunOutcome::Aborted {
                message: other.to_string(),
            },
        };
        debug!(?outcome, "run finished");
        self.events
            .publish_with(|| RunEvent::RunFinished { run_id, outcome });

        result
    }
}

/// What came of invoking one step.
enum Invocation {
    Completed,
    Raised(Exception),
}

/// Bookkeeping for one `run` call.
struct Run<'a> {
    chain: &'a Chain,
    steps: &'a [Arc<Step>],
    state: &'a mut State,
    cursor: usize,
    /// Index of the `return_after` step.
    stop_at: Option<usize>,
    /// The cursor has moved past the `return_after` step.
    stop_reached: bool,
    raise_immediately: bool,
    run_id: RunId,
}

impl Run<'_> {
    /// Walk the steps from the cursor until the run ends.
    ///
    /// `handling` holds one entry per open handling level: the position of
    /// the step whose failure opened it. A clear closes every open level. A
    /// run that started with a pending exception finishes at the clear.
    fn dispatch(&mut self, started_in_exception: bool) -> Result<()> {
        let mut handling: Vec<usize> = Vec::new();

        while self.cursor < self.steps.len() {
            let in_exception = started_in_exception || !handling.is_empty();

            // Only the normal walk stops early; a handler search runs on.
            if !in_exception && self.stop_reached {
                break;
            }

            let position = self.cursor;
            let step = Arc::clone(&self.steps[position]);
            self.cursor += 1;
            if self.stop_at == Some(position) {
                self.stop_reached = true;
            }

            if step.disposition().skips(in_exception) {
                trace!(step = step.name(), position, in_exception, "skipped");
                self.skipped(&step, position, in_exception);
                continue;
            }

            trace!(step = step.name(), position, in_exception, "invoking");
            self.publish(|run_id| RunEvent::StepInvoked {
                run_id,
                step: step.name().to_string(),
                position,
                in_exception,
            });

            match self.invoke(&step)? {
                Invocation::Completed => {
                    if in_exception && !self.state.has_exception() {
                        debug!(
                            step = step.name(),
                            position,
                            levels = handling.len(),
                            "exception cleared"
                        );
                        self.publish(|run_id| RunEvent::ExceptionCleared {
                            run_id,
                            step: step.name().to_string(),
                            position,
                        });
                        if started_in_exception {
                            return Ok(());
                        }
                        handling.clear();
                    }
                }
                Invocation::Raised(exception) => {
                    debug!(step = step.name(), position, error = %exception, "step raised");
                    self.publish(|run_id| RunEvent::StepRaised {
                        run_id,
                        step: step.name().to_string(),
                        position,
                        message: exception.to_string(),
                    });

                    if self.raise_immediately {
                        return Err(ChainError::Step(exception));
                    }

                    self.state.set_exception(exception);
                    handling.push(position);
                }
            }
        }

        if started_in_exception || !handling.is_empty() {
            if let Some(exception) = self.state.exception().cloned() {
                debug!(
                    step = exception.step(),
                    levels = handling.len(),
                    "exception unhandled, re-raising"
                );
                return Err(ChainError::Step(exception));
            }
        }
        Ok(())
    }

    /// Resolve arguments, call the step, and merge what it returns.
    ///
    /// Missing arguments and bad updates are errors in how the chain was
    /// put together; they abort the run instead of entering exception mode.
    fn invoke(&mut self, step: &Step) -> Result<Invocation> {
        let args = resolve(step, self.state).into_arguments(step, self.state, self.chain)?;

        match step.call(args) {
            Ok(Some(updates)) => {
                self.state.merge(updates)?;
                Ok(Invocation::Completed)
            }
            Ok(None) => Ok(Invocation::Completed),
            Err(error) => Ok(Invocation::Raised(Exception::new(step.name(), error))),
        }
    }

    fn skipped(&self, step: &Step, position: usize, in_exception: bool) {
        let reason = if in_exception {
            SkipReason::ExceptionPending
        } else {
            SkipReason::NoException
        };
        self.publish(|run_id| RunEvent::StepSkipped {
            run_id,
            step: step.name().to_string(),
            position,
            reason,
        });
    }

    fn publish<F>(&self, make: F)
    where
        F: FnOnce(RunId) -> RunEvent,
    {
        let run_id = self.run_id;
        self.chain.events.publish_with(|| make(run_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Updates;
    use crate::types::ChainConfig;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn set(name: &str, field: &'static str, value: i64) -> Step {
        Step::new(name, move |_| Ok(Some(Updates::new().set(field, value))))
    }

    fn raises(name: &str) -> Step {
        Step::new(name, |_| Err(anyhow::anyhow!("name 'heck' is not defined")))
    }

    fn clear(name: &str) -> Step {
        Step::new(name, |_| {
            Ok(Some(Updates::new().set("val", 666).clear_exception()))
        })
        .handles_exception()
    }

    #[test]
    fn test_runs_in_order() {
        let chain = Chain::new([set("bar", "val", 1), set("baz", "val", 2), set("buz", "val", 3)])
            .unwrap();
        let state = chain.run_default().unwrap();
        assert_eq!(state.value("val"), Some(&json!(3)));
        assert!(!state.has_exception());
    }

    #[test]
    fn test_exception_fast_forwards() {
        let chain = Chain::new([raises("bar"), set("baz", "val", 42), clear("clear")]).unwrap();
        let state = chain.run_default().unwrap();
        assert_eq!(state.value("val"), Some(&json!(666)));
        assert!(!state.has_exception());
    }

    #[test]
    fn test_uncleared_exception_reraises() {
        let chain = Chain::new([raises("bar"), set("baz", "val", 42)]).unwrap();
        let err = chain.run_default().unwrap_err();
        let exception = err.exception().unwrap();
        assert_eq!(exception.step(), "bar");
        assert_eq!(err.to_string(), "name 'heck' is not defined");
    }

    #[test]
    fn test_raise_immediately_from_config() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = Step::new("handler", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Updates::new().clear_exception()))
        })
        .handles_exception();

        let config = ChainConfig {
            raise_immediately: true,
            ..Default::default()
        };
        let chain = Chain::with_config([raises("bar"), handler], config).unwrap();

        assert!(chain.run_default().is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // Per-call override trumps the chain default.
        let state = chain
            .run(State::new(), RunOptions::new().raise_immediately(false))
            .unwrap();
        assert!(!state.has_exception());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_in_place_keeps_state_on_failure() {
        let chain = Chain::new([set("foo", "val", 1), raises("bar")]).unwrap();
        let mut state = State::new();
        let err = chain.run_in_place(&mut state, RunOptions::default());
        assert!(err.is_err());
        assert_eq!(state.value("val"), Some(&json!(1)));
        assert_eq!(state.exception().map(|e| e.step()), Some("bar"));
    }
}
