//! Conditional wrappers for steps.
//!
//! A filtered step keeps its name, signature and disposition; its body just
//! does nothing when the condition says no.

use crate::resolver::Arguments;
use crate::state::State;
use crate::step::{Step, StepFn, StepResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Run `step` only when `predicate` holds for the current state.
pub fn by_predicate<P>(step: Step, predicate: P) -> Step
where
    P: Fn(&State) -> bool + Send + Sync + 'static,
{
    let inner = Arc::clone(step.callable());
    let filtered = move |args: Arguments<'_>| -> StepResult {
        if predicate(args.state()) {
            inner.call(args)
        } else {
            tracing::trace!(step = args.step(), "filtered out");
            Ok(None)
        }
    };
    step.with_callable(Arc::new(filtered) as Arc<dyn StepFn>)
}

/// Run `step` depending on a string field of the state.
///
/// The field's value is looked up in `table`; values not in the table, and
/// a missing or non-string field, fall back to `default`.
pub fn by_field(
    step: Step,
    field: impl Into<String>,
    table: HashMap<String, bool>,
    default: bool,
) -> Step {
    let field = field.into();
    by_predicate(step, move |state| {
        state
            .value(&field)
            .and_then(|v| v.as_str())
            .and_then(|v| table.get(v).copied())
            .unwrap_or(default)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use crate::state::Updates;
    use crate::types::{Disposition, RunOptions};
    use serde_json::json;

    fn mark() -> Step {
        Step::new("mark", |_| Ok(Some(Updates::new().set("marked", true))))
    }

    #[test]
    fn test_by_predicate() {
        let step = by_predicate(mark(), |state| state.contains("go"));
        let chain = Chain::new([step]).unwrap();

        let state = chain.run_default().unwrap();
        assert!(!state.contains("marked"));

        let mut initial = State::new();
        initial.set("go", 1).unwrap();
        let state = chain.run(initial, RunOptions::default()).unwrap();
        assert_eq!(state.value("marked"), Some(&json!(true)));
    }

    #[test]
    fn test_by_field_truth_table() {
        let table = HashMap::from([
            ("/secret/agenda".to_string(), true),
            ("/secret".to_string(), false),
        ]);
        let chain = Chain::new([by_field(mark(), "path", table, true)]).unwrap();

        let run = |path: &str| {
            let mut state = State::new();
            state.set("path", path).unwrap();
            chain
                .run(state, RunOptions::default())
                .unwrap()
                .contains("marked")
        };
        assert!(run("/secret/agenda"));
        assert!(!run("/secret"));
        assert!(run("/public"));
    }

    #[test]
    fn test_filter_keeps_identity() {
        let step = by_predicate(mark().handles_exception(), |_| true);
        assert_eq!(step.name(), "mark");
        assert_eq!(step.disposition(), Disposition::Required);
    }
}
