//! Property tests for run ordering and structural edits.

use parking_lot::Mutex;
use proptest::prelude::*;
use state_chain::{Chain, ChainError, Disposition, Position, Step, Updates};
use std::sync::Arc;

#[derive(Clone, Copy, Debug)]
enum Kind {
    Normal,
    Raises,
    /// Handler that clears.
    Clears,
    /// Handler that leaves the exception in place.
    Observes,
    /// Runs in both modes, clears nothing.
    Accepts,
}

fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![
        4 => Just(Kind::Normal),
        2 => Just(Kind::Raises),
        2 => Just(Kind::Clears),
        1 => Just(Kind::Observes),
        1 => Just(Kind::Accepts),
    ]
}

fn build(kinds: &[Kind], calls: &Arc<Mutex<Vec<usize>>>) -> Chain {
    let steps = kinds.iter().enumerate().map(|(i, kind)| {
        let calls = Arc::clone(calls);
        let name = format!("s{i}");
        match kind {
            Kind::Normal => Step::new(name, move |_| {
                calls.lock().push(i);
                Ok(None)
            }),
            Kind::Raises => Step::new(name, move |_| {
                calls.lock().push(i);
                Err(anyhow::anyhow!("raised at {i}"))
            }),
            Kind::Clears => Step::new(name, move |_| {
                calls.lock().push(i);
                Ok(Some(Updates::new().clear_exception()))
            })
            .handles_exception(),
            Kind::Observes => Step::new(name, move |_| {
                calls.lock().push(i);
                Ok(None)
            })
            .handles_exception(),
            Kind::Accepts => Step::new(name, move |_| {
                calls.lock().push(i);
                Ok(None)
            })
            .accepts_exception(),
        }
    });
    Chain::new(steps).unwrap()
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("s{i}")).collect()
}

proptest! {
    #[test]
    fn prop_cursor_only_moves_forward(kinds in prop::collection::vec(kind(), 0..24)) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let chain = build(&kinds, &calls);
        let _ = chain.run_default();

        let calls = calls.lock();
        prop_assert!(calls.windows(2).all(|w| w[0] < w[1]), "calls: {:?}", *calls);
    }

    #[test]
    fn prop_no_raise_runs_every_non_handler(
        kinds in prop::collection::vec(
            prop_oneof![Just(Kind::Normal), Just(Kind::Clears), Just(Kind::Accepts)],
            0..24,
        )
    ) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let chain = build(&kinds, &calls);
        prop_assert!(chain.run_default().is_ok());

        let expected: Vec<usize> = kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| !matches!(k, Kind::Clears))
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(calls.lock().clone(), expected);
    }

    #[test]
    fn prop_handlers_only_run_with_exception(kinds in prop::collection::vec(kind(), 0..24)) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let chain = build(&kinds, &calls);
        let _ = chain.run_default();

        // Track exception mode along the invoked steps.
        let mut pending = false;
        for &i in calls.lock().iter() {
            match kinds[i] {
                Kind::Normal => prop_assert!(!pending, "s{} ran with an exception pending", i),
                Kind::Clears => {
                    prop_assert!(pending, "s{} ran without an exception", i);
                    pending = false;
                }
                Kind::Observes => prop_assert!(pending, "s{} ran without an exception", i),
                Kind::Raises => pending = true,
                Kind::Accepts => {}
            }
        }
    }

    #[test]
    fn prop_uncleared_failure_names_an_invoked_raiser(kinds in prop::collection::vec(kind(), 1..24)) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let chain = build(&kinds, &calls);

        if let Err(err) = chain.run_default() {
            let exception = err.exception().expect("only step failures escape");
            let index: usize = exception.step()[1..].parse().unwrap();
            prop_assert!(calls.lock().contains(&index));
            prop_assert!(matches!(kinds[index], Kind::Raises));
        }
    }

    #[test]
    fn prop_insert_preserves_order(n in 0usize..16, at in 0usize..17) {
        let at = at.min(n);
        let chain = Chain::new(names(n).into_iter().map(|name| Step::new(name, |_| Ok(None)))).unwrap();
        chain.add(Step::new("new", |_| Ok(None)), Position::Index(at)).unwrap();

        let mut expected = names(n);
        expected.insert(at, "new".to_string());
        prop_assert_eq!(chain.get_names(), expected);
    }

    #[test]
    fn prop_positional_queries_are_idempotent(n in 1usize..16, target in 0usize..16) {
        let target = format!("s{}", target % n);
        let chain = Chain::new(names(n).into_iter().map(|name| Step::new(name, |_| Ok(None)))).unwrap();

        let before = chain.before(&target).unwrap();
        let after = chain.after(&target).unwrap();
        prop_assert_eq!(chain.before(&target).unwrap(), before);
        prop_assert_eq!(chain.after(&target).unwrap(), after);
        prop_assert_eq!(after, before + 1);
        prop_assert_eq!(chain.get_names(), names(n));
    }

    #[test]
    fn prop_before_and_after_bracket_target(n in 1usize..16, target in 0usize..16) {
        let target = format!("s{}", target % n);
        let chain = Chain::new(names(n).into_iter().map(|name| Step::new(name, |_| Ok(None)))).unwrap();

        chain.add(Step::new("pre", |_| Ok(None)), chain.before(&target).unwrap()).unwrap();
        chain.add(Step::new("post", |_| Ok(None)), chain.after(&target).unwrap()).unwrap();

        let names = chain.get_names();
        let at = chain.position(&target).unwrap();
        prop_assert_eq!(names[at - 1].as_str(), "pre");
        prop_assert_eq!(names[at + 1].as_str(), "post");
    }

    #[test]
    fn prop_remove_is_all_or_nothing(n in 1usize..12, picks in prop::collection::vec(0usize..24, 1..4)) {
        let chain = Chain::new(names(n).into_iter().map(|name| Step::new(name, |_| Ok(None)))).unwrap();
        let mut doomed: Vec<String> = picks.iter().map(|p| format!("s{p}")).collect();
        doomed.sort();
        doomed.dedup();
        let refs: Vec<&str> = doomed.iter().map(String::as_str).collect();

        let all_present = picks.iter().all(|&p| p < n);
        match chain.remove(&refs) {
            Ok(()) => {
                prop_assert!(all_present);
                prop_assert_eq!(chain.len(), n - doomed.len());
                for name in &doomed {
                    prop_assert!(matches!(chain.lookup(name), Err(ChainError::StepNotFound(_))));
                }
            }
            Err(_) => {
                prop_assert!(!all_present);
                prop_assert_eq!(chain.get_names(), names(n));
            }
        }
    }

    #[test]
    fn prop_override_wins_over_inference(handles in any::<bool>(), pick in 0usize..3) {
        let forced = [Disposition::Unwanted, Disposition::Accepted, Disposition::Required][pick];
        let step = Step::new("s", |_| Ok(None));
        let step = if handles { step.handles_exception() } else { step };

        let chain = Chain::empty();
        let stored = chain.add_with(step, Position::End, Some(forced)).unwrap();
        prop_assert_eq!(stored.disposition(), forced);
    }
}
