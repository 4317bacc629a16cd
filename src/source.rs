//! Building chains from an externally supplied, ordered set of steps.

use crate::chain::Chain;
use crate::error::Result;
use crate::step::Step;
use crate::types::ChainConfig;

/// Anything that can produce named steps in definition order.
pub trait StepSource {
    fn steps(&self) -> Vec<Step>;
}

impl StepSource for Vec<Step> {
    fn steps(&self) -> Vec<Step> {
        self.clone()
    }
}

impl StepSource for [Step] {
    fn steps(&self) -> Vec<Step> {
        self.to_vec()
    }
}

/// Steps collected in registration order, e.g. by a plugin loader.
#[derive(Clone, Debug, Default)]
pub struct StepRegistry {
    steps: Vec<Step>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl StepSource for StepRegistry {
    fn steps(&self) -> Vec<Step> {
        self.steps.clone()
    }
}

impl Chain {
    /// Build a chain from a source, skipping steps whose names start with `_`.
    pub fn from_source<S>(source: &S, config: ChainConfig) -> Result<Chain>
    where
        S: StepSource + ?Sized,
    {
        let steps = source.steps().into_iter().filter(|step| {
            let private = step.name().starts_with('_');
            if private {
                tracing::trace!(step = step.name(), "skipping private step");
            }
            !private
        });
        Chain::with_config(steps, config)
    }
}
