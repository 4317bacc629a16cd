//! Rebuilding a chain's step list without losing steps by accident.

use crate::error::{ChainError, Result};
use crate::step::Step;
use std::sync::Arc;

use super::structure::{find_unique, Chain};

/// Builder that lays out a new step list from an existing one.
///
/// Every step of the source list must be either kept or discarded before
/// `apply`; anything left over fails with `IncompleteModification` so a
/// refactor can't silently drop a step.
///
/// ```ignore
/// let mut m = chain.modify();
/// m.keep("parse")?.push(Step::new("audit", audit))?.keep("render")?;
/// m.discard("legacy")?;
/// m.apply()?;
/// ```
pub struct ChainModifier<'a> {
    chain: &'a Chain,
    source: Vec<Arc<Step>>,
    accounted: Vec<bool>,
    result: Vec<Arc<Step>>,
}

impl<'a> ChainModifier<'a> {
    pub(super) fn new(chain: &'a Chain) -> Self {
        let source = chain.steps();
        let accounted = vec![false; source.len()];
        Self {
            chain,
            source,
            accounted,
            result: Vec::new(),
        }
    }

    /// Append a source step to the new list.
    pub fn keep(&mut self, name: &str) -> Result<&mut Self> {
        let index = self.claim(name)?;
        self.result.push(Arc::clone(&self.source[index]));
        Ok(self)
    }

    /// Leave a source step out of the new list.
    pub fn discard(&mut self, name: &str) -> Result<&mut Self> {
        self.claim(name)?;
        Ok(self)
    }

    /// Keep every source step not yet accounted for, in source order.
    pub fn keep_remaining(&mut self) -> &mut Self {
        for (index, done) in self.accounted.iter_mut().enumerate() {
            if !*done {
                *done = true;
                self.result.push(Arc::clone(&self.source[index]));
            }
        }
        self
    }

    /// Append a new step.
    pub fn push(&mut self, step: Step) -> Result<&mut Self> {
        step.validate()?;
        self.result.push(Arc::new(step));
        Ok(self)
    }

    /// Source steps neither kept nor discarded so far.
    pub fn unaccounted(&self) -> Vec<String> {
        self.source
            .iter()
            .zip(&self.accounted)
            .filter(|(_, done)| !**done)
            .map(|(s, _)| s.name().to_string())
            .collect()
    }

    /// Names of the new list as built so far.
    pub fn names(&self) -> Vec<String> {
        self.result.iter().map(|s| s.name().to_string()).collect()
    }

    /// Replace the chain's steps with the new list.
    ///
    /// Fails with `ConcurrentModification`, leaving the chain untouched, if
    /// the chain was edited after `modify()` was called.
    pub fn apply(self) -> Result<()> {
        let unaccounted = self.unaccounted();
        if !unaccounted.is_empty() {
            return Err(ChainError::IncompleteModification { unaccounted });
        }

        let mut steps = self.chain.steps.write();
        let unchanged = steps.len() == self.source.len()
            && steps.iter().zip(&self.source).all(|(a, b)| Arc::ptr_eq(a, b));
        if !unchanged {
            return Err(ChainError::ConcurrentModification {
                added: names_missing_from(&steps, &self.source),
                removed: names_missing_from(&self.source, &steps),
            });
        }

        tracing::debug!(steps = self.result.len(), "applied chain modification");
        *steps = self.result;
        Ok(())
    }

    fn claim(&mut self, name: &str) -> Result<usize> {
        let index = find_unique(&self.source, name)?;
        if self.accounted[index] {
            return Err(ChainError::InvalidStep(format!(
                "'{}' was already kept or discarded",
                name
            )));
        }
        self.accounted[index] = true;
        Ok(index)
    }
}

/// Names of steps in `steps` that aren't in `other`, by identity.
fn names_missing_from(steps: &[Arc<Step>], other: &[Arc<Step>]) -> Vec<String> {
    steps
        .iter()
        .filter(|s| !other.iter().any(|o| Arc::ptr_eq(s, o)))
        .map(|s| s.name().to_string())
        .collect()
}
