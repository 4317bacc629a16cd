//! The chain: an ordered, editable list of steps.

use crate::error::{ChainError, Result};
use crate::events::{EventBus, EventFilter, EventHandle, SubscriptionId};
use crate::step::Step;
use crate::types::{ChainConfig, Disposition, Position};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use super::modify::ChainModifier;

/// An algorithm modelled as an ordered list of steps sharing one state.
///
/// Structural edits take `&self`: the step list sits behind a lock and each
/// run works from a snapshot, so an edit never shows up half-applied in a
/// run that is already going.
pub struct Chain {
    pub(super) steps: RwLock<Vec<Arc<Step>>>,
    pub(super) config: ChainConfig,
    pub(super) events: EventBus,
    pub(super) next_run: AtomicU64,
}

impl Chain {
    /// Build a chain with the default configuration.
    pub fn new<I>(steps: I) -> Result<Self>
    where
        I: IntoIterator<Item = Step>,
    {
        Self::with_config(steps, ChainConfig::default())
    }

    pub fn with_config<I>(steps: I, config: ChainConfig) -> Result<Self>
    where
        I: IntoIterator<Item = Step>,
    {
        let steps = steps
            .into_iter()
            .map(|step| step.validate().map(|()| Arc::new(step)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_parts(steps, config))
    }

    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), ChainConfig::default())
    }

    pub(super) fn from_parts(steps: Vec<Arc<Step>>, config: ChainConfig) -> Self {
        let events = EventBus::with_buffer_size(config.event_buffer_size);
        Self {
            steps: RwLock::new(steps),
            config,
            events,
            next_run: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Independent chain with the same steps and configuration.
    ///
    /// Subscribers and run numbering are not carried over.
    pub fn copy(&self) -> Self {
        Self::from_parts(self.steps(), self.config.clone())
    }

    // --- Queries ---

    /// Snapshot of the current step list.
    pub fn steps(&self) -> Vec<Arc<Step>> {
        self.steps.read().clone()
    }

    pub fn len(&self) -> usize {
        self.steps.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.read().is_empty()
    }

    /// Step names in execution order.
    pub fn get_names(&self) -> Vec<String> {
        self.steps
            .read()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// The step with this exact name.
    pub fn lookup(&self, name: &str) -> Result<Arc<Step>> {
        let steps = self.steps.read();
        let index = find_unique(&steps, name)?;
        Ok(Arc::clone(&steps[index]))
    }

    /// Index of the named step.
    pub fn position(&self, name: &str) -> Result<usize> {
        find_unique(&self.steps.read(), name)
    }

    /// Insertion index that places a step just before `name`.
    pub fn before(&self, name: &str) -> Result<usize> {
        self.position(name)
    }

    /// Insertion index that places a step just after `name`.
    pub fn after(&self, name: &str) -> Result<usize> {
        Ok(self.position(name)? + 1)
    }

    // --- Structural Edits ---

    /// Insert one step; returns the stored step.
    pub fn add(&self, step: Step, position: impl Into<Position>) -> Result<Arc<Step>> {
        self.add_with(step, position, None)
    }

    /// Insert one step, optionally overriding its inferred disposition.
    pub fn add_with(
        &self,
        step: Step,
        position: impl Into<Position>,
        disposition: Option<Disposition>,
    ) -> Result<Arc<Step>> {
        let step = match disposition {
            Some(d) => step.with_disposition(d),
            None => step,
        };
        step.validate()?;
        let step = Arc::new(step);

        let mut steps = self.steps.write();
        let index = resolve_position(position.into(), steps.len())?;
        steps.insert(index, Arc::clone(&step));
        tracing::debug!(step = step.name(), index, "added step");
        Ok(step)
    }

    /// Append a step.
    pub fn push(&self, step: Step) -> Result<Arc<Step>> {
        self.add(step, Position::End)
    }

    /// Insert several steps, in order, just before `name`.
    pub fn insert_before<I>(&self, name: &str, new_steps: I) -> Result<()>
    where
        I: IntoIterator<Item = Step>,
    {
        self.insert_relative(name, new_steps, 0)
    }

    /// Insert several steps, in order, just after `name`.
    pub fn insert_after<I>(&self, name: &str, new_steps: I) -> Result<()>
    where
        I: IntoIterator<Item = Step>,
    {
        self.insert_relative(name, new_steps, 1)
    }

    fn insert_relative<I>(&self, name: &str, new_steps: I, offset: usize) -> Result<()>
    where
        I: IntoIterator<Item = Step>,
    {
        let new_steps = new_steps
            .into_iter()
            .map(|step| step.validate().map(|()| Arc::new(step)))
            .collect::<Result<Vec<_>>>()?;

        let mut steps = self.steps.write();
        let index = find_unique(&steps, name)? + offset;
        steps.splice(index..index, new_steps);
        Ok(())
    }

    /// Remove the named steps. Nothing is removed unless every name matches.
    pub fn remove(&self, names: &[&str]) -> Result<()> {
        let mut steps = self.steps.write();
        let mut doomed = Vec::with_capacity(names.len());
        for name in names {
            let index = find_unique(&steps, name)?;
            if !doomed.contains(&index) {
                doomed.push(index);
            }
        }
        doomed.sort_unstable();
        for index in doomed.into_iter().rev() {
            let step = steps.remove(index);
            tracing::debug!(step = step.name(), index, "removed step");
        }
        Ok(())
    }

    /// Remove the step at `index`.
    pub fn remove_at(&self, index: usize) -> Result<Arc<Step>> {
        let mut steps = self.steps.write();
        if index >= steps.len() {
            return Err(ChainError::InvalidPosition {
                index,
                len: steps.len(),
            });
        }
        Ok(steps.remove(index))
    }

    /// Swap the named step for another, keeping its place in the order.
    pub fn replace(&self, name: &str, step: Step) -> Result<Arc<Step>> {
        step.validate()?;
        let step = Arc::new(step);
        let mut steps = self.steps.write();
        let index = find_unique(&steps, name)?;
        steps[index] = Arc::clone(&step);
        Ok(step)
    }

    /// Start a rebuild of the step list from its current contents.
    pub fn modify(&self) -> ChainModifier<'_> {
        ChainModifier::new(self)
    }

    // --- Run Events ---

    pub fn subscribe(&self, filter: EventFilter) -> EventHandle {
        self.events.subscribe(filter)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.events.unsubscribe(id)
    }
}

impl Clone for Chain {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("steps", &self.get_names())
            .field("config", &self.config)
            .finish()
    }
}

/// Index of the one step named `name`.
pub(crate) fn find_unique(steps: &[Arc<Step>], name: &str) -> Result<usize> {
    let mut matches = steps
        .iter()
        .enumerate()
        .filter(|(_, s)| s.name() == name)
        .map(|(i, _)| i);

    let first = matches
        .next()
        .ok_or_else(|| ChainError::StepNotFound(name.to_string()))?;
    let others = matches.count();
    if others > 0 {
        return Err(ChainError::AmbiguousName {
            name: name.to_string(),
            count: others + 1,
        });
    }
    Ok(first)
}

fn resolve_position(position: Position, len: usize) -> Result<usize> {
    match position {
        Position::Start => Ok(0),
        Position::End => Ok(len),
        Position::Index(index) if index <= len => Ok(index),
        Position::Index(index) => Err(ChainError::InvalidPosition { index, len }),
    }
}
