//! Dependency resolution: which state fields a step receives.

use crate::chain::Chain;
use crate::error::{ChainError, Result};
use crate::exception::Exception;
use crate::state::State;
use crate::step::Step;
use crate::types::{CHAIN, EXCEPTION, STATE};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// How one declared parameter is satisfied.
#[derive(Clone, Debug)]
pub enum Binding {
    /// Value taken from a state field of the same name.
    Field(Value),
    /// Field absent; the parameter's default is used.
    Default(Value),
    /// The whole state container.
    State,
    /// The running chain.
    Chain,
    /// The exception slot, pending or not.
    Exception(Option<Exception>),
}

/// Outcome of resolving a step's parameters against a state.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub bindings: Vec<(String, Binding)>,
    /// Required parameters with no matching field, in declaration order.
    pub missing: Vec<String>,
    pub satisfied: bool,
}

/// Resolve `step`'s declared parameters against `state`.
pub fn resolve(step: &Step, state: &State) -> Resolution {
    let signature = step.signature();
    let mut bindings = Vec::with_capacity(signature.params().len());
    let mut missing = Vec::new();

    for param in signature.params() {
        let name = param.name();
        let binding = match name {
            STATE => Some(Binding::State),
            CHAIN => Some(Binding::Chain),
            EXCEPTION => Some(Binding::Exception(state.exception().cloned())),
            _ => match (state.value(name), param.default()) {
                (Some(value), _) => Some(Binding::Field(value.clone())),
                (None, Some(default)) => Some(Binding::Default(default.clone())),
                (None, None) => None,
            },
        };
        match binding {
            Some(binding) => bindings.push((name.to_string(), binding)),
            None => missing.push(name.to_string()),
        }
    }

    let satisfied = missing.is_empty() || signature.accepts_rest();
    Resolution {
        bindings,
        missing,
        satisfied,
    }
}

impl Resolution {
    /// Turn the bindings into call arguments, failing if unsatisfied.
    pub fn into_arguments<'a>(
        self,
        step: &'a Step,
        state: &'a mut State,
        chain: &'a Chain,
    ) -> Result<Arguments<'a>> {
        if !self.satisfied {
            return Err(ChainError::MissingArguments {
                step: step.name().to_string(),
                missing: self.missing,
            });
        }

        let mut values = Map::new();
        let mut exception = None;
        for (name, binding) in self.bindings {
            match binding {
                Binding::Field(value) | Binding::Default(value) => {
                    values.insert(name, value);
                }
                Binding::Exception(pending) => exception = pending,
                Binding::State | Binding::Chain => {}
            }
        }

        Ok(Arguments {
            step: step.name(),
            values,
            exception,
            state,
            chain,
        })
    }
}

/// The arguments a step is invoked with.
pub struct Arguments<'a> {
    step: &'a str,
    values: Map<String, Value>,
    exception: Option<Exception>,
    state: &'a mut State,
    chain: &'a Chain,
}

impl<'a> Arguments<'a> {
    /// Name of the step being invoked.
    pub fn step(&self) -> &str {
        self.step
    }

    /// Raw bound value.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Typed bound value; fails if the parameter is unbound or mistyped.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| self.invalid(name, "parameter is not bound".to_string()))?;
        serde_json::from_value(value.clone()).map_err(|e| self.invalid(name, e.to_string()))
    }

    /// Typed bound value where `null` and unbound both read as `None`.
    pub fn opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| self.invalid(name, e.to_string())),
        }
    }

    /// The pending exception, if the step declared `exception`.
    pub fn exception(&self) -> Option<&Exception> {
        self.exception.as_ref()
    }

    pub fn state(&self) -> &State {
        self.state
    }

    /// The whole state container, for steps that edit it directly.
    pub fn state_mut(&mut self) -> &mut State {
        self.state
    }

    pub fn chain(&self) -> &Chain {
        self.chain
    }

    fn invalid(&self, name: &str, reason: String) -> ChainError {
        ChainError::InvalidArgument {
            step: self.step.to_string(),
            name: name.to_string(),
            reason,
        }
    }
}
