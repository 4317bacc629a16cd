//! Declared parameter lists.

use crate::error::{ChainError, Result};
use crate::types::{Disposition, EXCEPTION};
use serde_json::Value;
use std::collections::HashSet;

/// One declared parameter of a step.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    name: String,
    default: Option<Value>,
}

impl Param {
    /// A parameter that must be present in state.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// A parameter bound to `default` when absent from state.
    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// The parameters a step declares, in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
    /// Catch-all that absorbs unresolved parameters.
    rest: bool,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, param: Param) {
        self.params.push(param);
    }

    pub fn set_rest(&mut self, rest: bool) {
        self.rest = rest;
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of parameters without defaults.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
    }

    pub fn accepts_rest(&self) -> bool {
        self.rest
    }

    /// Disposition implied by the `exception` parameter.
    pub fn infer_disposition(&self) -> Disposition {
        match self.get(EXCEPTION) {
            None => Disposition::Unwanted,
            Some(p) if p.is_required() => Disposition::Required,
            Some(_) => Disposition::Accepted,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for param in &self.params {
            if param.name.trim().is_empty() {
                return Err(ChainError::InvalidStep(
                    "parameter names must not be empty".to_string(),
                ));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(ChainError::InvalidStep(format!(
                    "parameter '{}' is declared twice",
                    param.name
                )));
            }
        }
        Ok(())
    }
}
