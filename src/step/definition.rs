//! Named units of work.

use super::signature::{Param, Signature};
use crate::error::{ChainError, Result};
use crate::resolver::Arguments;
use crate::state::Updates;
use crate::types::{Disposition, EXCEPTION};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// What a step body returns: updates to merge, nothing, or a failure.
pub type StepResult = anyhow::Result<Option<Updates>>;

/// The callable part of a step.
pub trait StepFn: Send + Sync {
    fn call(&self, args: Arguments<'_>) -> StepResult;
}

impl<F> StepFn for F
where
    F: for<'a> Fn(Arguments<'a>) -> StepResult + Send + Sync,
{
    fn call(&self, args: Arguments<'_>) -> StepResult {
        self(args)
    }
}

/// A named step with its declared parameters.
///
/// Built with the methods below, then handed to a chain, which stores it
/// behind an `Arc` and never mutates it again.
#[derive(Clone)]
pub struct Step {
    name: String,
    callable: Arc<dyn StepFn>,
    signature: Signature,
    /// Explicit override; wins over inference.
    explicit: Option<Disposition>,
    disposition: Disposition,
}

impl Step {
    pub fn new<F>(name: impl Into<String>, callable: F) -> Self
    where
        F: for<'a> Fn(Arguments<'a>) -> StepResult + Send + Sync + 'static,
    {
        Self::from_callable(name, Arc::new(callable))
    }

    pub fn from_callable(name: impl Into<String>, callable: Arc<dyn StepFn>) -> Self {
        Self {
            name: name.into(),
            callable,
            signature: Signature::new(),
            explicit: None,
            disposition: Disposition::Unwanted,
        }
    }

    /// Declare a required parameter.
    pub fn param(self, name: impl Into<String>) -> Self {
        self.with_param(Param::required(name))
    }

    /// Declare a parameter with a default.
    pub fn optional(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.with_param(Param::optional(name, default))
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.signature.push(param);
        self.refresh_disposition();
        self
    }

    /// Declare `exception` without a default: the step only runs as a handler.
    pub fn handles_exception(self) -> Self {
        self.param(EXCEPTION)
    }

    /// Declare `exception` with a null default: the step always runs.
    pub fn accepts_exception(self) -> Self {
        self.optional(EXCEPTION, Value::Null)
    }

    /// Absorb unresolved parameters instead of failing.
    pub fn accepts_rest(mut self) -> Self {
        self.signature.set_rest(true);
        self
    }

    pub fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.explicit = Some(disposition);
        self.refresh_disposition();
        self
    }

    /// Same callable and signature under another name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Same name and signature around a different body.
    pub fn with_callable(mut self, callable: Arc<dyn StepFn>) -> Self {
        self.callable = callable;
        self
    }

    fn refresh_disposition(&mut self) {
        self.disposition = self
            .explicit
            .unwrap_or_else(|| self.signature.infer_disposition());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn callable(&self) -> &Arc<dyn StepFn> {
        &self.callable
    }

    pub fn call(&self, args: Arguments<'_>) -> StepResult {
        self.callable.call(args)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ChainError::InvalidStep(
                "step names must not be empty".to_string(),
            ));
        }
        self.signature
            .validate()
            .map_err(|e| match e {
                ChainError::InvalidStep(reason) => {
                    ChainError::InvalidStep(format!("{}: {}", self.name, reason))
                }
                other => other,
            })
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("disposition", &self.disposition)
            .finish_non_exhaustive()
    }
}
