//! Core types for the state chain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the state slot holding the pending exception.
pub const EXCEPTION: &str = "exception";

/// Parameter name that binds to the whole state container.
pub const STATE: &str = "state";

/// Parameter name that binds to the running chain.
pub const CHAIN: &str = "chain";

/// Names that never live in the state's field map.
pub const RESERVED_NAMES: [&str; 3] = [EXCEPTION, STATE, CHAIN];

/// Unique identifier for one `run` call on a chain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl fmt::Debug for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunId({})", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a step relates to a pending exception.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Skipped while an exception is pending.
    Unwanted,
    /// Runs whether or not an exception is pending.
    Accepted,
    /// Runs only while an exception is pending (a handler).
    Required,
}

impl Disposition {
    /// Whether a step with this disposition is skipped in the given mode.
    pub fn skips(self, in_exception: bool) -> bool {
        match self {
            Disposition::Unwanted => in_exception,
            Disposition::Accepted => false,
            Disposition::Required => !in_exception,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Disposition::Unwanted => "unwanted",
            Disposition::Accepted => "accepted",
            Disposition::Required => "required",
        };
        f.write_str(s)
    }
}

/// Where to insert a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Position {
    Start,
    #[default]
    End,
    /// Absolute index; everything at or after it shifts right.
    Index(usize),
}

impl From<usize> for Position {
    fn from(index: usize) -> Self {
        Position::Index(index)
    }
}

/// Chain-wide configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Propagate step failures immediately instead of fast-forwarding.
    /// Default: false
    pub raise_immediately: bool,

    /// Max buffered run events per subscriber before it is dropped.
    /// Default: 1000
    pub event_buffer_size: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            raise_immediately: false,
            event_buffer_size: 1000,
        }
    }
}

impl ChainConfig {
    /// Parse configuration from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Per-call overrides for `Chain::run`.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Overrides `ChainConfig::raise_immediately` when set.
    pub raise_immediately: Option<bool>,

    /// Stop the normal walk after the step with this name.
    pub return_after: Option<String>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise_immediately(mut self, raise: bool) -> Self {
        self.raise_immediately = Some(raise);
        self
    }

    pub fn return_after(mut self, name: impl Into<String>) -> Self {
        self.return_after = Some(name.into());
        self
    }
}
