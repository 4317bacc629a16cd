//! # State Chain
//!
//! Model an algorithm as an ordered list of steps that operate on a shared
//! state, instead of calling one another. The list can be inspected and
//! edited at runtime, which makes it a good backbone for middleware and
//! plugin-style processing pipelines.
//!
//! ## Core Concepts
//!
//! - **Steps**: Named units of work that declare the state fields they take
//! - **State**: One mutable container threaded through every step of a run
//! - **Dispositions**: Whether a step runs normally, always, or only as an
//!   exception handler
//! - **Fast-forward**: After a failure, only exception handlers run until one
//!   clears it; uncleared failures reach the caller unchanged
//!
//! ## Example
//!
//! ```ignore
//! use state_chain::{Chain, RunOptions, State, Step, Updates};
//!
//! let chain = Chain::new([
//!     Step::new("foo", |_| Ok(Some(Updates::new().set("baz", 1)))),
//!     Step::new("bar", |_| Ok(Some(Updates::new().set("buz", 2)))),
//!     Step::new("bloo", |args| {
//!         let sum = args.get::<i64>("baz")? + args.get::<i64>("buz")?;
//!         Ok(Some(Updates::new().set("sum", sum)))
//!     })
//!     .param("baz")
//!     .param("buz"),
//! ])?;
//!
//! let state = chain.run(State::new(), RunOptions::default())?;
//! assert_eq!(state.get::<i64>("sum")?, Some(3));
//! ```

pub mod chain;
pub mod error;
pub mod events;
pub mod exception;
pub mod filters;
pub mod resolver;
pub mod source;
pub mod state;
pub mod step;
pub mod types;

// Re-exports
pub use chain::{Chain, ChainModifier};
pub use error::{ChainError, Result};
pub use events::{
    DropReason, EventBus, EventFilter, EventHandle, RunEvent, RunOutcome, SkipReason,
    SubscriptionId,
};
pub use exception::Exception;
pub use resolver::{resolve, Arguments, Binding, Resolution};
pub use source::{StepRegistry, StepSource};
pub use state::{State, Updates};
pub use step::{Param, Signature, Step, StepFn, StepResult};
pub use types::*;
