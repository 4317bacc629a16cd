//! Steps and their declared signatures.
//!
//! A step's parameters are declared once, when the step is built, instead of
//! being discovered by inspecting the callable on every invocation. The
//! signature drives both argument binding and the step's disposition towards
//! a pending exception.

mod definition;
mod signature;

pub use definition::{Step, StepFn, StepResult};
pub use signature::{Param, Signature};
