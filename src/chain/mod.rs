//! The chain and its execution engine.
//!
//! - `structure`: the step list and its structural edits
//! - `run`: the run loop and exception fast-forwarding
//! - `modify`: checked rebuilds of the step list

mod modify;
mod run;
mod structure;

pub use modify::ChainModifier;
pub use structure::Chain;
