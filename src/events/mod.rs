//! Run events for observing chain execution.
//!
//! Every run emits events as it walks the step list:
//! - Run start and finish (with the outcome)
//! - Each step invoked, skipped, or raising
//! - Exceptions cleared by handlers
//!
//! Subscribers get bounded buffers; a subscriber that falls behind is
//! dropped rather than slowing the run down.
//!
//! # Example
//!
//! ```ignore
//! let handle = chain.subscribe(EventFilter::all());
//! chain.run(State::new(), RunOptions::default())?;
//!
//! for event in handle.drain() {
//!     if let RunEvent::StepSkipped { step, reason, .. } = event {
//!         println!("skipped {step}: {reason:?}");
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::EventBus;
pub use types::{
    DropReason, EventFilter, EventHandle, RunEvent, RunOutcome, SkipReason, SubscriptionId,
};
