//! The pending-failure value threaded through a run.

use std::fmt;
use std::sync::Arc;

/// A failure raised by a step.
///
/// Cloning is cheap and preserves identity: every clone refers to the same
/// underlying error, so the value a handler sees is the value the caller
/// receives if nothing clears it.
#[derive(Clone)]
pub struct Exception {
    step: Arc<str>,
    error: Arc<anyhow::Error>,
}

impl Exception {
    pub fn new(step: impl Into<String>, error: anyhow::Error) -> Self {
        Self {
            step: Arc::from(step.into()),
            error: Arc::new(error),
        }
    }

    /// Name of the step that raised.
    pub fn step(&self) -> &str {
        &self.step
    }

    /// The original error.
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    /// Recover the original error type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<E>()
    }

    pub fn is<E>(&self) -> bool
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.is::<E>()
    }

    /// True if both handles refer to the same raised error.
    pub fn same_as(&self, other: &Exception) -> bool {
        Arc::ptr_eq(&self.error, &other.error)
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exception")
            .field("step", &self.step)
            .field("error", &self.error)
            .finish()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.error, f)
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}
