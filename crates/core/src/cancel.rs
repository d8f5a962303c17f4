//! Cooperative cancellation for long-running server passes.
//!
//! A [`Cancellation`] is handed to discovery, evaluation and resolution.
//! Those passes call [`Cancellation::check`] between discrete steps; the
//! owner of the progress scope flips the flag with [`Cancellation::cancel`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::ProxyError;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every pass holding a clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns `Err(ProxyError::Cancelled)` once cancellation was requested.
    ///
    /// The error converts into the `Cancelled` variant of every subsystem
    /// error, so `cancel.check()?` works from any pass.
    pub fn check(&self) -> Result<(), ProxyError> {
        if self.is_cancelled() {
            Err(ProxyError::Cancelled)
        } else {
            Ok(())
        }
    }
}
