//! Ctrl-C handling
//!
//! The handler only raises a flag. Long-running steps poll it and unwind
//! normally, so working directories and child processes are cleaned up by
//! their destructors before the process exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "stop as soon as possible" flag
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise this flag on Ctrl-C instead of terminating the process.
    /// Only one handler can be installed per process.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.set())
    }
}
