// src/process/cancel.rs

//! Cooperative cancellation for tool processes.
//!
//! Two tiers of cancellation exist: a *main* token that is set when the whole
//! build is shutting down (Ctrl-C), and a *local* token owned by a single
//! execution attempt. Both are plain shared flags observed by polling from
//! the process drain loop; nothing is delivered asynchronously.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared cancellation flag. Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortToken(Arc<AtomicBool>);

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why an operation was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCause {
    /// The whole build is shutting down (main token).
    Shutdown,
    /// This specific operation was cancelled (local token).
    Cancelled,
}

impl fmt::Display for AbortCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortCause::Shutdown => write!(f, "build shutdown"),
            AbortCause::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

/// The pair of tokens a [`ChildProcess`](super::ChildProcess) polls during its
/// drain loop. Either tier may be absent.
///
/// `check()` is the single "is cancelled, and why" query; the main token takes
/// precedence when both are set.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    main: Option<AbortToken>,
    local: Option<AbortToken>,
}

impl AbortSignal {
    pub fn new(main: Option<AbortToken>, local: Option<AbortToken>) -> Self {
        Self { main, local }
    }

    /// A signal that never fires.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn check(&self) -> Option<AbortCause> {
        if self.main.as_ref().is_some_and(AbortToken::is_set) {
            return Some(AbortCause::Shutdown);
        }
        if self.local.as_ref().is_some_and(AbortToken::is_set) {
            return Some(AbortCause::Cancelled);
        }
        None
    }
}
