// src/process/mod.rs

//! Cross-platform tool-process lifecycle: spawn, capture, timeouts,
//! cancellation, tree kill.
//!
//! This layer classifies outcomes; it never decides success/failure and never
//! writes user-visible diagnostics — that is the driver's job.

pub mod cancel;
pub mod child;
pub mod kill_tree;

pub use cancel::{AbortCause, AbortSignal, AbortToken};
pub use child::{ChildProcess, ExitReason, SpawnError, SpawnRequest, split_command_arguments};
pub use kill_tree::kill_process_tree;
