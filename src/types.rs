// src/types.rs

//! Shared value types used across the crate.

/// Name of a build node. Node identity is the output artifact path, so this is
/// a plain path-like string.
pub type NodeName = String;

/// Global build options resolved from `[options]` in the config plus CLI
/// overrides.
///
/// Timeouts are configured in whole seconds and consumed by the process layer
/// in milliseconds; a value of 0 disables the corresponding timer.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Overall wall-clock budget for one tool invocation, in seconds.
    pub process_timeout_secs: u64,

    /// Inactivity budget: maximum time without any stdout/stderr bytes, in
    /// seconds.
    pub process_output_timeout_secs: u64,

    /// Dump captured output for every node, not just failing ones.
    pub show_command_output: bool,

    /// Log the fully-resolved command line before each invocation.
    pub show_command_lines: bool,

    /// Log a one-line summary ("running <node>") before each invocation.
    pub show_command_summary: bool,

    /// Use blake3 input-content stamps in addition to mtime comparison when
    /// deciding staleness.
    pub use_hash_stamps: bool,
}

impl BuildOptions {
    /// Overall timeout in milliseconds (0 = disabled).
    pub fn overall_timeout_ms(&self) -> u64 {
        self.process_timeout_secs * 1000
    }

    /// Inactivity timeout in milliseconds (0 = disabled).
    pub fn inactivity_timeout_ms(&self) -> u64 {
        self.process_output_timeout_secs * 1000
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            process_timeout_secs: 0,
            process_output_timeout_secs: 0,
            show_command_output: false,
            show_command_lines: false,
            show_command_summary: true,
            use_hash_stamps: false,
        }
    }
}
