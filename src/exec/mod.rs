// src/exec/mod.rs

//! Command-line construction and node execution.

pub mod args;
pub mod driver;

pub use args::{ArgInput, build_command_line};
pub use driver::{BufferSink, BuildResult, OutputSink, StdoutSink, execute};
