// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::{ExecdagError, Result};
use crate::graph::listing::DirScanSpec;
use crate::graph::node::ExecSpec;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [options]
/// process_timeout_secs = 300
/// show_command_output = false
///
/// [exec.codegen]
/// executable = "tools/gen"
/// output = "out/tables.c"
/// input = ["src/tables.def"]
/// arguments = "-o \"%2\" %1"
/// ```
///
/// All sections are optional except the `[exec.<name>]` tables themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Global build options from `[options]`.
    #[serde(default)]
    pub options: OptionsSection,

    /// All exec nodes from `[exec.<name>]`.
    ///
    /// Keys are the *section names* (e.g. `"codegen"`); node identity is the
    /// `output` path inside each section.
    #[serde(default)]
    pub exec: BTreeMap<String, ExecSection>,
}

/// `[options]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionsSection {
    /// Overall per-process timeout in seconds; 0 disables it.
    #[serde(default)]
    pub process_timeout_secs: u64,

    /// Per-process output-inactivity timeout in seconds; 0 disables it.
    #[serde(default)]
    pub process_output_timeout_secs: u64,

    /// Dump captured output for every node, not just failing ones.
    #[serde(default)]
    pub show_command_output: bool,

    /// Log resolved command lines before running.
    #[serde(default)]
    pub show_command_lines: bool,

    /// Log a one-line summary per node.
    #[serde(default = "default_true")]
    pub show_command_summary: bool,

    /// Enable blake3 input-content stamps in addition to mtime staleness.
    #[serde(default)]
    pub use_hash_stamps: bool,
}

impl Default for OptionsSection {
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

/// `[exec.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecSection {
    /// Output artifact path. This is the node's identity.
    pub output: String,

    /// The tool to run.
    pub executable: String,

    /// Explicit input files.
    #[serde(default)]
    pub input: Vec<String>,

    /// Directory scans contributing discovered inputs.
    #[serde(default)]
    pub input_path: Vec<InputPathSection>,

    /// Argument template; `%1` expands to inputs, `%2` to the output.
    #[serde(default)]
    pub arguments: String,

    /// Working directory for the tool; this process's own when empty.
    #[serde(default)]
    pub working_dir: Option<String>,

    /// Exit code that counts as success.
    #[serde(default)]
    pub expected_return_code: i32,

    /// Dump captured output even on success.
    #[serde(default)]
    pub always_show_output: bool,

    /// Write captured stdout verbatim to `output` on success.
    #[serde(default)]
    pub use_stdout_as_output: bool,

    /// Consider this node stale on every run.
    #[serde(default)]
    pub always_run: bool,

    /// Replacement environment block as `KEY=VALUE` entries; inherits the
    /// parent's environment when empty.
    #[serde(default)]
    pub environment: Vec<String>,

    /// Names of exec sections that must build before this one.
    #[serde(default)]
    pub after: Vec<String>,
}

/// One entry of `input_path`.
#[derive(Debug, Clone, Deserialize)]
pub struct InputPathSection {
    pub path: String,

    #[serde(default = "default_true")]
    pub recurse: bool,

    /// File-name patterns to include; matches everything by default.
    #[serde(default = "default_patterns")]
    pub pattern: Vec<String>,

    /// Subtrees to skip entirely.
    #[serde(default)]
    pub exclude_path: Vec<String>,

    /// Individual files to skip (file name or full path).
    #[serde(default)]
    pub exclude_files: Vec<String>,

    /// Path patterns to skip.
    #[serde(default)]
    pub exclude_pattern: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_patterns() -> Vec<String> {
    vec!["*".to_string()]
}

impl InputPathSection {
    pub fn to_scan_spec(&self) -> DirScanSpec {
        DirScanSpec {
            path: PathBuf::from(&self.path),
            recurse: self.recurse,
            patterns: self.pattern.clone(),
            exclude_paths: self.exclude_path.iter().map(PathBuf::from).collect(),
            exclude_files: self.exclude_files.clone(),
            exclude_patterns: self.exclude_pattern.clone(),
        }
    }
}

impl ExecSection {
    /// Convert into the graph-facing spec; parses the environment block.
    pub fn to_exec_spec(&self, name: &str) -> Result<ExecSpec> {
        let mut environment = Vec::with_capacity(self.environment.len());
        for entry in &self.environment {
            let Some((k, v)) = entry.split_once('=') else {
                return Err(ExecdagError::ConfigError(format!(
                    "exec '{name}': environment entry '{entry}' is not KEY=VALUE"
                )));
            };
            environment.push((k.to_string(), v.to_string()));
        }

        Ok(ExecSpec {
            output: self.output.clone(),
            executable: self.executable.clone(),
            inputs: self.input.clone(),
            scans: self.input_path.iter().map(|p| p.to_scan_spec()).collect(),
            arguments: self.arguments.clone(),
            working_dir: self
                .working_dir
                .as_ref()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            expected_return_code: self.expected_return_code,
            always_show_output: self.always_show_output,
            use_stdout_as_output: self.use_stdout_as_output,
            always_run: self.always_run,
            environment,
            after: self.after.clone(),
        })
    }
}
