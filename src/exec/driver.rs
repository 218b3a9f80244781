// src/exec/driver.rs

//! One build invocation of an exec node: command line, spawn, drain,
//! classify, artifact, stamp.
//!
//! The driver owns all user-visible reporting for the invocation; the process
//! layer only classifies outcomes.

use std::fs;

use tracing::{error, info, warn};

use crate::exec::args::{ArgInput, build_command_line};
use crate::graph::node::{ExecSpec, NodeKind};
use crate::graph::{ExecNode, NodeGraph, NodeId, file_mtime_millis};
use crate::process::{AbortSignal, ChildProcess, ExitReason, SpawnRequest};
use crate::types::BuildOptions;

/// Outcome of one node build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildResult {
    Success,
    Failed,
}

/// Where captured process output is surfaced.
///
/// Production uses [`StdoutSink`]; tests can substitute a buffer.
pub trait OutputSink: Send {
    fn dump(&mut self, node: &str, data: &[u8]);
}

/// Writes captured output to this process's stdout, verbatim.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn dump(&mut self, _node: &str, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        use std::io::Write;
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = lock.write_all(data);
        if !data.ends_with(b"\n") {
            let _ = lock.write_all(b"\n");
        }
    }
}

/// Collects dumped output in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    pub chunks: Vec<(String, Vec<u8>)>,
}

impl OutputSink for BufferSink {
    fn dump(&mut self, node: &str, data: &[u8]) {
        self.chunks.push((node.to_string(), data.to_vec()));
    }
}

/// Execute one exec node.
///
/// Assumes the runner has already resolved dependencies and decided the node
/// is stale. The build fails if the process did not exit normally, or exited
/// normally with a code different from the expected one. An aborted process
/// fails immediately with no output handling. On success the node's stamp is
/// refreshed from the built artifact's mtime.
pub async fn execute(
    graph: &mut NodeGraph,
    exec_id: NodeId,
    options: &BuildOptions,
    abort: AbortSignal,
    sink: &mut dyn OutputSink,
) -> BuildResult {
    let node_name = graph.name(exec_id).to_string();
    let Some(exec) = graph.exec(exec_id) else {
        error!(node = %node_name, "node is not an exec node");
        return BuildResult::Failed;
    };
    if exec.static_deps.is_empty() {
        error!(node = %node_name, "exec node has unresolved static dependencies");
        return BuildResult::Failed;
    }

    let spec = exec.spec.clone();
    let executable = graph.name(exec.static_deps[0]).to_string();
    let inputs = collect_arg_inputs(graph, exec);

    let full_args = build_command_line(&spec.arguments, &inputs, &node_name);
    emit_execution_message(&node_name, &executable, &full_args, &spec, options);

    let environment = if spec.environment.is_empty() {
        None
    } else {
        Some(spec.environment.clone())
    };
    let req = SpawnRequest {
        executable,
        arguments: full_args,
        working_dir: spec.working_dir.clone(),
        environment,
        share_parent_handles: false,
    };

    let mut child = ChildProcess::new(abort);
    if let Err(err) = child.spawn(&req) {
        if child.has_aborted() {
            return BuildResult::Failed;
        }
        error!(node = %node_name, error = %err, "failed to spawn process");
        return BuildResult::Failed;
    }

    let mut out = Vec::new();
    let mut errbuf = Vec::new();
    child
        .read_all_data(
            &mut out,
            &mut errbuf,
            options.overall_timeout_ms(),
            options.inactivity_timeout_ms(),
        )
        .await;

    let (reason, exit_code) = child.wait_for_exit().await;

    if reason == ExitReason::Aborted {
        return BuildResult::Failed;
    }

    let build_failed =
        reason != ExitReason::Normal || exit_code != spec.expected_return_code;

    if build_failed || spec.always_show_output || options.show_command_output {
        sink.dump(&node_name, &out);
        sink.dump(&node_name, &errbuf);
    }

    if build_failed {
        let error_desc = if reason == ExitReason::Normal {
            describe_exit_code(exit_code)
        } else {
            reason.as_str().to_string()
        };
        error!(node = %node_name, error = %error_desc, "execution failed");
        return BuildResult::Failed;
    }

    if spec.use_stdout_as_output {
        if let Err(e) = fs::write(&node_name, &out) {
            error!(node = %node_name, error = %e, "failed to write captured stdout to output");
            return BuildResult::Failed;
        }
    }

    match file_mtime_millis(&node_name) {
        Ok(ms) => {
            if let Some(exec) = graph.exec_mut(exec_id) {
                exec.stamp_ms = Some(ms);
            }
        }
        Err(e) => {
            warn!(node = %node_name, error = %e, "output missing after successful execution");
        }
    }

    BuildResult::Success
}

/// Input dependencies as the templater sees them: static deps after the
/// executable, with directory listings expanded to their discovered files.
fn collect_arg_inputs(graph: &NodeGraph, exec: &ExecNode) -> Vec<ArgInput> {
    let mut inputs = Vec::with_capacity(exec.static_deps.len().saturating_sub(1));
    for &dep in &exec.static_deps[1..] {
        match &graph.node(dep).kind {
            NodeKind::Listing(listing) => {
                inputs.push(ArgInput::Listing(listing.files().to_vec()));
            }
            _ => inputs.push(ArgInput::File(graph.name(dep).to_string())),
        }
    }
    inputs
}

fn emit_execution_message(
    node: &str,
    executable: &str,
    args: &str,
    spec: &ExecSpec,
    options: &BuildOptions,
) {
    if options.show_command_summary {
        info!(node = %node, "running exec node");
    }
    if options.show_command_lines {
        let working_dir = spec
            .working_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        info!(
            node = %node,
            cmd = %format!("{executable} {args}"),
            working_dir = %working_dir,
            expected_return_code = spec.expected_return_code,
            "resolved command line"
        );
    }
}

/// Human-readable description for well-known exit codes, falling back to the
/// bare number.
fn describe_exit_code(code: i32) -> String {
    if (1..=255).contains(&code) {
        format!("exit code {code} ({})", std::io::Error::from_raw_os_error(code))
    } else {
        format!("exit code {code}")
    }
}
