// tests/driver_scenarios.rs

//! End-to-end driver scenarios against real tools.

#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;

use execdag::exec::driver::{BufferSink, BuildResult, execute};
use execdag::graph::{ExecSpec, NodeGraph, NodeId, create_exec_node, resolve_static_deps};
use execdag::process::{AbortSignal, AbortToken};
use execdag::types::BuildOptions;

type TestResult = Result<(), Box<dyn Error>>;

fn make_node(graph: &mut NodeGraph, spec: ExecSpec) -> NodeId {
    let id = create_exec_node(graph, spec).expect("create exec node");
    resolve_static_deps(graph, id).expect("resolve static deps");
    id
}

fn quiet_options() -> BuildOptions {
    BuildOptions {
        show_command_summary: false,
        ..BuildOptions::default()
    }
}

#[tokio::test]
async fn expected_zero_with_true_succeeds_and_dumps_nothing() -> TestResult {
    with_timeout(async {
        init_tracing();

        let mut graph = NodeGraph::new();
        let id = make_node(&mut graph, ExecSpec::new("out/true.marker", "/bin/true"));

        let mut sink = BufferSink::default();
        let result = execute(
            &mut graph,
            id,
            &quiet_options(),
            AbortSignal::none(),
            &mut sink,
        )
        .await;

        assert_eq!(result, BuildResult::Success);
        assert!(sink.chunks.is_empty(), "output dumped on quiet success");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn unexpected_exit_code_fails_and_dumps_output() -> TestResult {
    with_timeout(async {
        init_tracing();

        let mut graph = NodeGraph::new();
        let id = make_node(&mut graph, ExecSpec::new("out/false.marker", "/bin/false"));

        let mut sink = BufferSink::default();
        let result = execute(
            &mut graph,
            id,
            &quiet_options(),
            AbortSignal::none(),
            &mut sink,
        )
        .await;

        assert_eq!(result, BuildResult::Failed);
        // stdout and stderr are both surfaced on failure.
        assert_eq!(sink.chunks.len(), 2);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn matching_nonzero_expected_code_is_success() -> TestResult {
    with_timeout(async {
        init_tracing();

        let mut graph = NodeGraph::new();
        let mut spec = ExecSpec::new("out/exit3.marker", "/bin/sh");
        spec.arguments = "-c \"exit 3\"".to_string();
        spec.expected_return_code = 3;
        let id = make_node(&mut graph, spec);

        let mut sink = BufferSink::default();
        let result = execute(
            &mut graph,
            id,
            &quiet_options(),
            AbortSignal::none(),
            &mut sink,
        )
        .await;

        assert_eq!(result, BuildResult::Success);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn mismatched_exit_code_is_failure() -> TestResult {
    with_timeout(async {
        init_tracing();

        let mut graph = NodeGraph::new();
        let mut spec = ExecSpec::new("out/exit3-expected0.marker", "/bin/sh");
        spec.arguments = "-c \"exit 3\"".to_string();
        let id = make_node(&mut graph, spec);

        let mut sink = BufferSink::default();
        let result = execute(
            &mut graph,
            id,
            &quiet_options(),
            AbortSignal::none(),
            &mut sink,
        )
        .await;

        assert_eq!(result, BuildResult::Failed);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn captured_stdout_becomes_the_artifact() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let output = dir.path().join("generated.txt");

        let mut graph = NodeGraph::new();
        let mut spec = ExecSpec::new(output.to_string_lossy(), "/bin/sh");
        spec.arguments = "-c \"printf hello\"".to_string();
        spec.use_stdout_as_output = true;
        let id = make_node(&mut graph, spec);

        let mut sink = BufferSink::default();
        let result = execute(
            &mut graph,
            id,
            &quiet_options(),
            AbortSignal::none(),
            &mut sink,
        )
        .await;

        assert_eq!(result, BuildResult::Success);
        assert_eq!(fs::read_to_string(&output)?, "hello");
        assert!(graph.exec(id).unwrap().stamp_ms.is_some());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn empty_stdout_writes_an_empty_artifact() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let output = dir.path().join("empty.txt");

        let mut graph = NodeGraph::new();
        let mut spec = ExecSpec::new(output.to_string_lossy(), "/bin/true");
        spec.use_stdout_as_output = true;
        let id = make_node(&mut graph, spec);

        let mut sink = BufferSink::default();
        let result = execute(
            &mut graph,
            id,
            &quiet_options(),
            AbortSignal::none(),
            &mut sink,
        )
        .await;

        assert_eq!(result, BuildResult::Success);
        assert!(output.exists());
        assert_eq!(fs::read(&output)?.len(), 0);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn abort_fails_the_build_and_writes_no_artifact() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let output = dir.path().join("never.txt");

        let local = AbortToken::new();
        local.set();

        let mut graph = NodeGraph::new();
        let mut spec = ExecSpec::new(output.to_string_lossy(), "/bin/sh");
        spec.arguments = "-c \"printf hello\"".to_string();
        spec.use_stdout_as_output = true;
        let id = make_node(&mut graph, spec);

        let mut sink = BufferSink::default();
        let result = execute(
            &mut graph,
            id,
            &quiet_options(),
            AbortSignal::new(None, Some(local)),
            &mut sink,
        )
        .await;

        assert_eq!(result, BuildResult::Failed);
        assert!(!output.exists(), "artifact written for an aborted build");
        assert!(sink.chunks.is_empty(), "output handled for an aborted build");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn template_expansion_drives_the_real_command_line() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let output = dir.path().join("echoed.txt");

        let mut graph = NodeGraph::new();
        let mut spec = ExecSpec::new(output.to_string_lossy(), "/bin/echo");
        spec.inputs = vec!["alpha".to_string(), "beta".to_string()];
        spec.arguments = "%1".to_string();
        spec.use_stdout_as_output = true;
        let id = make_node(&mut graph, spec);

        let mut sink = BufferSink::default();
        let result = execute(
            &mut graph,
            id,
            &quiet_options(),
            AbortSignal::none(),
            &mut sink,
        )
        .await;

        assert_eq!(result, BuildResult::Success);
        assert_eq!(fs::read_to_string(&output)?.trim_end(), "alpha beta");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn always_show_output_dumps_on_success() -> TestResult {
    with_timeout(async {
        init_tracing();

        let mut graph = NodeGraph::new();
        let mut spec = ExecSpec::new("out/noisy.marker", "/bin/sh");
        spec.arguments = "-c \"printf hi\"".to_string();
        spec.always_show_output = true;
        let id = make_node(&mut graph, spec);

        let mut sink = BufferSink::default();
        let result = execute(
            &mut graph,
            id,
            &quiet_options(),
            AbortSignal::none(),
            &mut sink,
        )
        .await;

        assert_eq!(result, BuildResult::Success);
        assert!(sink.chunks.iter().any(|(_, data)| data == b"hi"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn environment_block_replaces_the_parent_environment() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let output = dir.path().join("env.txt");

        let mut graph = NodeGraph::new();
        let mut spec = ExecSpec::new(output.to_string_lossy(), "/bin/sh");
        spec.arguments = "-c \"printf %s $FOO\"".to_string();
        spec.environment = vec![("FOO".to_string(), "bar".to_string())];
        spec.use_stdout_as_output = true;
        let id = make_node(&mut graph, spec);

        let mut sink = BufferSink::default();
        let result = execute(
            &mut graph,
            id,
            &quiet_options(),
            AbortSignal::none(),
            &mut sink,
        )
        .await;

        assert_eq!(result, BuildResult::Success);
        assert_eq!(fs::read_to_string(&output)?, "bar");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn working_dir_is_respected() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let workdir = tempfile::tempdir()?;
        let output = dir.path().join("pwd.txt");

        let mut graph = NodeGraph::new();
        let mut spec = ExecSpec::new(output.to_string_lossy(), "/bin/sh");
        spec.arguments = "-c pwd".to_string();
        spec.working_dir = Some(workdir.path().to_path_buf());
        spec.use_stdout_as_output = true;
        let id = make_node(&mut graph, spec);

        let mut sink = BufferSink::default();
        let result = execute(
            &mut graph,
            id,
            &quiet_options(),
            AbortSignal::none(),
            &mut sink,
        )
        .await;

        assert_eq!(result, BuildResult::Success);
        let reported = fs::read_to_string(&output)?;
        assert_eq!(
            fs::canonicalize(reported.trim_end())?,
            fs::canonicalize(workdir.path())?
        );
        Ok(())
    })
    .await
}
