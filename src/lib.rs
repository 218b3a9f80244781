// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod graph;
pub mod logging;
pub mod process;
pub mod runner;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, OptionsSection};
use crate::exec::driver::StdoutSink;
use crate::process::AbortToken;
use crate::runner::BuildRunner;
use crate::types::BuildOptions;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the build runner
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let options = build_options(&cfg.options, &args);

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    // Ctrl-C → abort the whole build.
    let main_abort = AbortToken::new();
    {
        let token = main_abort.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            token.set();
        });
    }

    let root = config_root_dir(&config_path);
    let mut runner = BuildRunner::from_config(&cfg, &root, options, main_abort)?;
    let mut sink = StdoutSink;
    let summary = runner.run(&mut sink).await?;

    if summary.failed > 0 {
        bail!("{} node(s) failed to build", summary.failed);
    }
    Ok(())
}

/// Merge `[options]` with CLI overrides.
fn build_options(section: &OptionsSection, args: &CliArgs) -> BuildOptions {
    BuildOptions {
        process_timeout_secs: args.timeout.unwrap_or(section.process_timeout_secs),
        process_output_timeout_secs: args
            .output_timeout
            .unwrap_or(section.process_output_timeout_secs),
        show_command_output: section.show_command_output || args.show_output,
        show_command_lines: section.show_command_lines || args.show_command_lines,
        show_command_summary: section.show_command_summary,
        use_hash_stamps: section.use_hash_stamps,
    }
}

/// Figure out a sensible root for the stamp store.
///
/// - If the config path has a non-empty parent (e.g. "configs/Execdag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Execdag.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print nodes, deps and command templates.
fn print_dry_run(cfg: &ConfigFile) {
    println!("execdag dry-run");
    println!(
        "  options.process_timeout_secs = {}",
        cfg.options.process_timeout_secs
    );
    println!(
        "  options.process_output_timeout_secs = {}",
        cfg.options.process_output_timeout_secs
    );
    println!();

    println!("exec nodes ({}):", cfg.exec.len());
    for (name, section) in cfg.exec.iter() {
        println!("  - {name}");
        println!("      output: {}", section.output);
        println!("      executable: {}", section.executable);
        if !section.arguments.is_empty() {
            println!("      arguments: {}", section.arguments);
        }
        if !section.input.is_empty() {
            println!("      input: {:?}", section.input);
        }
        for scan in &section.input_path {
            println!(
                "      input_path: {} (recurse: {}, pattern: {:?})",
                scan.path, scan.recurse, scan.pattern
            );
        }
        if let Some(ref dir) = section.working_dir {
            if !dir.is_empty() {
                println!("      working_dir: {dir}");
            }
        }
        if section.expected_return_code != 0 {
            println!("      expected_return_code: {}", section.expected_return_code);
        }
        if section.always_run {
            println!("      always_run: true");
        }
        if section.use_stdout_as_output {
            println!("      use_stdout_as_output: true");
        }
        if !section.after.is_empty() {
            println!("      after: {:?}", section.after);
        }
    }

    debug!("dry-run complete (no execution)");
}
