#![allow(dead_code)]

//! Builders for config and node specs used across the integration tests.

use execdag::config::model::{ConfigFile, ExecSection, InputPathSection, OptionsSection};
use execdag::graph::{DirScanSpec, ExecSpec};

pub struct ExecSectionBuilder {
    section: ExecSection,
}

impl ExecSectionBuilder {
    pub fn new(executable: &str, output: &str) -> Self {
        Self {
            section: ExecSection {
                output: output.to_string(),
                executable: executable.to_string(),
                input: Vec::new(),
                input_path: Vec::new(),
                arguments: String::new(),
                working_dir: None,
                expected_return_code: 0,
                always_show_output: false,
                use_stdout_as_output: false,
                always_run: false,
                environment: Vec::new(),
                after: Vec::new(),
            },
        }
    }

    pub fn arguments(mut self, args: &str) -> Self {
        self.section.arguments = args.to_string();
        self
    }

    pub fn input(mut self, path: &str) -> Self {
        self.section.input.push(path.to_string());
        self
    }

    pub fn input_path(mut self, path: &str, recurse: bool, patterns: &[&str]) -> Self {
        self.section.input_path.push(InputPathSection {
            path: path.to_string(),
            recurse,
            pattern: patterns.iter().map(|s| s.to_string()).collect(),
            exclude_path: Vec::new(),
            exclude_files: Vec::new(),
            exclude_pattern: Vec::new(),
        });
        self
    }

    pub fn expected_return_code(mut self, code: i32) -> Self {
        self.section.expected_return_code = code;
        self
    }

    pub fn always_show_output(mut self) -> Self {
        self.section.always_show_output = true;
        self
    }

    pub fn use_stdout_as_output(mut self) -> Self {
        self.section.use_stdout_as_output = true;
        self
    }

    pub fn always_run(mut self) -> Self {
        self.section.always_run = true;
        self
    }

    pub fn env(mut self, entry: &str) -> Self {
        self.section.environment.push(entry.to_string());
        self
    }

    pub fn after(mut self, name: &str) -> Self {
        self.section.after.push(name.to_string());
        self
    }

    pub fn working_dir(mut self, dir: &str) -> Self {
        self.section.working_dir = Some(dir.to_string());
        self
    }

    pub fn build(self) -> ExecSection {
        self.section
    }
}

#[derive(Default)]
pub struct ConfigFileBuilder {
    options: OptionsSection,
    execs: Vec<(String, ExecSection)>,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            options: OptionsSection::default(),
            execs: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: OptionsSection) -> Self {
        self.options = options;
        self
    }

    pub fn with_exec(mut self, name: &str, section: ExecSection) -> Self {
        self.execs.push((name.to_string(), section));
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile {
            options: self.options,
            exec: self.execs.into_iter().collect(),
        }
    }
}

/// Shorthand for an [`ExecSpec`] with a scan attached.
pub fn spec_with_scan(output: &str, executable: &str, scan: DirScanSpec) -> ExecSpec {
    let mut spec = ExecSpec::new(output, executable);
    spec.scans.push(scan);
    spec
}
