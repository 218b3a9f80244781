// tests/args_template.rs

//! Argument templating and command-line splitting.

use execdag::exec::args::{ArgInput, build_command_line};
use execdag::process::split_command_arguments;
use proptest::prelude::*;

fn files(names: &[&str]) -> Vec<ArgInput> {
    names
        .iter()
        .map(|n| ArgInput::File(n.to_string()))
        .collect()
}

#[test]
fn output_then_inputs() {
    let cmd = build_command_line("-o %2 %1", &files(&["a.c", "b.c"]), "out.o");
    assert_eq!(cmd.trim_end(), "-o out.o a.c b.c");
}

#[test]
fn bare_input_marker_expands_in_order() {
    let cmd = build_command_line("%1", &files(&["x", "y", "z"]), "out");
    assert_eq!(cmd.trim_end(), "x y z");
}

#[test]
fn quoted_input_marker_quotes_each_entry() {
    let cmd = build_command_line("\"%1\"", &files(&["a.c", "b.c"]), "out.o");
    assert_eq!(cmd.trim_end(), "\"a.c\" \"b.c\"");
}

#[test]
fn prefixed_input_marker_repeats_prefix() {
    let cmd = build_command_line("/Option:%1", &files(&["a", "b", "c"]), "out");
    assert_eq!(cmd.trim_end(), "/Option:a /Option:b /Option:c");
}

#[test]
fn prefixed_quoted_input_marker() {
    let cmd = build_command_line("/I\"%1\"", &files(&["a", "b"]), "out");
    assert_eq!(cmd.trim_end(), "/I\"a\" /I\"b\"");
}

#[test]
fn quoted_output_marker() {
    let cmd = build_command_line("-o \"%2\"", &files(&["a"]), "out dir/out.o");
    assert_eq!(cmd.trim_end(), "-o \"out dir/out.o\"");
}

#[test]
fn listing_inputs_expand_to_discovered_files_in_listing_order() {
    let inputs = vec![
        ArgInput::File("explicit.c".to_string()),
        ArgInput::Listing(vec!["gen/a.c".to_string(), "gen/b.c".to_string()]),
    ];
    let cmd = build_command_line("cc %1 -o %2", &inputs, "prog");
    assert_eq!(cmd.trim_end(), "cc explicit.c gen/a.c gen/b.c -o prog");
}

#[test]
fn empty_input_list_expands_to_nothing() {
    let cmd = build_command_line("run %1 done", &[], "out");
    assert_eq!(cmd.trim_end(), "run  done");
}

#[test]
fn marker_in_the_middle_of_a_token_passes_through() {
    let cmd = build_command_line("a%1b %2x", &files(&["f"]), "out");
    assert_eq!(cmd.trim_end(), "a%1b %2x");
}

#[test]
fn plain_tokens_pass_through_rejoined_with_single_spaces() {
    let cmd = build_command_line("  -v   --flag  ", &files(&["f"]), "out");
    assert_eq!(cmd.trim_end(), "-v --flag");
}

proptest! {
    /// Bare `%1` yields exactly the input names, space-joined, with no
    /// separator duplication.
    #[test]
    fn bare_marker_is_exact_join(names in prop::collection::vec("[a-z][a-z0-9_./-]{0,10}", 0..5)) {
        let inputs: Vec<ArgInput> = names.iter().map(|n| ArgInput::File(n.clone())).collect();
        let cmd = build_command_line("%1", &inputs, "out");
        prop_assert_eq!(cmd.trim_end(), names.join(" "));
        prop_assert!(!cmd.contains("  "), "duplicated separator in {:?}", cmd);
    }

    /// Quoted `"%1"` wraps every entry in quotes, preserving order.
    #[test]
    fn quoted_marker_quotes_every_entry(names in prop::collection::vec("[a-z][a-z0-9_.-]{0,10}", 1..5)) {
        let inputs: Vec<ArgInput> = names.iter().map(|n| ArgInput::File(n.clone())).collect();
        let cmd = build_command_line("\"%1\"", &inputs, "out");
        let expected: Vec<String> = names.iter().map(|n| format!("\"{n}\"")).collect();
        prop_assert_eq!(cmd.trim_end(), expected.join(" "));
    }
}

#[test]
fn split_honors_double_quotes() {
    assert_eq!(
        split_command_arguments("-c \"exit 3\""),
        vec!["-c".to_string(), "exit 3".to_string()]
    );
}

#[test]
fn split_collapses_whitespace() {
    assert_eq!(
        split_command_arguments("  a   b  "),
        vec!["a".to_string(), "b".to_string()]
    );
}

#[test]
fn split_keeps_empty_quoted_argument() {
    assert_eq!(split_command_arguments("\"\""), vec![String::new()]);
}

#[test]
fn split_joins_quoted_and_unquoted_runs() {
    assert_eq!(
        split_command_arguments("pre\"mid dle\"post"),
        vec!["premid dlepost".to_string()]
    );
}
