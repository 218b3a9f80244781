// src/exec/args.rs

//! Argument templating: expanding `%1` / `%2` placeholders into a full
//! command line.
//!
//! The template is tokenized on whitespace. A token may end in one of four
//! marker forms: `%1`, `"%1"`, `%2`, `"%2"`. `%1` expands to the input
//! dependency list (directory listings expand to every discovered file, in
//! listing order); `%2` expands to the single output name. Whatever literal
//! text precedes the marker is repeated per expanded entry, and the quoted
//! forms wrap each entry in double quotes. Any other token passes through
//! unchanged.

/// One input dependency as seen by the templater.
#[derive(Debug, Clone)]
pub enum ArgInput {
    /// An explicit input file (or another node's output).
    File(String),
    /// A directory listing, already expanded to its discovered files.
    Listing(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Inputs { quoted: bool },
    Output { quoted: bool },
}

/// Split a token into its literal prefix and trailing marker, if any.
///
/// Quoted forms are matched first so `x"%1"` is not read as prefix `x"` plus
/// a bare marker.
fn split_marker(token: &str) -> (&str, Option<Marker>) {
    if let Some(pre) = token.strip_suffix("\"%1\"") {
        return (pre, Some(Marker::Inputs { quoted: true }));
    }
    if let Some(pre) = token.strip_suffix("\"%2\"") {
        return (pre, Some(Marker::Output { quoted: true }));
    }
    if let Some(pre) = token.strip_suffix("%1") {
        return (pre, Some(Marker::Inputs { quoted: false }));
    }
    if let Some(pre) = token.strip_suffix("%2") {
        return (pre, Some(Marker::Output { quoted: false }));
    }
    (token, None)
}

/// Expand `template` into the full command line for one invocation.
///
/// Substitution is stable and order-preserving: expansion order equals
/// dependency list order. Tokens are re-joined with single spaces and no
/// separator is duplicated between expanded entries; a trailing space is
/// acceptable.
pub fn build_command_line(template: &str, inputs: &[ArgInput], output: &str) -> String {
    let mut full = String::new();
    for token in template.split_whitespace() {
        match split_marker(token) {
            (pre, Some(Marker::Inputs { quoted })) => {
                append_input_list(&mut full, inputs, pre, quoted);
            }
            (pre, Some(Marker::Output { quoted })) => {
                append_entry(&mut full, pre, output, quoted);
            }
            (tok, None) => full.push_str(tok),
        }
        full.push(' ');
    }
    full
}

fn append_input_list(out: &mut String, inputs: &[ArgInput], pre: &str, quoted: bool) {
    let names = inputs.iter().flat_map(|input| match input {
        ArgInput::File(name) => std::slice::from_ref(name).iter(),
        ArgInput::Listing(files) => files.iter(),
    });

    let mut first = true;
    for name in names {
        if !first {
            out.push(' ');
        }
        append_entry(out, pre, name, quoted);
        first = false;
    }
}

fn append_entry(out: &mut String, pre: &str, name: &str, quoted: bool) {
    out.push_str(pre);
    if quoted {
        out.push('"');
    }
    out.push_str(name);
    if quoted {
        out.push('"');
    }
}
