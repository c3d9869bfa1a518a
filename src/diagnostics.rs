use std::fmt::Write as _;

use crate::config::CONFIG_FILE;
use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is one,
/// how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigInvalid { path, reason } => format!("\
# Error: Invalid Config

`{}`: {reason}

## Fix

Edit `{CONFIG_FILE}`; `min_hash_length` must be at least 4 and
`max_hash_length` at most 40.
", path.display()),

        Error::GitFailed { args, stderr } => render_git_failed(args, stderr),

        Error::GitUnavailable { program, source } => format!("\
# Error: Git Not Available

Could not run `{program}`: {source}

## Fix

Install git, or point `git = \"...\"` in `{CONFIG_FILE}` at the executable.
"),

        Error::InvalidLine { input, reason } => format!("\
# Error: Invalid Line

`{input}` {reason}. Line numbers start at 1.
"),

        Error::NotARepository { path } => format!("\
# Error: Not a Git Repository

`{}` is not inside a git work tree.

## Fix

Run gitlinks from inside a repository.
", path.display()),

        Error::UnknownMatcher { name } => format!("\
# Error: Unknown Matcher

`{name}` is not a matcher.

## Fix

Use any of `commit`, `file`, `ref` in the `matchers` list of `{CONFIG_FILE}`.
"),

        Error::UnknownRevision { rev } => format!("\
# Error: Unknown Revision

`{rev}` does not name a commit in this repository.
"),

        Error::Watch { path, reason } => format!("\
# Error: Watch Failed

Could not watch `{}`: {reason}
", path.display()),

        Error::Io(_) | Error::Json(_) | Error::TomlDe(_) => render_generic(e),
    };
}

/// Errors wrapping a library error only need a heading and the message.
fn render_generic(e: &Error) -> String {
    let heading = match e {
        Error::Io(_) => "I/O",
        Error::Json(_) => "JSON Output",
        Error::TomlDe(_) => "Invalid TOML",
        _ => "Internal",
    };
    return format!("\
# Error: {heading}

{e}
");
}

/// Show the failed git command and its stderr as an indented block.
fn render_git_failed(args: &[String], stderr: &str) -> String {
    let mut out = format!("\
# Error: Git Command Failed

    git {}
", args.join(" "));

    if !stderr.is_empty() {
        out.push_str("\n## Output\n\n");
        for line in stderr.lines() {
            let _ = writeln!(out, "    {line}");
        }
    }
    return out;
}
