use std::fmt::Write as _;
use std::path::PathBuf;

use crate::config::CONFIG_FILE;
use crate::error::Error;

/// ANSI bold.
const BOLD: &str = "\x1b[1m";
/// ANSI reset.
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
/// Each variant produces a block with what happened and how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::MissingRepositoryContext { searched } => render_missing_repository(searched),
        Error::InvalidRepository { value } => render_invalid_repository(value),
        Error::Watch { reason } => render_watch(reason),
        _ => render_generic(e),
    };
}

/// Variants without extra guidance.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.
", path.display()),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: Invalid JSON

{e}

## Fix

Check `package.json` for syntax errors.
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check `{CONFIG_FILE}` for syntax errors or unknown keys.
"),
        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    };
}

/// Missing context, listing the metadata files that were searched.
fn render_missing_repository(searched: &[PathBuf]) -> String {
    let mut out = "\
# Error: Missing Repository

Missing `repository`: the document references issues, commits, or users
but no repository was configured or discovered.
"
    .to_string();

    if !searched.is_empty() {
        out.push_str("\n## Searched\n\n");
        for path in searched {
            let _ = writeln!(out, "- {}", path.display());
        }
    }

    let _ = write!(out, "\
\n## Fix

Pass it on the command line:

    ghlink --repository user/project apply

Or record it in `{CONFIG_FILE}`:

    ghlink init user/project
");
    return out;
}

/// Unparseable repository value.
fn render_invalid_repository(value: &str) -> String {
    return format!("\
# Error: Invalid Repository

`{value}` is not a GitHub repository.

## Accepted forms

    user/project
    github:user/project
    https://github.com/user/project
    git@github.com:user/project.git
");
}

/// Watcher setup failure.
fn render_watch(reason: &str) -> String {
    return format!("\
# Error: Watch Failed

{reason}

## Fix

Run `ghlink check` once instead.
");
}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::implicit_return,
    clippy::indexing_slicing,
    clippy::missing_assert_message,
    clippy::missing_docs_in_private_items,
    clippy::missing_panics_doc,
    clippy::unwrap_used,
    reason = "tests"
)]
mod tests {
    use super::*;

    #[test]
    fn missing_repository_lists_searched_files() {
        let md = render_error(&Error::MissingRepositoryContext {
            searched: vec![PathBuf::from("./Cargo.toml"), PathBuf::from("./package.json")],
        });
        assert!(md.starts_with("# Error: Missing Repository"));
        assert!(md.contains("Missing `repository`"));
        assert!(md.contains("- ./package.json"));
        assert!(md.contains("ghlink init user/project"));
    }

    #[test]
    fn invalid_repository_shows_accepted_forms() {
        let md = render_error(&Error::InvalidRepository { value: "not a repo".to_string() });
        assert!(md.contains("`not a repo`"));
        assert!(md.contains("## Accepted forms"));
    }

    #[test]
    fn generic_errors_have_headings() {
        let md = render_error(&Error::FileNotFound { path: PathBuf::from("gone.md") });
        assert_eq!(md, "# Error: File Not Found\n\n`gone.md` does not exist.\n");
    }
}
