use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{self, Config};
use crate::repository::{RepositoryContextProvider as _, RepositorySource};
use crate::types::RepositoryContext;

/// Output the ghlink reference document.
pub fn run(json: bool) {
    let root = PathBuf::from(".");
    let state = gather_state(&root);

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
}

// ── State gathering ───────────────────────────────────────────────────

/// What `info` reports about the current directory.
struct CurrentState {
    /// Error text when the config exists but does not load.
    config_error: Option<String>,
    /// `.ghlink.toml` exists.
    config_found: bool,
    /// Context the next run would use, if one resolves.
    repository: Option<RepositoryContext>,
}

/// Inspect config and metadata under `root` without failing.
fn gather_state(root: &Path) -> CurrentState {
    let config_found = root.join(config::CONFIG_FILE).exists();

    let (config, config_error) = match Config::load(root) {
        Ok(c) => (c, None),
        Err(e) => (Config::default(), Some(e.to_string())),
    };

    let repository = RepositorySource::select(None, None, &config, root)
        .ok()
        .and_then(|source| return source.repository_context().ok());

    return CurrentState { config_error, config_found, repository };
}

// ── Markdown output ───────────────────────────────────────────────────

/// Human-readable reference document.
fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

/// Syntax, workflow and config sections.
fn print_markdown_header(version: &str) {
    print!(
        "\
# ghlink {version}

Link GitHub references in markdown: issues, pull requests, commits and
users written in shorthand become links, and full GitHub URLs get short labels.

## Reference Syntax

    #26  GH-26  #\"26\"                issue or pull request
    wooorm#26  wooorm/remark#26      issue or pull request elsewhere
    a5c3785                          commit (7 to 40 hex digits)
    wooorm@a5c3785                   commit elsewhere
    @wooorm                          user

## Workflow

    ghlink init user/project                Record the repository in .ghlink.toml
    ghlink check                            List files that would change (exit 0/1)
    ghlink apply                            Rewrite markdown files in place
    ghlink render <file|->                  Print one rewritten document
    ghlink scan [--json]                    List recognized references
    ghlink watch                            Re-check on every change

## Configuration (.ghlink.toml)

    repository = \"wooorm/remark\"          # or {{ user, project, base_url }}
    base_url = \"https://ghe.example/\"     # GitHub Enterprise web root
    mention_strong = true                  # **@user** labels
    include = [\"docs/\"]                   # only process these paths
    exclude = [\"docs/archive/\"]           # skip these paths

Without `repository`, it is read from `Cargo.toml` or `package.json`.

## Current State

"
    );
}

/// Config and repository lines.
fn print_markdown_state(state: &CurrentState) {
    match (&state.config_error, state.config_found) {
        (Some(e), _) => println!("Config:     .ghlink.toml (invalid: {e})"),
        (None, true) => println!("Config:     .ghlink.toml (found)"),
        (None, false) => println!("Config:     .ghlink.toml (not found)"),
    }

    match &state.repository {
        Some(r) => println!("Repository: {}{}/{}", r.base_url, r.user, r.project),
        None => println!("Repository: (not configured)"),
    }
}

/// Exit code table.
fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | Success / nothing to rewrite |
| 1    | Files need rewriting |
| 3    | Runtime error |
"
    );
}

// ── JSON output ───────────────────────────────────────────────────────

/// Machine-readable reference document.
#[derive(Serialize)]
struct InfoJson {
    /// Config and repository state.
    current_state: StateJson,
    /// Exit codes and meanings.
    exit_codes: Vec<ExitCodeInfo>,
    /// Shorthand forms ghlink recognizes.
    reference_kinds: Vec<KindInfo>,
    /// Crate version.
    version: String,
}

/// One shorthand form.
#[derive(Serialize)]
struct KindInfo {
    /// Sample markers.
    examples: Vec<String>,
    /// Snake-case kind name.
    kind: String,
}

/// One exit code.
#[derive(Serialize)]
struct ExitCodeInfo {
    /// Process exit code.
    code: u8,
    /// What it signals.
    meaning: String,
}

/// JSON form of [`CurrentState`].
#[derive(Serialize)]
struct StateJson {
    /// Config load error.
    config_error: Option<String>,
    /// `.ghlink.toml` exists.
    config_found: bool,
    /// Resolved repository.
    repository: Option<RepositoryContext>,
}

/// Build a [`KindInfo`].
fn kind(kind: &str, examples: &[&str]) -> KindInfo {
    return KindInfo {
        examples: examples.iter().map(|e| return (*e).to_string()).collect(),
        kind: kind.to_string(),
    };
}

/// Print the JSON reference document.
fn print_json(state: &CurrentState) {
    let info = InfoJson {
        current_state: StateJson {
            config_error: state.config_error.clone(),
            config_found: state.config_found,
            repository: state.repository.clone(),
        },
        exit_codes: vec![
            ExitCodeInfo { code: 0, meaning: "Success / nothing to rewrite".to_string() },
            ExitCodeInfo { code: 1, meaning: "Files need rewriting".to_string() },
            ExitCodeInfo { code: 3, meaning: "Runtime error".to_string() },
        ],
        reference_kinds: vec![
            kind("issue_or_pr", &["#26", "GH-26", "#\"26\""]),
            kind("user_issue_or_pr", &["wooorm#26", "wooorm/remark#26"]),
            kind("sha", &["a5c3785"]),
            kind("user_sha", &["wooorm@a5c3785", "wooorm/remark@a5c3785"]),
            kind("mention", &["@wooorm"]),
        ],
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
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
    fn state_reads_configured_repository() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(config::CONFIG_FILE), "repository = \"wooorm/remark\"\n").unwrap();
        let state = gather_state(dir.path());
        assert!(state.config_found);
        assert!(state.config_error.is_none());
        assert_eq!(state.repository, Some(RepositoryContext::new("wooorm", "remark")));
    }

    #[test]
    fn state_reports_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(config::CONFIG_FILE), "nope = 1\n").unwrap();
        let state = gather_state(dir.path());
        assert!(state.config_found);
        assert!(state.config_error.is_some());
        assert!(state.repository.is_none());
    }
}
