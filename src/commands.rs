//! CLI commands for ghlink: apply, check, render, scan, init, info.

use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{self, Config};
use crate::error;
use crate::markdown::{self, Found};
use crate::repository::{self, RepositorySource};
use crate::rewrite::{RewriteOptions, Rewriter};

/// Exit code when `check` finds documents that would change.
const EXIT_NEEDS_REWRITE: u8 = 1;

/// Markdown file extensions picked up when walking a directory.
const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Directories never descended into.
const SKIPPED_DIRS: [&str; 3] = [".git", "node_modules", "target"];

/// Command-line overrides shared by every subcommand.
pub struct GlobalFlags<'a> {
    /// Web root for the repository.
    pub base_url: Option<&'a str>,
    /// Never read `Cargo.toml` or `package.json`.
    pub no_discover: bool,
    /// Plain mention labels.
    pub no_mention_strong: bool,
    /// Repository in any accepted form.
    pub repository: Option<&'a str>,
}

/// Everything a document pass needs, resolved once per invocation.
pub struct Settings {
    /// Project config.
    pub config: Config,
    /// Presentation options.
    pub options: RewriteOptions,
    /// Project root.
    pub root: PathBuf,
    /// Where the repository context comes from.
    pub source: RepositorySource,
}

impl Settings {
    /// Combine flags with `.ghlink.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns config loading errors, or `Error::InvalidRepository` for an
    /// unparseable explicit repository.
    pub fn load(flags: &GlobalFlags<'_>) -> Result<Self, error::Error> {
        let root = PathBuf::from(".");
        let config = Config::load(&root)?;
        let source = match RepositorySource::select(flags.repository, flags.base_url, &config, &root)? {
            RepositorySource::Discover { .. } if flags.no_discover => RepositorySource::Unavailable,
            source => source,
        };
        let mention_strong = !flags.no_mention_strong && config.mention_strong.unwrap_or(true);

        return Ok(Self { config, options: RewriteOptions { mention_strong }, root, source });
    }

    /// Rewrite one document.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingRepositoryContext` if the document needs a
    /// repository context and none is available.
    fn rewrite(&self, content: &str) -> Result<String, error::Error> {
        let rewriter = Rewriter::new(&self.source, self.options);
        return markdown::rewrite_markdown(content, &rewriter);
    }
}

/// Markdown files to process: the explicit list, or every configured file under `root`.
///
/// # Errors
///
/// Returns `Error::FileNotFound` for an explicit path that does not exist.
fn markdown_files(root: &Path, config: &Config, explicit: &[PathBuf]) -> Result<Vec<PathBuf>, error::Error> {
    if !explicit.is_empty() {
        for path in explicit {
            if !path.is_file() {
                return Err(error::Error::FileNotFound { path: path.clone() });
            }
        }
        return Ok(explicit.to_vec());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| return !SKIPPED_DIRS.iter().any(|dir| return e.file_name() == *dir))
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
        .filter(|e| {
            return e
                .path()
                .extension()
                .and_then(|ext| return ext.to_str())
                .is_some_and(|ext| return MARKDOWN_EXTENSIONS.contains(&ext));
        })
        .map(|e| return e.path().strip_prefix(root).unwrap_or(e.path()).to_path_buf())
        .filter(|relative| {
            let included = config.should_scan(&relative.to_string_lossy());
            if !included {
                debug!(file = %relative.display(), "excluded by config");
            }
            return included;
        })
        .collect();

    files.sort();
    return Ok(files);
}

/// Read a markdown file.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if it does not exist, or `Error::Io`.
fn read_markdown(root: &Path, path: &Path) -> Result<String, error::Error> {
    let full = root.join(path);
    return match std::fs::read_to_string(&full) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(error::Error::FileNotFound { path: full }),
        Err(e) => Err(error::Error::Io(e)),
        Ok(content) => Ok(content),
    };
}

/// Rewrite markdown files in place.
///
/// # Errors
///
/// Returns file errors, or `Error::MissingRepositoryContext` for the first
/// document that needs a repository context when none is available.
pub fn apply(settings: &Settings, files: &[PathBuf]) -> Result<(), error::Error> {
    let files = markdown_files(&settings.root, &settings.config, files)?;
    let mut rewritten = 0_usize;

    for path in &files {
        let content = read_markdown(&settings.root, path)?;
        let output = settings.rewrite(&content)?;
        if output != content {
            std::fs::write(settings.root.join(path), output)?;
            println!("rewrote {}", path.display());
            rewritten = rewritten.saturating_add(1);
        }
    }

    let total = files.len();
    eprintln!("Rewrote {rewritten} of {total} markdown files");
    return Ok(());
}

/// Report files that `apply` would change.
///
/// # Errors
///
/// Returns file errors or `Error::MissingRepositoryContext`.
pub fn check(settings: &Settings, files: &[PathBuf]) -> Result<ExitCode, error::Error> {
    let files = markdown_files(&settings.root, &settings.config, files)?;
    let mut pending: Vec<&PathBuf> = Vec::new();

    for path in &files {
        let content = read_markdown(&settings.root, path)?;
        if settings.rewrite(&content)? != content {
            println!("UNLINKED  {}", path.display());
            pending.push(path);
        }
    }

    if pending.is_empty() {
        let total = files.len();
        println!("All {total} markdown files linked");
        return Ok(ExitCode::SUCCESS);
    }

    let count = pending.len();
    println!();
    println!("{count} files need rewriting");
    println!("Run `ghlink apply` to rewrite them.");
    return Ok(ExitCode::from(EXIT_NEEDS_REWRITE));
}

/// Print the rewritten document to stdout. `None` or `-` reads stdin.
///
/// # Errors
///
/// Returns read errors or `Error::MissingRepositoryContext`.
pub fn render(settings: &Settings, file: Option<&Path>) -> Result<(), error::Error> {
    let content = match file {
        Some(path) if path != Path::new("-") => read_markdown(&settings.root, path)?,
        _ => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        },
    };
    print!("{}", settings.rewrite(&content)?);
    return Ok(());
}

// ── scan ──────────────────────────────────────────────────────────────

/// One recognized reference or link, as reported by `scan`.
#[derive(Debug, Serialize)]
struct ScanRow {
    /// Markdown file.
    file: PathBuf,
    /// Shorthand kind, or the page of a classified link.
    kind: String,
    /// One-based line.
    line: usize,
    /// Project, when known.
    project: Option<String>,
    /// SHA or issue/PR number.
    reference: String,
    /// Matched text or link destination.
    text: String,
    /// User, when known.
    user: Option<String>,
}

/// Turn collected matches of one file into report rows.
fn scan_rows(file: &Path, content: &str, found: Vec<Found>) -> Vec<ScanRow> {
    return found
        .into_iter()
        .map(|item| {
            return match item {
                Found::Reference(r) => ScanRow {
                    file: file.to_path_buf(),
                    kind: r.kind.as_str().to_string(),
                    line: markdown::line_of(content, r.span.start),
                    project: r.project,
                    reference: r.value,
                    text: r.marker,
                    user: r.user,
                },
                Found::Link { link, range } => ScanRow {
                    file: file.to_path_buf(),
                    kind: format!("link:{}", link.page),
                    line: markdown::line_of(content, range.start),
                    project: Some(link.project),
                    reference: link.reference,
                    text: content.get(range).unwrap_or_default().to_string(),
                    user: Some(link.user),
                },
            };
        })
        .collect();
}

/// List recognized references and GitHub links without rewriting.
///
/// # Errors
///
/// Returns file errors or `Error::Json` if serialization fails.
pub fn scan(settings: &Settings, files: &[PathBuf], json: bool) -> Result<(), error::Error> {
    let files = markdown_files(&settings.root, &settings.config, files)?;
    let mut rows = Vec::new();

    for path in &files {
        let content = read_markdown(&settings.root, path)?;
        let found = markdown::collect(&content);
        rows.extend(scan_rows(path, &content, found));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        println!("{}:{}  {:<16}  {}", row.file.display(), row.line, row.kind, row.text);
    }
    let count = rows.len();
    eprintln!("{count} references in {} files", files.len());
    return Ok(());
}

// ── init ──────────────────────────────────────────────────────────────

/// Record the repository in `.ghlink.toml`, preserving the rest of the file.
///
/// # Errors
///
/// Returns `Error::InvalidRepository` if the value cannot be parsed,
/// `Error::ParseFailed` if the existing config is not valid TOML, or `Error::Io`.
pub fn init(repository: &str) -> Result<(), error::Error> {
    let context = repository::parse_or_fail(repository)?;
    let config_path = PathBuf::from(".").join(config::CONFIG_FILE);

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(error::Error::Io(e)),
    };
    let mut doc: toml_edit::DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| {
        return error::Error::ParseFailed { file: config_path.clone(), reason: e.to_string() };
    })?;

    doc.insert("repository", toml_edit::value(repository));
    std::fs::write(&config_path, doc.to_string())?;

    eprintln!(
        "Wrote repository {}/{} ({}) to {}",
        context.user,
        context.project,
        context.base_url,
        config::CONFIG_FILE
    );
    return Ok(());
}

/// Output the reference document.
pub fn info(json: bool) {
    crate::info::run(json);
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
    use crate::types::RepositoryContext;

    #[test]
    fn walks_markdown_with_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("docs/archive")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("readme.md"), "#1").unwrap();
        std::fs::write(root.join("docs/guide.markdown"), "#2").unwrap();
        std::fs::write(root.join("docs/archive/old.md"), "#3").unwrap();
        std::fs::write(root.join("node_modules/pkg/readme.md"), "#4").unwrap();
        std::fs::write(root.join("notes.txt"), "#5").unwrap();

        let config = Config::parse("exclude = [\"docs/archive/\"]").unwrap();
        let files = markdown_files(root, &config, &[]).unwrap();
        assert_eq!(files, vec![PathBuf::from("docs/guide.markdown"), PathBuf::from("readme.md")]);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = markdown_files(Path::new("."), &Config::default(), &[PathBuf::from("no/such/file.md")]).unwrap_err();
        assert!(matches!(err, error::Error::FileNotFound { .. }));
    }

    #[test]
    fn scan_rows_cover_references_and_links() {
        let content = "@wooorm fixed #3\n\n[https://github.com/a/b/commit/abcdef1](https://github.com/a/b/commit/abcdef1)\n";
        let rows = scan_rows(Path::new("x.md"), content, markdown::collect(content));
        let kinds: Vec<&str> = rows.iter().map(|r| return r.kind.as_str()).collect();
        assert_eq!(kinds, vec!["mention", "issue_or_pr", "link:commit"]);
        assert_eq!(rows[2].line, 3);
        assert_eq!(rows[2].user.as_deref(), Some("a"));
    }

    #[test]
    fn settings_rewrite_uses_options() {
        let settings = Settings {
            config: Config::default(),
            options: RewriteOptions { mention_strong: false },
            root: PathBuf::from("."),
            source: RepositorySource::Explicit(RepositoryContext::new("wooorm", "remark")),
        };
        assert_eq!(settings.rewrite("@wooorm").unwrap(), "[@wooorm](https://github.com/wooorm)");
    }
}
