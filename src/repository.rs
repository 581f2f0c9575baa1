//! Repository context: where references without explicit attribution point.
//!
//! The context is resolved by a [`RepositoryContextProvider`] handed to the
//! rewriter, never read from process-global state.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Config, RepositorySetting};
use crate::error::Error;
use crate::types::RepositoryContext;

/// Supplies the repository context for one document pass.
pub trait RepositoryContextProvider {
    /// Resolve `{user, project, base_url}`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingRepositoryContext` when nothing is configured or
    /// discoverable, or errors from reading metadata files.
    fn repository_context(&self) -> Result<RepositoryContext, Error>;
}

/// Where the repository context comes from.
#[derive(Debug, Clone)]
pub enum RepositorySource {
    /// Metadata discovery in a project directory.
    Discover {
        /// Base URL override applied to the discovered context.
        base_url: Option<String>,
        /// Directory holding `Cargo.toml` / `package.json`.
        root: PathBuf,
    },
    /// Given explicitly by flag or config.
    Explicit(RepositoryContext),
    /// Nothing available: every request fails.
    Unavailable,
}

impl RepositorySource {
    /// Pick the source in priority order: flag, config, metadata discovery.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRepository` if an explicit value cannot be parsed.
    pub fn select(flag: Option<&str>, base_url: Option<&str>, config: &Config, root: &Path) -> Result<Self, Error> {
        let base_url = base_url.or(config.base_url.as_deref());

        let explicit = match (flag, &config.repository) {
            (Some(value), _) => Some(parse_or_fail(value)?),
            (None, Some(RepositorySetting::Shorthand(value))) => Some(parse_or_fail(value)?),
            (None, Some(RepositorySetting::Table { base_url: table_base, project, user })) => {
                let context = RepositoryContext::new(user.as_str(), project.as_str());
                Some(match table_base {
                    Some(table_base) => context.with_base_url(table_base),
                    None => context,
                })
            },
            (None, None) => None,
        };

        return Ok(match explicit {
            Some(context) => Self::Explicit(match base_url {
                Some(base_url) => context.with_base_url(base_url),
                None => context,
            }),
            None => Self::Discover {
                base_url: base_url.map(str::to_string),
                root: root.to_path_buf(),
            },
        });
    }
}

impl RepositoryContextProvider for RepositorySource {
    fn repository_context(&self) -> Result<RepositoryContext, Error> {
        return match self {
            Self::Explicit(context) => Ok(context.clone()),
            Self::Unavailable => Err(Error::MissingRepositoryContext { searched: Vec::new() }),
            Self::Discover { base_url, root } => {
                let context = discover(root)?;
                Ok(match base_url {
                    Some(base_url) => context.with_base_url(base_url),
                    None => context,
                })
            },
        };
    }
}

/// Parse an explicit repository value.
///
/// # Errors
///
/// Returns `Error::InvalidRepository` when the value is not a GitHub repository.
pub fn parse_or_fail(value: &str) -> Result<RepositoryContext, Error> {
    return parse_repository(value).ok_or_else(|| return Error::InvalidRepository { value: value.to_string() });
}

// ── Metadata discovery ────────────────────────────────────────────────

/// Metadata files consulted during discovery, in order.
const METADATA_FILES: [&str; 2] = ["Cargo.toml", "package.json"];

/// Find the repository in `Cargo.toml` or `package.json` under `root`.
///
/// # Errors
///
/// Returns `Error::MissingRepositoryContext` when neither file names a
/// repository, `Error::InvalidRepository` when one names something
/// unparseable, or read/parse errors.
fn discover(root: &Path) -> Result<RepositoryContext, Error> {
    let mut searched = Vec::new();

    for name in METADATA_FILES {
        let path = root.join(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                searched.push(path);
                continue;
            },
            Err(e) => return Err(Error::Io(e)),
        };

        let value = if name == "Cargo.toml" {
            cargo_repository(&path, &content)?
        } else {
            package_json_repository(&content)?
        };
        searched.push(path.clone());

        if let Some(value) = value {
            debug!(file = %path.display(), repository = %value, "discovered repository");
            return parse_or_fail(&value);
        }
    }

    return Err(Error::MissingRepositoryContext { searched });
}

/// `package.repository` (or `workspace.package.repository`) from a `Cargo.toml`.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the manifest is not valid TOML.
fn cargo_repository(path: &Path, content: &str) -> Result<Option<String>, Error> {
    let manifest: toml::Table = content.parse().map_err(|e: toml::de::Error| {
        return Error::ParseFailed { file: path.to_path_buf(), reason: e.to_string() };
    })?;

    // `repository.workspace = true` inherits from `[workspace.package]`.
    let own = manifest
        .get("package")
        .and_then(|p| return p.get("repository"))
        .and_then(toml::Value::as_str);
    let inherited = || {
        return manifest
            .get("workspace")
            .and_then(|w| return w.get("package"))
            .and_then(|p| return p.get("repository"))
            .and_then(toml::Value::as_str);
    };
    return Ok(own.or_else(inherited).map(str::to_string));
}

/// `repository` from a `package.json`: either a string or `{ "url": … }`.
///
/// # Errors
///
/// Returns `Error::Json` if the file is not valid JSON.
fn package_json_repository(content: &str) -> Result<Option<String>, Error> {
    let manifest: serde_json::Value = serde_json::from_str(content)?;
    let repository = manifest.get("repository");
    let value = repository
        .and_then(serde_json::Value::as_str)
        .or_else(|| return repository.and_then(|r| return r.get("url")).and_then(serde_json::Value::as_str));
    return Ok(value.map(str::to_string));
}

// ── Repository URL parsing ────────────────────────────────────────────

/// Parse the repository forms found in manifests and config.
///
/// Accepts `user/project` shorthands (optionally with `#ref` / `@ref`),
/// `github:user/project`, `https://`, `git://`, `git+https://` and
/// `git@host:` URLs, including `repos/…/tarball` and codeload archive paths.
/// The base URL is `https://<host>/` for URL forms and github.com otherwise.
pub fn parse_repository(value: &str) -> Option<RepositoryContext> {
    let value = value.trim();
    let value = value.strip_prefix("github:").unwrap_or(value);

    if let Some((_scheme, rest)) = value.split_once("://") {
        let (authority, path) = strip_ref(rest).split_once('/')?;
        let host = authority.rsplit_once('@').map_or(authority, |(_, host)| return host);
        return from_host_path(host, path);
    }

    if let Some(rest) = value.strip_prefix("git@") {
        let (host, path) = strip_ref(rest).split_once(':')?;
        return from_host_path(host, path);
    }

    let (user, rest) = value.split_once('/')?;
    let project = rest.split(['#', '@']).next().unwrap_or(rest);
    return context_if_valid(user, project, None);
}

/// Drop a trailing `#ref` or `?query`.
fn strip_ref(value: &str) -> &str {
    return value.split(['#', '?']).next().unwrap_or(value);
}

/// Build a context from a host and its repository path.
fn from_host_path(host: &str, path: &str) -> Option<RepositoryContext> {
    if host.is_empty() || host.contains(char::is_whitespace) {
        return None;
    }
    let mut segments = path.split('/').filter(|s| return !s.is_empty());
    let mut user = segments.next()?;
    if user == "repos" {
        user = segments.next()?;
    }
    let project = segments.next()?;
    let project = project.strip_suffix(".git").unwrap_or(project);
    return context_if_valid(user, project, Some(host));
}

/// Validate user and project names and assemble the context.
fn context_if_valid(user: &str, project: &str, host: Option<&str>) -> Option<RepositoryContext> {
    let user_ok = !user.is_empty() && user.bytes().all(|b| return b.is_ascii_alphanumeric() || b == b'-');
    let project_ok = !project.is_empty()
        && project.bytes().all(|b| return b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if !user_ok || !project_ok {
        return None;
    }

    let context = RepositoryContext::new(user, project);
    return Some(match host {
        Some(host) => context.with_base_url(&format!("https://{host}/")),
        None => context,
    });
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

    const GITHUB: &str = "https://github.com/";
    const CODELOAD: &str = "https://codeload.github.com/";

    fn check(value: &str, user: &str, project: &str, base_url: &str) {
        let context = parse_repository(value).unwrap_or_else(|| panic!("should parse `{value}`"));
        assert_eq!(context.user, user, "user of `{value}`");
        assert_eq!(context.project, project, "project of `{value}`");
        assert_eq!(context.base_url, base_url, "base url of `{value}`");
    }

    #[test]
    fn repository_forms() {
        let cases = [
            ("component/emitter", GITHUB),
            ("https://github.com/component/emitter", GITHUB),
            ("git://github.com/component/emitter.git", GITHUB),
            ("https://github.com/repos/component/emitter/tarball", GITHUB),
            ("https://github.com/repos/component/emitter/zipball", GITHUB),
            ("https://codeload.github.com/component/emitter/legacy.zip", CODELOAD),
            ("https://codeload.github.com/component/emitter/legacy.tar.gz", CODELOAD),
            ("component/emitter#1", GITHUB),
            ("component/emitter@1", GITHUB),
            ("component/emitter#\"1\"", GITHUB),
            ("component/emitter@\"1\"", GITHUB),
            ("git://github.com/component/emitter.git#1", GITHUB),
            ("https://github.com/repos/component/emitter/tarball/1", GITHUB),
            ("https://github.com/repos/component/emitter/zipball/1", GITHUB),
            ("https://codeload.github.com/component/emitter/legacy.zip/1", CODELOAD),
            ("https://codeload.github.com/component/emitter/legacy.tar.gz/1", CODELOAD),
            ("https://github.com/component/emitter/archive/1.tar.gz", GITHUB),
            ("git+https://github.com/component/emitter.git", GITHUB),
            ("git@github.com:component/emitter.git", GITHUB),
            ("github:component/emitter", GITHUB),
        ];
        for (value, base_url) in cases {
            check(value, "component", "emitter", base_url);
        }
    }

    #[test]
    fn unusual_names() {
        check("mame/_", "mame", "_", GITHUB);
        check("github/.gitignore", "github", ".gitignore", GITHUB);
        check("github/.gitc", "github", ".gitc", GITHUB);
        check("Qix-/color-convert", "Qix-", "color-convert", GITHUB);
        check("wooorm/wooorm.github.io", "wooorm", "wooorm.github.io", GITHUB);
    }

    #[test]
    fn rejects_non_repositories() {
        assert_eq!(parse_repository("remark"), None);
        assert_eq!(parse_repository("https://github.com/wooorm"), None);
        assert_eq!(parse_repository("a b/c"), None);
        assert_eq!(parse_repository(""), None);
    }

    #[test]
    fn flag_beats_config_and_base_url_overrides() {
        let config = Config::parse("repository = \"a/b\"\nbase_url = \"https://ghe.example\"").unwrap();
        let source = RepositorySource::select(Some("c/d"), None, &config, Path::new(".")).unwrap();
        let context = source.repository_context().unwrap();
        assert_eq!((context.user.as_str(), context.project.as_str()), ("c", "d"));
        assert_eq!(context.base_url, "https://ghe.example/");
    }

    #[test]
    fn invalid_explicit_repository_fails_early() {
        let config = Config::default();
        let err = RepositorySource::select(Some("nope"), None, &config, Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::InvalidRepository { .. }));
    }

    #[test]
    fn discovers_package_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"repository": {"url": "https://github.com/test/remark-github"}}"#)
            .unwrap();
        let source = RepositorySource::Discover { base_url: None, root: dir.path().to_path_buf() };
        assert_eq!(source.repository_context().unwrap(), RepositoryContext::new("test", "remark-github"));
    }

    #[test]
    fn discovers_cargo_manifest_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"x\"\nrepository = \"https://github.com/wooorm/remark\"\n")
            .unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"repository": "test/remark-github"}"#).unwrap();
        let source = RepositorySource::Discover {
            base_url: Some("https://enteprise-github.xyz:443".to_string()),
            root: dir.path().to_path_buf(),
        };
        let context = source.repository_context().unwrap();
        assert_eq!(context.user, "wooorm");
        assert_eq!(context.base_url, "https://enteprise-github.xyz:443/");
    }

    #[test]
    fn discovers_workspace_inherited_repository() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"x\"\nrepository.workspace = true\n\n[workspace.package]\nrepository = \"https://github.com/a/b\"\n",
        )
        .unwrap();
        let source = RepositorySource::Discover { base_url: None, root: dir.path().to_path_buf() };
        assert_eq!(source.repository_context().unwrap(), RepositoryContext::new("a", "b"));
    }

    #[test]
    fn workspace_only_manifest_is_discovered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[workspace.package]\nrepository = \"github:c/d\"\n").unwrap();
        let source = RepositorySource::Discover { base_url: None, root: dir.path().to_path_buf() };
        assert_eq!(source.repository_context().unwrap(), RepositoryContext::new("c", "d"));
    }

    #[test]
    fn discovery_without_metadata_is_missing_context() {
        let dir = tempfile::tempdir().unwrap();
        let source = RepositorySource::Discover { base_url: None, root: dir.path().to_path_buf() };
        let err = source.repository_context().unwrap_err();
        assert!(matches!(err, Error::MissingRepositoryContext { ref searched } if searched.len() == 2));
        assert!(err.to_string().starts_with("Missing `repository`"));
    }
}
