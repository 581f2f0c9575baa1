use std::path::Path;

use crate::error::Error;

/// Name of the project config file.
pub const CONFIG_FILE: &str = ".ghlink.toml";

/// Project configuration loaded from `.ghlink.toml`.
/// Include/exclude patterns are path prefixes applied to markdown files.
#[derive(Debug, Default)]
pub struct Config {
    /// Base URL override for whichever repository source wins.
    pub base_url: Option<String>,
    exclude: Vec<String>,
    include: Vec<String>,
    /// Wrap mention labels in strong emphasis. `None` when unset.
    pub mention_strong: Option<bool>,
    /// Explicit repository.
    pub repository: Option<RepositorySetting>,
}

/// The `repository` key: a shorthand/URL string or an explicit table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(untagged)]
pub enum RepositorySetting {
    /// `repository = "user/project"` or any URL form `parse_repository` accepts.
    Shorthand(String),
    /// `repository = { user = "…", project = "…", base_url = "…" }`.
    Table {
        /// Web root, defaults to github.com.
        #[serde(default)]
        base_url: Option<String>,
        /// Project name.
        project: String,
        /// Owner login.
        user: String,
    },
}

/// Raw TOML structure for `.ghlink.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct GhlinkTomlConfig {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    mention_strong: Option<bool>,
    #[serde(default)]
    repository: Option<RepositorySetting>,
}

impl Config {
    /// Load config from `.ghlink.toml` in the given root directory.
    /// Returns a default that processes everything if the file doesn't exist.
    /// Returns an error if the file exists but is malformed. Never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: GhlinkTomlConfig = toml::from_str(content)?;
        return Ok(Self {
            base_url: raw.base_url,
            exclude: raw.exclude,
            include: raw.include,
            mention_strong: raw.mention_strong,
            repository: raw.repository,
        });
    }

    /// Check whether a markdown file path should be processed.
    ///
    /// A path is included if no include patterns are set,
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
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
    fn empty_config_scans_everything() {
        let config = Config::parse("").unwrap();
        assert!(config.should_scan("readme.md"));
        assert!(config.repository.is_none());
        assert!(config.mention_strong.is_none());
    }

    #[test]
    fn include_and_exclude_prefixes() {
        let config = Config::parse("include = [\"docs/\"]\nexclude = [\"docs/archive/\"]\n").unwrap();
        assert!(config.should_scan("docs/guide.md"));
        assert!(!config.should_scan("docs/archive/old.md"));
        assert!(!config.should_scan("readme.md"));
    }

    #[test]
    fn repository_string_or_table() {
        let config = Config::parse("repository = \"wooorm/remark\"").unwrap();
        assert_eq!(config.repository, Some(RepositorySetting::Shorthand("wooorm/remark".to_string())));

        let config = Config::parse(
            "repository = { user = \"wooorm\", project = \"remark\", base_url = \"https://ghe.example\" }",
        )
        .unwrap();
        assert_eq!(
            config.repository,
            Some(RepositorySetting::Table {
                base_url: Some("https://ghe.example".to_string()),
                project: "remark".to_string(),
                user: "wooorm".to_string(),
            })
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("repo = \"wooorm/remark\"").is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.should_scan("anything.md"));
    }
}
