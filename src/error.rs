/// Crate-level error types for ghlink diagnostics.
use std::path::PathBuf;

/// Every hard failure ghlink can surface. Pattern misses never show up here:
/// text or links that are not GitHub references are left alone silently.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A repository value could not be understood as a GitHub repository.
    #[error("invalid repository: `{value}`")]
    InvalidRepository {
        /// The value as written in the flag, config, or metadata file.
        value: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A metadata file (`package.json`) is not valid JSON.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A reference needs a repository but none was configured or discovered.
    #[error(
        "Missing `repository`: not configured and not found in {}",
        searched.iter().map(|p| return p.display().to_string()).collect::<Vec<_>>().join(", ")
    )]
    MissingRepositoryContext {
        /// Metadata files that were looked at.
        searched: Vec<PathBuf>,
    },

    /// A config or metadata file could not be parsed.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The filesystem watcher could not be set up.
    #[error("watch: {reason}")]
    Watch {
        /// Description of the watcher failure.
        reason: String,
    },
}
