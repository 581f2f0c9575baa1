//! File watcher: runs `check` on startup, then re-runs on markdown or config changes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};
use tracing::debug;

use crate::commands::{self, GlobalFlags};
use crate::config::CONFIG_FILE;
use crate::diagnostics;
use crate::error;

/// Debounce delay between filesystem events and re-check.
const DEBOUNCE_MS: u64 = 100;

/// Whether a changed path can affect the check result.
fn is_relevant(path: &Path) -> bool {
    if path.components().any(|c| return c.as_os_str() == ".git" || c.as_os_str() == "target") {
        return false;
    }
    let name = path.file_name().and_then(|n| return n.to_str()).unwrap_or_default();
    return matches!(name, CONFIG_FILE | "Cargo.toml" | "package.json")
        || path
            .extension()
            .and_then(|ext| return ext.to_str())
            .is_some_and(|ext| return ext == "md" || ext == "markdown");
}

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<()>,
) -> Result<notify::RecommendedWatcher, error::Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_)
            )
            && event.paths.iter().any(|p| return is_relevant(p))
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return error::Error::Watch {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Entry point for the watch command.
///
/// Runs an initial check, then watches the project and re-checks on changes.
/// Settings are reloaded on each run so config edits take effect.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be set up.
pub fn run(flags: &GlobalFlags<'_>) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");

    eprintln!("watch: initial check");
    let mut last_code = run_check(flags);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    watcher.watch(&root, RecursiveMode::Recursive).map_err(|e| {
        return error::Error::Watch { reason: format!("cannot watch {}: {e}", root.display()) };
    })?;

    eprintln!("watch: monitoring {}, press Ctrl+C to stop", root.display());

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        debug!("change detected");
        eprintln!("watch: change detected, re-checking...");
        last_code = run_check(flags);
    }

    return Ok(last_code);
}

/// Run check once and print result. Returns the exit code from check.
fn run_check(flags: &GlobalFlags<'_>) -> ExitCode {
    let result = commands::Settings::load(flags).and_then(|settings| return commands::check(&settings, &[]));
    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3_u8)
        },
    };
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
    fn relevant_paths() {
        assert!(is_relevant(Path::new("./docs/readme.md")));
        assert!(is_relevant(Path::new("./.ghlink.toml")));
        assert!(is_relevant(Path::new("./package.json")));
        assert!(!is_relevant(Path::new("./src/main.rs")));
        assert!(!is_relevant(Path::new("./target/doc/readme.md")));
        assert!(!is_relevant(Path::new("./.git/HEAD")));
    }
}
