//! `cargo run -p architecture-lint`: check backend layer boundaries.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stderr = io::stderr().lock();
    let Some(root) = workspace_root() else {
        let _ = writeln!(
            stderr,
            "cannot find the workspace root (a Cargo.toml declaring [workspace])"
        );
        return ExitCode::FAILURE;
    };
    match architecture_lint::lint_backend_sources(&root.join("backend")) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(stderr, "{err}");
            ExitCode::FAILURE
        }
    }
}

/// First ancestor of the current directory, then of this crate, holding the
/// workspace manifest.
fn workspace_root() -> Option<PathBuf> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    std::env::current_dir()
        .ok()
        .and_then(|cwd| find_workspace_root(&cwd))
        .or_else(|| find_workspace_root(&manifest_dir))
}

fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| {
            fs::read_to_string(dir.join("Cargo.toml"))
                .is_ok_and(|manifest| manifest.contains("[workspace]"))
        })
        .map(Path::to_path_buf)
}
