//! Solver executable lookup

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Executable name searched on PATH when nothing else is configured
pub const DEFAULT_SOLVER: &str = "shd";

/// Find the solver executable
///
/// Priority:
/// 1. `--solver` from the command line (relative to the current directory)
/// 2. `solver.path` from the manifest (relative to the manifest)
/// 3. `shd` on PATH
///
/// Bare names without a directory part are always looked up on PATH.
pub fn locate_solver(
    explicit: Option<&Path>,
    manifest_path: Option<&Path>,
    manifest_dir: &Path,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return resolve(path, Path::new("."));
    }
    if let Some(path) = manifest_path {
        return resolve(path, manifest_dir);
    }

    which::which(DEFAULT_SOLVER).with_context(|| {
        format!(
            "Could not find the {DEFAULT_SOLVER} solver.\n\
            Options:\n\
            - Install it to PATH\n\
            - Set solver.path in skin.toml\n\
            - Pass --solver <PATH>"
        )
    })
}

fn resolve(path: &Path, base: &Path) -> Result<PathBuf> {
    if is_bare_name(path) {
        return which::which(path)
            .with_context(|| format!("Solver {:?} not found on PATH", path));
    }

    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    if !path.is_file() {
        anyhow::bail!("Solver not found at {}", path.display());
    }
    Ok(path)
}

fn is_bare_name(path: &Path) -> bool {
    path.components().count() == 1 && path.parent().is_some_and(|p| p.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_bare_name() {
        assert!(is_bare_name(Path::new("shd")));
        assert!(!is_bare_name(Path::new("bin/shd")));
        assert!(!is_bare_name(Path::new("./shd")));
        assert!(!is_bare_name(Path::new("/usr/bin/shd")));
    }

    #[test]
    fn test_manifest_path_relative_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/shd"), "").unwrap();

        let found = locate_solver(None, Some(Path::new("bin/shd")), dir.path()).unwrap();
        assert_eq!(found, dir.path().join("bin/shd"));
    }

    #[test]
    fn test_missing_solver_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate_solver(None, Some(Path::new("bin/shd")), dir.path()).unwrap_err();
        assert!(err.to_string().contains("bin/shd"));
    }

    #[test]
    fn test_explicit_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom-shd");
        std::fs::write(&explicit, "").unwrap();

        let found =
            locate_solver(Some(&explicit), Some(Path::new("bin/shd")), dir.path()).unwrap();
        assert_eq!(found, explicit);
    }

    #[cfg(unix)]
    #[test]
    fn test_bare_name_uses_path() {
        let found = locate_solver(None, Some(Path::new("sh")), Path::new("/nowhere")).unwrap();
        assert!(found.is_absolute());
    }
}
