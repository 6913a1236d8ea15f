//! Filesystem plumbing shared by the language builders.

use std::path::{Path, PathBuf};
use toolsmith_core::{EnvDescriptor, Error, Result};

/// Create every directory an environment descriptor points at, so tools do
/// not fall back to defaults outside the dev root.
///
/// # Errors
///
/// Returns an I/O error if a directory cannot be created.
pub async fn create_env_dirs(env: &EnvDescriptor) -> Result<()> {
    for dir in env.directories() {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::io(e, &dir, "create"))?;
    }
    Ok(())
}

/// Absolute form of `output` with its parent directory created.
///
/// # Errors
///
/// Returns an I/O error if the path cannot be made absolute or the parent
/// cannot be created.
pub async fn prepare(output: &Path) -> Result<PathBuf> {
    let output = std::path::absolute(output).map_err(|e| Error::io(e, output, "resolve"))?;
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(e, parent, "create"))?;
    }
    Ok(output)
}

/// Fail with a compile error unless the build left a file at `output`.
///
/// # Errors
///
/// Returns [`Error::Compile`] naming `package` when `output` is missing.
pub fn verify(package: &Path, output: &Path) -> Result<()> {
    if output.is_file() {
        Ok(())
    } else {
        Err(Error::compile(
            package,
            format!("build produced no file at {}", output.display()),
        ))
    }
}

/// Canonical path of an existing directory.
///
/// # Errors
///
/// Returns an I/O error if `dir` does not exist.
pub fn canonical(dir: &Path) -> Result<PathBuf> {
    dir.canonicalize().map_err(|e| Error::io(e, dir, "resolve"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolsmith_core::{DevPaths, Platform};

    #[tokio::test]
    async fn test_prepare_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let output = prepare(&dir.path().join("out/bin/app")).await.unwrap();
        assert!(output.is_absolute());
        assert!(dir.path().join("out/bin").is_dir());
    }

    #[tokio::test]
    async fn test_create_env_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvDescriptor::go(&DevPaths::new(dir.path()), Platform::DOCKER_AMD64);
        create_env_dirs(&env).await.unwrap();
        assert!(dir.path().join("env/go/home").is_dir());
        assert!(dir.path().join("env/go/cache/gobuild").is_dir());
    }

    #[test]
    fn test_verify_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify(Path::new("cmd/app"), &dir.path().join("app")).unwrap_err();
        assert!(matches!(err, Error::Compile { package, .. } if package == "cmd/app"));
    }
}
