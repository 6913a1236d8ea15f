//! Version-control helpers.

use std::path::Path;
use toolsmith_core::{Context, Error, ExecSpec, Result};

fn git(root: &Path) -> ExecSpec {
    ExecSpec::new("git").dir(root).inherit_env()
}

/// `git fetch -p` in `root`.
///
/// # Errors
///
/// Returns the git failure.
pub async fn fetch(ctx: &Context, root: &Path) -> Result<()> {
    git(root).args(["fetch", "-p"]).run(ctx.cancel()).await?;
    Ok(())
}

/// Fail with [`Error::DirtyTree`] if `git status -s` reports anything.
///
/// # Errors
///
/// Returns the git failure or the dirty status.
pub async fn status_clean(ctx: &Context, root: &Path) -> Result<()> {
    let output = git(root)
        .args(["status", "-s"])
        .capture()
        .run(ctx.cancel())
        .await?;
    let status = output.stdout_text();
    if status.is_empty() {
        Ok(())
    } else {
        Err(Error::DirtyTree { status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolsmith_core::config::Config;
    use toolsmith_core::{DevPaths, ToolRegistry};

    async fn has_git() -> bool {
        tokio::process::Command::new("git")
            .arg("--version")
            .output()
            .await
            .is_ok_and(|o| o.status.success())
    }

    async fn sh(dir: &Path, script: &str) {
        let status = tokio::process::Command::new("/bin/sh")
            .args(["-c", script])
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "t")
            .env("GIT_AUTHOR_EMAIL", "t@example.com")
            .env("GIT_COMMITTER_NAME", "t")
            .env("GIT_COMMITTER_EMAIL", "t@example.com")
            .status()
            .await
            .unwrap();
        assert!(status.success(), "{script}");
    }

    #[tokio::test]
    async fn test_status_clean_detects_changes() {
        if !has_git().await {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(DevPaths::new(dir.path()), ToolRegistry::new(), Config::default());

        sh(dir.path(), "git init -q . && git add -A && git commit -q --allow-empty -m init").await;
        status_clean(&ctx, dir.path()).await.unwrap();

        std::fs::write(dir.path().join("new.txt"), "x").unwrap();
        let err = status_clean(&ctx, dir.path()).await.unwrap_err();
        match err {
            Error::DirtyTree { status } => assert!(status.contains("new.txt")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
