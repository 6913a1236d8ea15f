//! Named command table.
//!
//! Each entry is a thin body over the provisioning and build primitives. The
//! project root is the working directory. Aggregates such as `lint` only
//! declare dependencies; the runner makes sure shared steps run once.

use std::path::PathBuf;
use toolsmith_core::{Command, CommandFuture, Context, Deps, Error, Platform, Result};

use crate::{git, go, rust};

fn project_root() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| Error::io_no_path(e, "current directory"))
}

fn lint<'a>(ctx: &'a Context, deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move { deps.require(ctx, &[&LINT_GO, &LINT_RUST]).await })
}

fn test<'a>(ctx: &'a Context, deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move { deps.require(ctx, &[&TEST_GO, &TEST_RUST]).await })
}

fn tidy<'a>(ctx: &'a Context, deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move { deps.require(ctx, &[&TIDY_GO]).await })
}

fn generate<'a>(ctx: &'a Context, deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move { deps.require(ctx, &[&GENERATE_GO]).await })
}

fn lint_go<'a>(ctx: &'a Context, deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move {
        go::lint(ctx, &project_root()?).await?;
        // Tidying must not leave changes behind.
        deps.require(ctx, &[&TIDY_GO, &GIT_STATUS]).await
    })
}

fn test_go<'a>(ctx: &'a Context, _deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move { go::test(ctx, &project_root()?).await })
}

fn tidy_go<'a>(ctx: &'a Context, _deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move { go::tidy(ctx, &project_root()?).await })
}

fn generate_go<'a>(ctx: &'a Context, _deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move { go::generate(ctx, &project_root()?).await })
}

fn lint_rust<'a>(ctx: &'a Context, _deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move { rust::lint(ctx, &project_root()?).await })
}

fn test_rust<'a>(ctx: &'a Context, _deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move { rust::test(ctx, &project_root()?).await })
}

fn git_fetch<'a>(ctx: &'a Context, _deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move { git::fetch(ctx, &project_root()?).await })
}

fn git_status<'a>(ctx: &'a Context, _deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move { git::status_clean(ctx, &project_root()?).await })
}

fn tools_install<'a>(ctx: &'a Context, _deps: &'a dyn Deps) -> CommandFuture<'a> {
    Box::pin(async move {
        ctx.ensure_all(Platform::local()).await?;
        Ok(())
    })
}

/// Every linter.
pub static LINT: Command = Command::new("lint", "Runs all linters", lint);
/// Every test suite.
pub static TEST: Command = Command::new("test", "Runs all tests", test);
/// Every dependency tidier.
pub static TIDY: Command = Command::new("tidy", "Tidies dependencies", tidy);
/// Every code generator.
pub static GENERATE: Command = Command::new("generate", "Generates code", generate);
/// golangci-lint, then tidy and a clean-tree check.
pub static LINT_GO: Command = Command::new("lint/go", "Runs Go linters", lint_go);
/// Go tests with race detection and coverage.
pub static TEST_GO: Command = Command::new("test/go", "Runs Go tests", test_go);
/// `go mod tidy` in every module.
pub static TIDY_GO: Command = Command::new("tidy/go", "Runs go mod tidy", tidy_go);
/// `go generate` in every module.
pub static GENERATE_GO: Command = Command::new("generate/go", "Runs go generate", generate_go);
/// cargo clippy.
pub static LINT_RUST: Command = Command::new("lint/rust", "Runs cargo clippy", lint_rust);
/// cargo test.
pub static TEST_RUST: Command = Command::new("test/rust", "Runs cargo test", test_rust);
/// `git fetch -p`.
pub static GIT_FETCH: Command = Command::new("git/fetch", "Fetches remote changes", git_fetch);
/// Fails when the working tree has uncommitted changes.
pub static GIT_STATUS: Command = Command::new(
    "git/status",
    "Checks that the working tree is clean",
    git_status,
);
/// Every tool compatible with the host.
pub static TOOLS_INSTALL: Command = Command::new(
    "tools/install",
    "Installs all tools for the host platform",
    tools_install,
);

/// The command table, in listing order.
pub static COMMANDS: [&Command; 13] = [
    &LINT,
    &TEST,
    &TIDY,
    &GENERATE,
    &LINT_GO,
    &TEST_GO,
    &TIDY_GO,
    &GENERATE_GO,
    &LINT_RUST,
    &TEST_RUST,
    &GIT_FETCH,
    &GIT_STATUS,
    &TOOLS_INSTALL,
];

/// Look up a command by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().copied().find(|c| c.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = COMMANDS.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), COMMANDS.len());
    }

    #[test]
    fn test_find() {
        assert_eq!(find("lint/go").map(|c| c.description), Some("Runs Go linters"));
        assert!(find("deploy").is_none());
    }
}
