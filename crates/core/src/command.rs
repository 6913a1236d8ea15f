//! Named commands and dependency declaration.
//!
//! A [`Command`] is `{name, description, body}`. Bodies receive a [`Deps`]
//! handle and call [`Deps::require`] before doing any work; the handle
//! guarantees each required command has completed successfully once in the
//! current run before returning.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::Result;
use crate::context::Context;

/// Future returned by a command body.
pub type CommandFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Signature of a command body.
pub type CommandBody = for<'a> fn(&'a Context, &'a dyn Deps) -> CommandFuture<'a>;

/// A registrable unit of work.
#[derive(Clone, Copy)]
pub struct Command {
    /// Unique name, e.g. `lint/go`.
    pub name: &'static str,
    /// Human description shown in listings.
    pub description: &'static str,
    /// Body to run.
    pub body: CommandBody,
}

impl Command {
    /// Create a command.
    #[must_use]
    pub const fn new(name: &'static str, description: &'static str, body: CommandBody) -> Self {
        Self {
            name,
            description,
            body,
        }
    }

    /// Run the body once, without memoization.
    pub fn run<'a>(&self, ctx: &'a Context, deps: &'a dyn Deps) -> CommandFuture<'a> {
        (self.body)(ctx, deps)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Dependency declaration handle passed to command bodies.
#[async_trait]
pub trait Deps: Send + Sync {
    /// Run every command in `commands` that has not yet succeeded in this run.
    ///
    /// Commands run in the given order; the first failure is returned.
    async fn require(&self, ctx: &Context, commands: &[&'static Command]) -> Result<()>;
}

/// Memoizing dependency runner for one logical run.
///
/// Each command name completes successfully at most once; callers racing on
/// the same name wait for the first. A failed command is not recorded and
/// runs again if required later. Commands must not require themselves.
#[derive(Default)]
pub struct Runner {
    completed: Mutex<HashMap<&'static str, Arc<OnceCell<()>>>>,
}

impl Runner {
    /// Create a runner with nothing completed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run top-level commands.
    ///
    /// # Errors
    ///
    /// Returns the first command failure.
    pub async fn run(&self, ctx: &Context, commands: &[&'static Command]) -> Result<()> {
        self.require(ctx, commands).await
    }

    /// Names of commands that completed successfully, sorted.
    #[must_use]
    pub fn completed(&self) -> Vec<&'static str> {
        let map = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = map
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(name, _)| *name)
            .collect();
        names.sort_unstable();
        names
    }

    fn cell(&self, name: &'static str) -> Arc<OnceCell<()>> {
        let mut map = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(name).or_default())
    }
}

#[async_trait]
impl Deps for Runner {
    async fn require(&self, ctx: &Context, commands: &[&'static Command]) -> Result<()> {
        for command in commands {
            let cell = self.cell(command.name);
            if cell.initialized() {
                debug!(command = command.name, "Already completed");
                continue;
            }
            cell.get_or_try_init(|| async {
                info!(command = command.name, "Running");
                command.run(ctx, self).await
            })
            .await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("completed", &self.completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::paths::DevPaths;
    use crate::tools::ToolRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static LEAF_RUNS: AtomicUsize = AtomicUsize::new(0);
    static FLAKY_RUNS: AtomicUsize = AtomicUsize::new(0);

    fn leaf<'a>(_ctx: &'a Context, _deps: &'a dyn Deps) -> CommandFuture<'a> {
        Box::pin(async {
            LEAF_RUNS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn needs_leaf<'a>(ctx: &'a Context, deps: &'a dyn Deps) -> CommandFuture<'a> {
        Box::pin(async move { deps.require(ctx, &[&LEAF]).await })
    }

    fn flaky<'a>(_ctx: &'a Context, _deps: &'a dyn Deps) -> CommandFuture<'a> {
        Box::pin(async {
            if FLAKY_RUNS.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(crate::Error::configuration("first run fails"))
            } else {
                Ok(())
            }
        })
    }

    static LEAF: Command = Command::new("leaf", "Counts its runs", leaf);
    static LEFT: Command = Command::new("left", "Requires leaf", needs_leaf);
    static RIGHT: Command = Command::new("right", "Requires leaf", needs_leaf);
    static FLAKY: Command = Command::new("flaky", "Fails on first run", flaky);

    fn context() -> Context {
        Context::new(
            DevPaths::new("/unused"),
            ToolRegistry::new(),
            Config::default(),
        )
    }

    #[tokio::test]
    async fn test_shared_dependency_runs_once() {
        let runner = Runner::new();
        runner.run(&context(), &[&LEFT, &RIGHT]).await.unwrap();
        assert_eq!(LEAF_RUNS.load(Ordering::SeqCst), 1);
        assert_eq!(runner.completed(), vec!["leaf", "left", "right"]);
    }

    #[tokio::test]
    async fn test_failed_command_is_retried() {
        let runner = Runner::new();
        let ctx = context();
        assert!(runner.run(&ctx, &[&FLAKY]).await.is_err());
        assert!(runner.completed().is_empty());
        runner.run(&ctx, &[&FLAKY]).await.unwrap();
        assert_eq!(runner.completed(), vec!["flaky"]);
    }

    #[test]
    fn test_command_debug_omits_body() {
        let rendered = format!("{:?}", LEAF);
        assert!(rendered.contains("leaf"));
        assert!(rendered.contains("Counts its runs"));
    }
}
