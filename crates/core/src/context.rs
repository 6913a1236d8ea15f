//! Execution context handed to every tool and command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::paths::DevPaths;
use crate::platform::Platform;
use crate::tools::ToolRegistry;
use crate::{Error, Result};

/// Dev root, tool registry, configuration and cancellation for one run.
///
/// Cloning is cheap; clones share the registry and the cancellation token.
#[derive(Debug, Clone)]
pub struct Context {
    paths: DevPaths,
    registry: Arc<ToolRegistry>,
    config: Arc<Config>,
    cancel: CancellationToken,
}

impl Context {
    /// Create a context with a fresh cancellation token.
    #[must_use]
    pub fn new(paths: DevPaths, registry: ToolRegistry, config: Config) -> Self {
        Self {
            paths,
            registry: Arc::new(registry),
            config: Arc::new(config),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Dev root layout.
    #[must_use]
    pub fn paths(&self) -> &DevPaths {
        &self.paths
    }

    /// Registered tools.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cancellation token external processes are bound to.
    #[must_use]
    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Absolute path of a published file, e.g. `bin/go`, for `platform`.
    #[must_use]
    pub fn bin(&self, path: impl AsRef<Path>, platform: Platform) -> PathBuf {
        self.paths.platform_dir(platform).join(path)
    }

    /// Ensure the named tool is installed for `platform`.
    ///
    /// Compatibility is checked before any download starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] for unknown tools,
    /// [`Error::Incompatible`] when the tool has no source for the platform,
    /// or whatever the tool's installer reports.
    pub async fn ensure_tool(&self, name: &str, platform: Platform) -> Result<()> {
        let tool = self.registry.get(name)?;
        if !tool.is_compatible(&self.registry, platform)? {
            return Err(Error::incompatible(name, platform));
        }
        debug!(tool = name, version = tool.version(), %platform, "Ensuring tool");
        tool.ensure(self, platform).await
    }

    /// Ensure every tool compatible with `platform`; returns the names ensured.
    ///
    /// # Errors
    ///
    /// Stops at the first tool that fails to install.
    pub async fn ensure_all(&self, platform: Platform) -> Result<Vec<String>> {
        let mut ensured = Vec::new();
        for tool in self.registry.iter() {
            if !tool.is_compatible(&self.registry, platform)? {
                debug!(tool = tool.name(), %platform, "Skipping incompatible tool");
                continue;
            }
            tool.ensure(self, platform).await?;
            ensured.push(tool.name().to_string());
        }
        info!(%platform, count = ensured.len(), "Tools installed");
        Ok(ensured)
    }

    /// Audit every registered tool, returning `(tool, problem)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error only if an audit could not run at all.
    pub async fn verify_all(&self) -> Result<Vec<(String, Error)>> {
        let mut problems = Vec::new();
        for tool in self.registry.iter() {
            for problem in tool.verify(self).await? {
                problems.push((tool.name().to_string(), problem));
            }
        }
        Ok(problems)
    }
}
