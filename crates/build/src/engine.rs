//! Container engine seam.
//!
//! Container builds talk to the engine only through [`ContainerEngine`], so
//! the image cache and the run-argument assembly can be exercised without a
//! daemon. [`DockerCli`] drives the `docker` command line.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use toolsmith_core::config::ContainerConfig;
use toolsmith_core::{Context, Error, ExecSpec, Result};
use tracing::debug;

/// One disposable container invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSpec {
    /// Image reference.
    pub image: String,
    /// Unique container name.
    pub name: String,
    /// `key=value` label for later identification.
    pub label: String,
    /// Bind mounts as `(host, container)` pairs.
    pub mounts: Vec<(PathBuf, PathBuf)>,
    /// Working directory inside the container.
    pub workdir: Option<PathBuf>,
    /// `uid:gid` to run as.
    pub user: Option<String>,
    /// Environment variables.
    pub env: Vec<(String, String)>,
    /// Command and arguments.
    pub command: Vec<String>,
}

impl RunSpec {
    /// Start a spec for `image` under container `name`.
    #[must_use]
    pub fn new(image: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Mount `path` at the same location inside the container.
    #[must_use]
    pub fn mount_same(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !self.mounts.iter().any(|(host, _)| *host == path) {
            self.mounts.push((path.clone(), path));
        }
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Run as `uid:gid`.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Add environment variables.
    #[must_use]
    pub fn envs(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(vars);
        self
    }

    /// Set the command.
    #[must_use]
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Value of an environment variable, if set.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Arguments for `docker run`.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];
        if !self.label.is_empty() {
            args.extend(["--label".to_string(), self.label.clone()]);
        }
        args.extend(["--name".to_string(), self.name.clone()]);
        for (host, container) in &self.mounts {
            args.extend([
                "-v".to_string(),
                format!("{}:{}", host.display(), container.display()),
            ]);
        }
        if let Some(dir) = &self.workdir {
            args.extend(["--workdir".to_string(), dir.display().to_string()]);
        }
        if let Some(user) = &self.user {
            args.extend(["--user".to_string(), user.clone()]);
        }
        for (key, value) in &self.env {
            args.extend(["--env".to_string(), format!("{key}={value}")]);
        }
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// Operations container builds need from an engine.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Fail unless the engine is installed and its daemon answers.
    async fn ensure_available(&self, ctx: &Context) -> Result<()>;

    /// Whether an image with `tag` exists locally.
    async fn image_exists(&self, ctx: &Context, tag: &str) -> Result<bool>;

    /// Build `recipe` into an image tagged `tag` and labelled `label`.
    async fn build_image(&self, ctx: &Context, tag: &str, recipe: &str, label: &str) -> Result<()>;

    /// Run a container to completion.
    async fn run(&self, ctx: &Context, spec: &RunSpec) -> Result<()>;

    /// Force-remove container `name`.
    ///
    /// Runs even after cancellation so interrupted builds do not leak
    /// containers.
    async fn remove(&self, name: &str) -> Result<()>;
}

/// Engine driven through the `docker` command line.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    /// Engine binary from configuration.
    #[must_use]
    pub fn from_config(config: &ContainerConfig) -> Self {
        Self {
            program: config.engine.clone(),
        }
    }

    fn exec(&self) -> ExecSpec {
        ExecSpec::new(&self.program).inherit_env()
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn ensure_available(&self, ctx: &Context) -> Result<()> {
        let output = self
            .exec()
            .args(["version", "--format", "{{.Server.Version}}"])
            .capture()
            .run(ctx.cancel())
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    e
                } else {
                    Error::configuration(format!(
                        "container engine `{}` is not available: {e}",
                        self.program
                    ))
                }
            })?;
        debug!(engine = %self.program, version = %output.stdout_text(), "Container engine available");
        Ok(())
    }

    async fn image_exists(&self, ctx: &Context, tag: &str) -> Result<bool> {
        let output = self
            .exec()
            .args(["images", "-q", tag])
            .capture()
            .run(ctx.cancel())
            .await?;
        Ok(!output.stdout_text().is_empty())
    }

    async fn build_image(&self, ctx: &Context, tag: &str, recipe: &str, label: &str) -> Result<()> {
        self.exec()
            .args(["build", "--label", label, "--tag", tag, "-"])
            .stdin(recipe.as_bytes().to_vec())
            .run(ctx.cancel())
            .await?;
        Ok(())
    }

    async fn run(&self, ctx: &Context, spec: &RunSpec) -> Result<()> {
        self.exec().args(spec.to_args()).run(ctx.cancel()).await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.exec()
            .args(["rm", "-f", name])
            .capture()
            .run(&CancellationToken::new())
            .await?;
        Ok(())
    }
}
