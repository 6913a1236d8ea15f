//! Zig builds.

use std::path::{Path, PathBuf};
use toolsmith_core::{Context, EnvDescriptor, Error, ExecSpec, Platform, Result};
use tracing::info;

use crate::catalog;
use crate::output;

/// A `zig build` invocation installing into `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZigBuildRequest {
    /// Directory holding `build.zig`.
    pub package: PathBuf,
    /// Install prefix for binaries and libraries.
    pub output: PathBuf,
    /// Build step, the default install step when absent.
    pub step: Option<String>,
}

impl ZigBuildRequest {
    /// Default step of `package`, installed into `output`.
    #[must_use]
    pub fn new(package: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            package: package.into(),
            output: output.into(),
            step: None,
        }
    }

    /// Run `step` instead of the default.
    #[must_use]
    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }
}

/// Arguments to `zig`; binaries and libraries land directly in `output`.
#[must_use]
pub fn build_args(req: &ZigBuildRequest, output: &Path, env: &EnvDescriptor) -> Vec<String> {
    let out = output.display().to_string();
    let mut args = vec!["build".to_string()];
    args.extend(req.step.iter().cloned());
    args.extend([
        "--prefix".to_string(),
        out.clone(),
        "--prefix-lib-dir".to_string(),
        out.clone(),
        "--prefix-exe-dir".to_string(),
        out,
    ]);
    if let Some(cache) = env.get("ZIG_LOCAL_CACHE_DIR") {
        args.extend(["--cache-dir".to_string(), cache.to_string()]);
    }
    if let Some(cache) = env.get("ZIG_GLOBAL_CACHE_DIR") {
        args.extend(["--global-cache-dir".to_string(), cache.to_string()]);
    }
    args.extend(["--summary".to_string(), "all".to_string()]);
    args
}

/// Run `zig build` for `req` on the host, returning the absolute prefix.
///
/// # Errors
///
/// Returns provisioning errors or [`Error::Compile`] for build failures.
pub async fn build(ctx: &Context, req: &ZigBuildRequest) -> Result<PathBuf> {
    let platform = Platform::local();
    ctx.ensure_tool(catalog::ZIG, platform).await?;
    let env = EnvDescriptor::zig(ctx.paths(), platform);
    output::create_env_dirs(&env).await?;

    let out = std::path::absolute(&req.output).map_err(|e| Error::io(e, &req.output, "resolve"))?;
    tokio::fs::create_dir_all(&out)
        .await
        .map_err(|e| Error::io(e, &out, "create"))?;

    info!(package = %req.package.display(), step = req.step.as_deref().unwrap_or("install"), "Building Zig package");
    ExecSpec::new(ctx.bin("bin/zig", platform))
        .args(build_args(req, &out, &env))
        .dir(&req.package)
        .inherit_env()
        .envs(env.vars())
        .run(ctx.cancel())
        .await
        .map_err(|e| e.in_package(&req.package))?;
    Ok(out)
}
