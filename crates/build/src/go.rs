//! Go builds and module commands.
//!
//! [`build`] compiles one package either with the provisioned toolchain on
//! the host or inside the Go builder image. Both modes pass the compiler the
//! same arguments, so a container build differs from a local one only in
//! where it runs.
//!
//! `generate`, `lint`, `test` and `tidy` walk the tree for `go.mod` files and
//! run the matching `go` (or `golangci-lint`) invocation in each module.

use std::path::{Path, PathBuf};
use toolsmith_core::{Context, EnvDescriptor, Error, ExecSpec, Platform, Result};
use tracing::{debug, info};

use crate::catalog;
use crate::container::{self, run_scoped};
use crate::engine::{ContainerEngine, RunSpec};
use crate::image;
use crate::modules;
use crate::output;

/// golangci-lint configuration used by [`lint`].
pub const GOLANGCI_CONFIG: &str = include_str!("../recipes/golangci.yaml");

/// Go binary inside the builder image.
const CONTAINER_GO: &str = "/usr/local/go/bin/go";

/// A single Go build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Target platform; either the host or the container platform.
    pub platform: Platform,
    /// Package directory.
    pub package: PathBuf,
    /// Where the binary goes.
    pub output: PathBuf,
    /// Enable cgo.
    pub cgo: bool,
    /// Link statically. Only applied to container builds, where musl makes
    /// it possible.
    pub static_build: bool,
    /// Build tags.
    pub tags: Vec<String>,
    /// Tree mounted into the container; defaults to the package directory.
    /// Set it to the module root when the package imports siblings.
    pub source_root: Option<PathBuf>,
}

impl BuildRequest {
    /// Pure-Go, dynamically linked build of `package` for `platform`.
    #[must_use]
    pub fn new(platform: Platform, package: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            package: package.into(),
            output: output.into(),
            cgo: false,
            static_build: false,
            tags: Vec::new(),
            source_root: None,
        }
    }

    /// Enable or disable cgo.
    #[must_use]
    pub const fn cgo(mut self, enabled: bool) -> Self {
        self.cgo = enabled;
        self
    }

    /// Request a static binary.
    #[must_use]
    pub const fn static_build(mut self, enabled: bool) -> Self {
        self.static_build = enabled;
        self
    }

    /// Add a build tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Mount `root` instead of the package directory.
    #[must_use]
    pub fn source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }
}

/// Arguments to `go` for `req`, writing to the absolute path `output`.
#[must_use]
pub fn build_args(req: &BuildRequest, output: &Path) -> Vec<String> {
    let mut ldflags = String::from("-ldflags=-w -s");
    if req.static_build && req.platform.is_container() {
        ldflags.push_str(" -extldflags=-static");
    }
    let mut args = vec![
        "build".to_string(),
        "-trimpath".to_string(),
        "-buildvcs=false".to_string(),
        ldflags,
    ];
    if !req.tags.is_empty() {
        args.push(format!("-tags={}", req.tags.join(",")));
    }
    args.extend([
        "-o".to_string(),
        output.display().to_string(),
        ".".to_string(),
    ]);
    args
}

/// Environment for compiling `req`.
#[must_use]
pub fn build_env(ctx: &Context, req: &BuildRequest) -> EnvDescriptor {
    EnvDescriptor::go(ctx.paths(), req.platform)
        .with_var("CGO_ENABLED", if req.cgo { "1" } else { "0" })
        .with_var("GOOS", req.platform.target_os().to_string())
        .with_var("GOARCH", req.platform.arch.to_string())
}

/// Compile `req`, returning the absolute path of the binary.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPlatform`] for a foreign host platform,
/// provisioning errors for the toolchain, and [`Error::Compile`] for
/// compiler failures.
pub async fn build(
    ctx: &Context,
    engine: &dyn ContainerEngine,
    req: &BuildRequest,
) -> Result<PathBuf> {
    if req.platform.is_container() {
        build_in_container(ctx, engine, req).await
    } else if req.platform.is_local() {
        build_local(ctx, req).await
    } else {
        Err(Error::UnsupportedPlatform {
            requested: req.platform.to_string(),
            supported: format!("{}, {}", Platform::local(), Platform::DOCKER_AMD64),
        })
    }
}

async fn build_local(ctx: &Context, req: &BuildRequest) -> Result<PathBuf> {
    ctx.ensure_tool(catalog::GO, req.platform).await?;
    let env = build_env(ctx, req);
    output::create_env_dirs(&env).await?;
    let out = output::prepare(&req.output).await?;

    info!(package = %req.package.display(), platform = %req.platform, "Building Go package");
    ExecSpec::new(ctx.bin("bin/go", req.platform))
        .args(build_args(req, &out))
        .dir(&req.package)
        .inherit_env()
        .envs(env.vars())
        .run(ctx.cancel())
        .await
        .map_err(|e| e.in_package(&req.package))?;

    output::verify(&req.package, &out)?;
    Ok(out)
}

async fn build_in_container(
    ctx: &Context,
    engine: &dyn ContainerEngine,
    req: &BuildRequest,
) -> Result<PathBuf> {
    engine.ensure_available(ctx).await?;
    let image = image::go_builder_image(ctx, engine, req.platform).await?;

    let package = output::canonical(&req.package)?;
    let source_root = match &req.source_root {
        Some(root) => output::canonical(root)?,
        None => package.clone(),
    };
    if !package.starts_with(&source_root) {
        return Err(Error::configuration(format!(
            "package {} is outside the source root {}",
            package.display(),
            source_root.display()
        )));
    }

    let env = build_env(ctx, req);
    output::create_env_dirs(&env).await?;
    let out = output::prepare(&req.output).await?;
    let out_dir = out.parent().map_or_else(|| out.clone(), Path::to_path_buf);

    let config = &ctx.config().container;
    let spec = RunSpec::new(image, container::container_name(&config.name_prefix, "go"))
        .label(config.label())
        .mount_same(&source_root)
        .mount_same(ctx.paths().env_dir())
        .mount_same(out_dir)
        .workdir(&package)
        .envs(env.vars())
        .command(std::iter::once(CONTAINER_GO.to_string()).chain(build_args(req, &out)));
    #[cfg(unix)]
    let spec = spec.user(container::current_user());

    info!(package = %package.display(), platform = %req.platform, "Building Go package in container");
    run_scoped(ctx, engine, &spec)
        .await
        .map_err(|e| e.in_package(&package))?;

    output::verify(&package, &out)?;
    Ok(out)
}

/// Run `go <args>` in `module` with the host Go environment.
async fn go(ctx: &Context, module: &Path, args: &[&str]) -> Result<()> {
    let platform = Platform::local();
    let env = EnvDescriptor::go(ctx.paths(), platform);
    output::create_env_dirs(&env).await?;
    ExecSpec::new(ctx.bin("bin/go", platform))
        .args(args)
        .dir(module)
        .inherit_env()
        .envs(env.vars())
        .run(ctx.cancel())
        .await
        .map_err(|e| e.in_package(module))?;
    Ok(())
}

/// `go.mod` directories below `root`.
///
/// # Errors
///
/// Returns an I/O error if the tree cannot be walked.
pub fn go_modules(root: &Path) -> Result<Vec<PathBuf>> {
    modules::find(root, "go.mod")
}

async fn ensure_host_tools(ctx: &Context, names: &[&str]) -> Result<()> {
    let platform = Platform::local();
    for name in names {
        ctx.ensure_tool(name, platform).await?;
    }
    Ok(())
}

/// `go generate ./...` in every module.
///
/// The protobuf compiler and its Go plugins are provisioned first so
/// `//go:generate protoc ...` directives find them on `PATH`.
///
/// # Errors
///
/// Returns the first provisioning or generator failure.
pub async fn generate(ctx: &Context, root: &Path) -> Result<()> {
    let modules = go_modules(root)?;
    if modules.is_empty() {
        debug!(root = %root.display(), "No Go modules");
        return Ok(());
    }
    ensure_host_tools(
        ctx,
        &[
            catalog::GO,
            catalog::PROTOC,
            catalog::PROTOC_GEN_GO,
            catalog::PROTOC_GEN_GO_GRPC,
        ],
    )
    .await?;
    for module in &modules {
        go(ctx, module, &["generate", "./..."]).await?;
    }
    Ok(())
}

/// Write the golangci-lint configuration into the dev root, returning its
/// path. Unchanged content is left alone.
async fn store_lint_config(ctx: &Context) -> Result<PathBuf> {
    let dir = ctx.paths().language_dir("go", Platform::local());
    let path = dir.join("golangci.yaml");
    if tokio::fs::read_to_string(&path)
        .await
        .is_ok_and(|existing| existing == GOLANGCI_CONFIG)
    {
        return Ok(path);
    }
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::io(e, &dir, "create"))?;
    tokio::fs::write(&path, GOLANGCI_CONFIG)
        .await
        .map_err(|e| Error::io(e, &path, "write"))?;
    Ok(path)
}

/// golangci-lint over every module containing Go code.
///
/// # Errors
///
/// Returns the first provisioning or lint failure.
pub async fn lint(ctx: &Context, root: &Path) -> Result<()> {
    let modules = go_modules(root)?;
    if modules.is_empty() {
        debug!(root = %root.display(), "No Go modules");
        return Ok(());
    }
    ensure_host_tools(ctx, &[catalog::GO, catalog::GOLANGCI]).await?;
    let config = store_lint_config(ctx).await?;

    let platform = Platform::local();
    let env = EnvDescriptor::go(ctx.paths(), platform);
    output::create_env_dirs(&env).await?;
    for module in &modules {
        if !modules::contains_go_code(module)? {
            debug!(module = %module.display(), "Skipping module without Go code");
            continue;
        }
        ExecSpec::new(ctx.bin("bin/golangci-lint", platform))
            .arg("run")
            .arg("--config")
            .arg(&config)
            .dir(module)
            .inherit_env()
            .envs(env.vars())
            .run(ctx.cancel())
            .await
            .map_err(|e| e.in_package(module))?;
    }
    Ok(())
}

/// Coverage profile file name for `module`: its path relative to `root`
/// with separators replaced by dashes, `root` for the top-level module.
#[must_use]
pub fn coverage_profile_name(root: &Path, module: &Path) -> String {
    let rel = module.strip_prefix(root).unwrap_or(module);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        "root".to_string()
    } else {
        parts.join("-")
    }
}

/// Race-enabled, shuffled tests with coverage for every module.
///
/// Profiles are written to `<root>/coverage/`, one per module.
///
/// # Errors
///
/// Returns the first provisioning or test failure.
pub async fn test(ctx: &Context, root: &Path) -> Result<()> {
    let modules = go_modules(root)?;
    if modules.is_empty() {
        debug!(root = %root.display(), "No Go modules");
        return Ok(());
    }
    ensure_host_tools(ctx, &[catalog::GO]).await?;

    let coverage = root.join("coverage");
    tokio::fs::create_dir_all(&coverage)
        .await
        .map_err(|e| Error::io(e, &coverage, "create"))?;
    for module in &modules {
        let profile = coverage.join(coverage_profile_name(root, module));
        let profile = profile.to_string_lossy();
        go(
            ctx,
            module,
            &[
                "test",
                "-tags=testing",
                "-count=1",
                "-shuffle=on",
                "-race",
                "-cover",
                "-coverpkg",
                "./...",
                "-coverprofile",
                &profile,
                "./...",
            ],
        )
        .await?;
    }
    Ok(())
}

/// `go mod tidy` in every module.
///
/// # Errors
///
/// Returns the first provisioning or `go` failure.
pub async fn tidy(ctx: &Context, root: &Path) -> Result<()> {
    let modules = go_modules(root)?;
    if modules.is_empty() {
        debug!(root = %root.display(), "No Go modules");
        return Ok(());
    }
    ensure_host_tools(ctx, &[catalog::GO]).await?;
    for module in &modules {
        go(ctx, module, &["mod", "tidy"]).await?;
    }
    Ok(())
}
