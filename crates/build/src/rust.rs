//! Rust builds and workspace commands.
//!
//! Host builds use the provisioned toolchain. Container builds run the
//! official `rust` Alpine image at the catalogued toolchain version. Both
//! share the dev root's target directory and copy the release binary out of
//! it afterwards.

use std::path::{Path, PathBuf};
use toolsmith_core::{Context, EnvDescriptor, Error, ExecSpec, Platform, Result};
use tracing::{debug, info};

use crate::catalog;
use crate::container::{self, run_scoped};
use crate::engine::{ContainerEngine, RunSpec};
use crate::modules;
use crate::output;

const CONTAINER_PATH: &str =
    "/usr/local/cargo/bin:/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// A single Rust binary build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RustBuildRequest {
    /// Host platform or the container platform.
    pub platform: Platform,
    /// Crate or workspace directory.
    pub package: PathBuf,
    /// Binary target name.
    pub binary: String,
    /// Where the binary goes.
    pub output: PathBuf,
    /// Tree mounted into the container; defaults to the package directory.
    pub source_root: Option<PathBuf>,
}

impl RustBuildRequest {
    /// Build `binary` from `package` for `platform`.
    #[must_use]
    pub fn new(
        platform: Platform,
        package: impl Into<PathBuf>,
        binary: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            platform,
            package: package.into(),
            binary: binary.into(),
            output: output.into(),
            source_root: None,
        }
    }

    /// Mount `root` instead of the package directory.
    #[must_use]
    pub fn source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }
}

fn target_dir(env: &EnvDescriptor) -> Result<PathBuf> {
    env.get("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| Error::configuration("Rust environment has no CARGO_TARGET_DIR"))
}

/// `cargo build` arguments for `req`.
#[must_use]
pub fn build_args(req: &RustBuildRequest, target_dir: &Path) -> Vec<String> {
    vec![
        "build".to_string(),
        "--release".to_string(),
        "--target-dir".to_string(),
        target_dir.display().to_string(),
        "--bin".to_string(),
        req.binary.clone(),
    ]
}

/// Image used for container builds: `rust:<version>-alpine<alpine>`.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] when the Rust toolchain is not registered.
pub fn builder_image(ctx: &Context) -> Result<String> {
    let rust = ctx.registry().get(catalog::RUST)?;
    Ok(format!(
        "rust:{}-alpine{}",
        rust.version(),
        ctx.config().container.alpine_version
    ))
}

/// Compile `req`, returning the absolute path of the copied binary.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPlatform`] for a foreign host platform,
/// provisioning errors, and [`Error::Compile`] for cargo failures.
pub async fn build(
    ctx: &Context,
    engine: &dyn ContainerEngine,
    req: &RustBuildRequest,
) -> Result<PathBuf> {
    if !req.platform.is_container() && !req.platform.is_local() {
        return Err(Error::UnsupportedPlatform {
            requested: req.platform.to_string(),
            supported: format!("{}, {}", Platform::local(), Platform::DOCKER_AMD64),
        });
    }
    let env = EnvDescriptor::rust(ctx.paths(), req.platform);
    output::create_env_dirs(&env).await?;
    let target = target_dir(&env)?;
    let out = output::prepare(&req.output).await?;

    if req.platform.is_container() {
        build_in_container(ctx, engine, req, &env, &target).await?;
    } else {
        ctx.ensure_tool(catalog::RUST, req.platform).await?;
        info!(package = %req.package.display(), binary = %req.binary, "Building Rust binary");
        ExecSpec::new(ctx.bin("bin/cargo", req.platform))
            .args(build_args(req, &target))
            .dir(&req.package)
            .inherit_env()
            .envs(env.vars())
            .run(ctx.cancel())
            .await
            .map_err(|e| e.in_package(&req.package))?;
    }

    let built = target.join("release").join(&req.binary);
    output::verify(&req.package, &built)?;
    copy_executable(&built, &out).await?;
    Ok(out)
}

async fn build_in_container(
    ctx: &Context,
    engine: &dyn ContainerEngine,
    req: &RustBuildRequest,
    env: &EnvDescriptor,
    target: &Path,
) -> Result<()> {
    engine.ensure_available(ctx).await?;
    let image = builder_image(ctx)?;

    let package = output::canonical(&req.package)?;
    let source_root = match &req.source_root {
        Some(root) => output::canonical(root)?,
        None => package.clone(),
    };

    let config = &ctx.config().container;
    let mut command = vec!["cargo".to_string()];
    command.extend(build_args(req, target));
    let spec = RunSpec::new(image, container::container_name(&config.name_prefix, "rust"))
        .label(config.label())
        .mount_same(&source_root)
        .mount_same(ctx.paths().env_dir())
        .workdir(&package)
        .envs(env.vars())
        .envs([("PATH".to_string(), CONTAINER_PATH.to_string())])
        .command(command);
    #[cfg(unix)]
    let spec = spec.user(container::current_user());

    info!(package = %package.display(), binary = %req.binary, "Building Rust binary in container");
    run_scoped(ctx, engine, &spec)
        .await
        .map_err(|e| e.in_package(&package))
}

async fn copy_executable(from: &Path, to: &Path) -> Result<()> {
    tokio::fs::copy(from, to)
        .await
        .map_err(|e| Error::io(e, to, "copy"))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(to, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| Error::io(e, to, "chmod"))?;
    }
    Ok(())
}

/// Outermost `Cargo.toml` directories below `root`; workspace members are
/// covered by their workspace.
///
/// # Errors
///
/// Returns an I/O error if the tree cannot be walked.
pub fn cargo_workspaces(root: &Path) -> Result<Vec<PathBuf>> {
    let mut outermost: Vec<PathBuf> = Vec::new();
    for dir in modules::find(root, "Cargo.toml")? {
        if !outermost.iter().any(|parent| dir.starts_with(parent)) {
            outermost.push(dir);
        }
    }
    Ok(outermost)
}

async fn cargo_each(ctx: &Context, root: &Path, subcommand: &str) -> Result<()> {
    let workspaces = cargo_workspaces(root)?;
    if workspaces.is_empty() {
        debug!(root = %root.display(), "No Cargo workspaces");
        return Ok(());
    }
    let platform = Platform::local();
    ctx.ensure_tool(catalog::RUST, platform).await?;
    let env = EnvDescriptor::rust(ctx.paths(), platform);
    output::create_env_dirs(&env).await?;
    let target = target_dir(&env)?;
    for workspace in &workspaces {
        ExecSpec::new(ctx.bin("bin/cargo", platform))
            .arg(subcommand)
            .arg("--target-dir")
            .arg(&target)
            .dir(workspace)
            .inherit_env()
            .envs(env.vars())
            .run(ctx.cancel())
            .await
            .map_err(|e| e.in_package(workspace))?;
    }
    Ok(())
}

/// `cargo clippy` in every workspace.
///
/// # Errors
///
/// Returns the first provisioning or clippy failure.
pub async fn lint(ctx: &Context, root: &Path) -> Result<()> {
    cargo_each(ctx, root, "clippy").await
}

/// `cargo test` in every workspace.
///
/// # Errors
///
/// Returns the first provisioning or test failure.
pub async fn test(ctx: &Context, root: &Path) -> Result<()> {
    cargo_each(ctx, root, "test").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use toolsmith_core::{Config, DevPaths, ToolRegistry};

    #[test]
    fn test_build_args() {
        let req = RustBuildRequest::new(Platform::local(), "svc", "server", "out/server");
        assert_eq!(
            build_args(&req, Path::new("/dev-root/rust/target")),
            vec![
                "build",
                "--release",
                "--target-dir",
                "/dev-root/rust/target",
                "--bin",
                "server"
            ]
        );
    }

    #[test]
    fn test_builder_image_follows_catalogue() {
        let ctx = Context::new(
            DevPaths::new("/dev-root"),
            crate::catalog::registry().unwrap(),
            Config::default(),
        );
        let rust = ctx.registry().get(catalog::RUST).unwrap();
        assert_eq!(
            builder_image(&ctx).unwrap(),
            format!("rust:{}-alpine{}", rust.version(), ctx.config().container.alpine_version)
        );
    }

    #[test]
    fn test_cargo_workspaces_skip_members() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["Cargo.toml", "crates/a/Cargo.toml", "tools/b/Cargo.toml"] {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        assert_eq!(cargo_workspaces(dir.path()).unwrap(), vec![dir.path().to_path_buf()]);

        fs::remove_file(dir.path().join("Cargo.toml")).unwrap();
        assert_eq!(
            cargo_workspaces(dir.path()).unwrap(),
            vec![dir.path().join("crates/a"), dir.path().join("tools/b")]
        );
    }

    #[tokio::test]
    async fn test_no_workspaces_needs_no_toolchain() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(DevPaths::new(dir.path()), ToolRegistry::new(), Config::default());
        lint(&ctx, dir.path()).await.unwrap();
        test(&ctx, dir.path()).await.unwrap();
    }
}
