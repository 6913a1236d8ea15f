//! Package-shaped tools: binaries built by another registered tool's package
//! manager (`go install`, `cargo install`).
//!
//! The toolchain is ensured first for the same platform, the package manager
//! drops the binary into this tool's download area and the result is
//! published through the link farm like any other artifact.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use toolsmith_core::tools::{self, Tool, ToolKind, ToolRegistry};
use toolsmith_core::{Context, EnvDescriptor, Error, ExecSpec, Platform, Result};
use tracing::{debug, info};

/// Package manager used to build the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageManager {
    /// `go install <package>@<version>` using the registered `go` tool.
    Go {
        /// Import path of the main package.
        package: String,
    },
    /// `cargo install <crate> --version <version>` using the registered `rust` tool.
    Cargo {
        /// Crate name on the registry.
        krate: String,
    },
}

impl PackageManager {
    /// Registered tool providing the package manager.
    #[must_use]
    pub const fn toolchain(&self) -> &'static str {
        match self {
            Self::Go { .. } => "go",
            Self::Cargo { .. } => "rust",
        }
    }
}

/// A tool built from source by a package manager.
#[derive(Debug, Clone)]
pub struct PackageTool {
    name: String,
    version: String,
    manager: PackageManager,
    binary: String,
}

impl PackageTool {
    /// Tool installed with `go install`; the binary is named after the last
    /// element of the package path.
    #[must_use]
    pub fn go(name: impl Into<String>, version: impl Into<String>, package: impl Into<String>) -> Self {
        let package = package.into();
        let binary = package
            .rsplit('/')
            .next()
            .unwrap_or(package.as_str())
            .to_string();
        Self {
            name: name.into(),
            version: version.into(),
            manager: PackageManager::Go { package },
            binary,
        }
    }

    /// Tool installed with `cargo install`; the binary is named after the crate.
    #[must_use]
    pub fn cargo(name: impl Into<String>, version: impl Into<String>, krate: impl Into<String>) -> Self {
        let krate = krate.into();
        Self {
            name: name.into(),
            version: version.into(),
            binary: krate.clone(),
            manager: PackageManager::Cargo { krate },
        }
    }

    /// Override the produced binary name.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Package manager in use.
    #[must_use]
    pub const fn manager(&self) -> &PackageManager {
        &self.manager
    }

    fn published_path(&self) -> String {
        format!("bin/{}", self.binary)
    }

    /// Build the install invocation and the path the binary lands at.
    fn install_spec(&self, ctx: &Context, platform: Platform) -> (ExecSpec, EnvDescriptor, PathBuf) {
        let paths = ctx.paths();
        let download = tools::download_dir(ctx, self, platform);
        match &self.manager {
            PackageManager::Go { package } => {
                let env = EnvDescriptor::go(paths, platform).with_var("GOBIN", &download);
                let spec = ExecSpec::new(ctx.bin("bin/go", platform))
                    .arg("install")
                    .arg(format!("{package}@{}", self.version));
                (spec, env, download.join(&self.binary))
            }
            PackageManager::Cargo { krate } => {
                let env = EnvDescriptor::rust(paths, platform);
                let spec = ExecSpec::new(ctx.bin("bin/cargo", platform))
                    .args(["install", krate.as_str(), "--locked", "--version"])
                    .arg(&self.version)
                    .arg("--root")
                    .arg(&download);
                (spec, env, download.join("bin").join(&self.binary))
            }
        }
    }

    async fn install(&self, ctx: &Context, platform: Platform) -> Result<PathBuf> {
        let (spec, env, artifact) = self.install_spec(ctx, platform);
        for dir in env.directories() {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| Error::io(e, &dir, "create_dir_all"))?;
        }

        info!(tool = %self.name, version = %self.version, %platform, "Installing package");
        spec.inherit_env()
            .envs(env.vars())
            .run(ctx.cancel())
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    e
                } else {
                    Error::install(&self.name, e.to_string())
                }
            })?;

        make_executable(&artifact)?;
        Ok(artifact)
    }
}

fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| Error::io(e, path, "chmod"))
}

#[async_trait]
impl Tool for PackageTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Package
    }

    fn published(&self, _platform: Platform) -> Vec<String> {
        vec![self.published_path()]
    }

    fn is_compatible(&self, registry: &ToolRegistry, platform: Platform) -> Result<bool> {
        registry
            .get(self.manager.toolchain())?
            .is_compatible(registry, platform)
    }

    async fn ensure(&self, ctx: &Context, platform: Platform) -> Result<()> {
        let dst = self.published_path();
        if tools::should_reinstall(ctx, self, platform, &dst) {
            ctx.ensure_tool(self.manager.toolchain(), platform).await?;
            let artifact = self.install(ctx, platform).await?;
            tools::publish_artifact(ctx, self, platform, &dst, &artifact)?;
        } else {
            debug!(tool = %self.name, %platform, "Already installed");
        }
        tools::link_platform_files(ctx, self, platform, &[dst])
    }
}
