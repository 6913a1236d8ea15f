//! Rust toolchain tool shape.
//!
//! The toolchain is materialized by running the `rustup-init` bootstrap tool
//! with `RUSTUP_HOME` and `CARGO_HOME` pointed into the tool's download area,
//! then selecting the pinned version as default. The toolchain's binaries
//! are published individually through the link farm:
//!
//! ```text
//! tools/rust/<version>/<platform>/download/rustup/toolchains/<version>-<triple>/bin/rustc
//! tools/rust/<version>/<platform>/links/bin/rustc -> rustc:<sha256>
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use toolsmith_core::platform::{Arch, Os};
use toolsmith_core::tools::{self, Tool, ToolKind, ToolRegistry};
use toolsmith_core::{Context, Error, ExecSpec, Platform, Result};
use tracing::{debug, info};

/// Name the toolchain is registered under.
pub const RUST: &str = "rust";

/// Default bootstrap tool.
pub const RUSTUP_INIT: &str = "rustup-init";

/// A Rust toolchain installed through rustup.
#[derive(Debug, Clone)]
pub struct RustToolchain {
    version: String,
    bootstrap: String,
    binaries: Vec<String>,
}

impl RustToolchain {
    /// Toolchain `version` publishing rustc, cargo and cargo-clippy.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            bootstrap: RUSTUP_INIT.to_string(),
            binaries: ["bin/rustc", "bin/cargo", "bin/cargo-clippy"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// Use a differently named bootstrap tool.
    #[must_use]
    pub fn with_bootstrap(mut self, name: impl Into<String>) -> Self {
        self.bootstrap = name.into();
        self
    }

    /// Replace the published binaries.
    #[must_use]
    pub fn with_binaries<I, S>(mut self, binaries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binaries = binaries.into_iter().map(Into::into).collect();
        self
    }

    /// Get the host triple rustup installs toolchains for on `platform`.
    fn host_triple(platform: Platform) -> Option<&'static str> {
        match (platform.os, platform.arch) {
            (Os::Linux, Arch::Amd64) => Some("x86_64-unknown-linux-gnu"),
            (Os::Linux, Arch::Arm64) => Some("aarch64-unknown-linux-gnu"),
            (Os::Darwin, Arch::Amd64) => Some("x86_64-apple-darwin"),
            (Os::Darwin, Arch::Arm64) => Some("aarch64-apple-darwin"),
            (Os::Docker, _) => None,
        }
    }

    fn rustup_home(download: &Path) -> PathBuf {
        download.join("rustup")
    }

    fn cargo_home(download: &Path) -> PathBuf {
        download.join("cargo")
    }

    /// Directory of the installed toolchain for this version, if any.
    ///
    /// The exact `<version>-<triple>` directory wins; otherwise the first
    /// directory whose name starts with the version is used.
    fn find_toolchain(&self, download: &Path, platform: Platform) -> Result<Option<PathBuf>> {
        let toolchains = Self::rustup_home(download).join("toolchains");
        if let Some(triple) = Self::host_triple(platform) {
            let exact = toolchains.join(format!("{}-{triple}", self.version));
            if exact.is_dir() {
                return Ok(Some(exact));
            }
        }

        let entries = match std::fs::read_dir(&toolchains) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(e, &toolchains, "read_dir")),
        };
        let mut names: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(&self.version))
            .collect();
        names.sort();
        Ok(names.first().map(|name| toolchains.join(name)))
    }

    async fn install(&self, ctx: &Context, platform: Platform) -> Result<()> {
        ctx.ensure_tool(&self.bootstrap, platform).await?;

        info!(version = %self.version, %platform, "Installing Rust toolchain");
        let download = tools::download_dir(ctx, self, platform);
        let rustup_home = Self::rustup_home(&download);
        let cargo_home = Self::cargo_home(&download);
        let installer = ctx.bin(format!("bin/{}", self.bootstrap), platform);

        let homes = [
            ("RUSTUP_HOME".to_string(), rustup_home.display().to_string()),
            ("CARGO_HOME".to_string(), cargo_home.display().to_string()),
        ];

        ExecSpec::new(installer)
            .args(["-y", "--no-update-default-toolchain", "--no-modify-path"])
            .inherit_env()
            .envs(homes.clone())
            .run(ctx.cancel())
            .await
            .map_err(|e| self.install_error(e))?;

        ExecSpec::new(cargo_home.join("bin").join("rustup"))
            .args(["default", self.version.as_str()])
            .inherit_env()
            .envs(homes)
            .run(ctx.cancel())
            .await
            .map_err(|e| self.install_error(e))?;

        let toolchain = self.find_toolchain(&download, platform)?.ok_or_else(|| {
            Error::install(
                RUST,
                format!("rustup did not install a toolchain for {}", self.version),
            )
        })?;

        for binary in &self.binaries {
            tools::publish_artifact(ctx, self, platform, binary, &toolchain.join(binary))?;
        }
        info!(version = %self.version, %platform, "Rust toolchain installed");
        Ok(())
    }

    fn install_error(&self, err: Error) -> Error {
        if err.is_cancelled() {
            err
        } else {
            Error::install(RUST, format!("{} ({})", err, self.version))
        }
    }
}

#[async_trait]
impl Tool for RustToolchain {
    fn name(&self) -> &str {
        RUST
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Toolchain
    }

    fn published(&self, _platform: Platform) -> Vec<String> {
        self.binaries.clone()
    }

    fn is_compatible(&self, registry: &ToolRegistry, platform: Platform) -> Result<bool> {
        registry
            .get(&self.bootstrap)?
            .is_compatible(registry, platform)
    }

    async fn ensure(&self, ctx: &Context, platform: Platform) -> Result<()> {
        let download = tools::download_dir(ctx, self, platform);
        let install = match self.find_toolchain(&download, platform)? {
            None => true,
            Some(_) => self
                .binaries
                .iter()
                .any(|binary| tools::should_reinstall(ctx, self, platform, binary)),
        };

        if install {
            self.install(ctx, platform).await?;
        } else {
            debug!(version = %self.version, %platform, "Toolchain already installed");
        }

        tools::link_platform_files(ctx, self, platform, &self.binaries)
    }
}
