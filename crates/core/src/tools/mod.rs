//! Tool model.
//!
//! A [`Tool`] is a named, versioned external program. Three shapes exist
//! (archive downloads, packages installed through another tool's package
//! manager, and multi-binary toolchains driven by a bootstrap installer) and
//! they all publish through the same link farm:
//!
//! ```text
//! tools/<name>/<version>/<platform>/links/<path>            stable link
//! tools/<name>/<version>/<platform>/links/<path>:<sha256>   checksum link
//! platforms/<platform>/<path>                               merged view
//! ```
//!
//! The helpers in this module implement the steps every variant shares: the
//! reinstall decision, publishing a freshly produced artifact, and linking
//! published files into the per-platform directory.

mod registry;

pub use registry::ToolRegistry;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::checksum::{self, ContentHash};
use crate::context::Context;
use crate::link;
use crate::platform::Platform;
use crate::{Error, Result};

/// Installation strategy of a tool, for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Downloaded and unpacked from a per-platform source.
    Archive,
    /// Installed through another tool's package manager.
    Package,
    /// Toolchain materialized by a bootstrap installer.
    Toolchain,
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::Package => write!(f, "package"),
            Self::Toolchain => write!(f, "toolchain"),
        }
    }
}

/// Per-platform download descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Download location (`https://` or `file://`).
    pub url: String,
    /// Declared hash of the downloaded bytes.
    pub hash: ContentHash,
    /// Published path (relative to the links directory) to path inside the
    /// extracted archive.
    pub links: BTreeMap<String, String>,
}

impl Source {
    /// Create a source from a URL and an algorithm-tagged hash.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `hash` is not a valid content hash.
    pub fn new(url: impl Into<String>, hash: &str) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            hash: hash.parse()?,
            links: BTreeMap::new(),
        })
    }

    /// Publish `archive_path` as `published`.
    #[must_use]
    pub fn link(mut self, published: impl Into<String>, archive_path: impl Into<String>) -> Self {
        self.links.insert(published.into(), archive_path.into());
        self
    }
}

/// Sources of a tool keyed by platform. A missing entry means incompatible.
pub type Sources = BTreeMap<Platform, Source>;

/// Capability set shared by every tool shape.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name.
    fn name(&self) -> &str;

    /// Version; part of the installation identity.
    fn version(&self) -> &str;

    /// Installation strategy.
    fn kind(&self) -> ToolKind;

    /// Paths, relative to the links directory, that `ensure` publishes.
    fn published(&self, platform: Platform) -> Vec<String>;

    /// Whether the tool can be installed for `platform`.
    ///
    /// Tools that delegate to another tool propagate lookup failures.
    fn is_compatible(&self, registry: &ToolRegistry, platform: Platform) -> Result<bool>;

    /// Integrity problems found by re-checking sources and installs.
    ///
    /// Problems are returned, not raised; an `Err` means the audit itself
    /// could not run. The default checks installed links for drift.
    async fn verify(&self, ctx: &Context) -> Result<Vec<Error>> {
        Ok(drift_problems(ctx, self, &Platform::ALL))
    }

    /// Install the tool for `platform` if it is not already installed.
    ///
    /// Idempotent: when every published link resolves to an artifact matching
    /// its recorded checksum nothing is downloaded or rewritten.
    async fn ensure(&self, ctx: &Context, platform: Platform) -> Result<()>;
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Download area of `tool` for `platform`.
#[must_use]
pub fn download_dir<T: Tool + ?Sized>(ctx: &Context, tool: &T, platform: Platform) -> PathBuf {
    ctx.paths()
        .download_dir(tool.name(), tool.version(), platform)
}

/// Link farm of `tool` for `platform`.
#[must_use]
pub fn links_dir<T: Tool + ?Sized>(ctx: &Context, tool: &T, platform: Platform) -> PathBuf {
    ctx.paths().links_dir(tool.name(), tool.version(), platform)
}

/// Whether the published path `dst` needs (re)installation.
#[must_use]
pub fn should_reinstall<T: Tool + ?Sized>(
    ctx: &Context,
    tool: &T,
    platform: Platform,
    dst: &str,
) -> bool {
    let stable = links_dir(ctx, tool, platform).join(dst);
    let reinstall = !link::is_installed(&stable);
    if reinstall {
        debug!(tool = tool.name(), %platform, path = dst, "Reinstall required");
    }
    reinstall
}

/// Checksum `artifact` and publish it as `dst` in the tool's link farm.
///
/// # Errors
///
/// Returns an error if the artifact cannot be read or a link cannot be swapped.
pub fn publish_artifact<T: Tool + ?Sized>(
    ctx: &Context,
    tool: &T,
    platform: Platform,
    dst: &str,
    artifact: &Path,
) -> Result<()> {
    if !artifact.is_file() {
        return Err(Error::install(
            tool.name(),
            format!("expected artifact {} is missing", artifact.display()),
        ));
    }
    let sum = checksum::file_sha256(artifact)?;
    let stable = links_dir(ctx, tool, platform).join(dst);
    link::publish(artifact, &stable, &sum)
}

/// Link published files into `platforms/<platform>/`.
///
/// Files already linked correctly are left untouched.
///
/// # Errors
///
/// Returns an error if a link cannot be created.
pub fn link_platform_files<T: Tool + ?Sized>(
    ctx: &Context,
    tool: &T,
    platform: Platform,
    files: &[String],
) -> Result<()> {
    let links = links_dir(ctx, tool, platform);
    let platform_dir = ctx.paths().platform_dir(platform);
    for file in files {
        link::link_into(&links.join(file), &platform_dir.join(file))?;
    }
    Ok(())
}

/// Drift problems of installed links across `platforms`.
///
/// Links that were never installed are not problems; links that exist but no
/// longer resolve to an artifact matching their checksum are.
#[must_use]
pub fn drift_problems<T: Tool + ?Sized>(
    ctx: &Context,
    tool: &T,
    platforms: &[Platform],
) -> Vec<Error> {
    let mut problems = Vec::new();
    for &platform in platforms {
        let links = links_dir(ctx, tool, platform);
        for dst in tool.published(platform) {
            let stable = links.join(&dst);
            if stable.symlink_metadata().is_ok() && !link::is_installed(&stable) {
                problems.push(Error::install(
                    tool.name(),
                    format!(
                        "{} for {platform} no longer matches its recorded checksum",
                        stable.display()
                    ),
                ));
            }
        }
    }
    problems
}
