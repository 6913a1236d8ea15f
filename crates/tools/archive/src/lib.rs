//! Archive-shaped tools: download a per-platform source, verify its hash,
//! unpack it and publish the declared paths through the link farm.
//!
//! Every install unpacks into its own directory, named after the source
//! hash plus a unique suffix, and is never modified afterwards. Readers move
//! to a new install only through the checksum link swap, so concurrent
//! installers and drift repairs never touch content another installer has
//! published. Superseded directories are left on disk.

pub mod extract;
pub mod fetch;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use toolsmith_core::tools::{self, Source, Sources, Tool, ToolKind, ToolRegistry};
use toolsmith_core::{Context, Error, Platform, Result};
use tracing::{debug, info, warn};

pub use extract::ArchiveFormat;
pub use fetch::Fetcher;

/// Characters of the source digest used to name the content directory.
const CONTENT_DIR_DIGITS: usize = 16;

/// A tool installed by downloading and unpacking an archive.
#[derive(Debug, Clone)]
pub struct ArchiveTool {
    name: String,
    version: String,
    sources: Sources,
}

impl ArchiveTool {
    /// Create a tool with no sources; add them with [`Self::with_source`].
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            sources: Sources::new(),
        }
    }

    /// Declare the source for `platform`.
    #[must_use]
    pub fn with_source(mut self, platform: Platform, source: Source) -> Self {
        self.sources.insert(platform, source);
        self
    }

    /// Declared sources.
    #[must_use]
    pub const fn sources(&self) -> &Sources {
        &self.sources
    }

    /// A fresh directory for one install of `source`.
    fn content_dir(&self, ctx: &Context, platform: Platform, source: &Source) -> PathBuf {
        let digest = source.hash.digest();
        let short = &digest[..CONTENT_DIR_DIGITS.min(digest.len())];
        tools::download_dir(ctx, self, platform)
            .join(format!("{short}-{}", uuid::Uuid::new_v4().simple()))
    }

    async fn download(&self, ctx: &Context, source: &Source) -> Result<Vec<u8>> {
        let fetcher = Fetcher::new()?;
        tokio::select! {
            result = fetcher.fetch(&self.name, &source.url) => result,
            () = ctx.cancel().cancelled() => Err(Error::Cancelled {
                command: format!("download {}", source.url),
            }),
        }
    }

    async fn install(&self, ctx: &Context, platform: Platform, source: &Source) -> Result<()> {
        info!(tool = %self.name, version = %self.version, %platform, url = %source.url, "Downloading");
        let data = self.download(ctx, source).await?;

        if let Err(actual) = source.hash.verify(&data) {
            return Err(Error::ChecksumMismatch {
                tool: self.name.clone(),
                url: source.url.clone(),
                expected: source.hash.to_string(),
                actual: actual.to_string(),
            });
        }

        let content = self.content_dir(ctx, platform, source);
        let staging = content.with_file_name(format!(
            ".{}.tmp",
            content
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));

        let format = ArchiveFormat::detect(&source.url);
        let raw_name = extract::raw_file_name(&source.url).to_string();
        let target = staging.clone();
        tokio::task::spawn_blocking(move || extract::extract(format, &data, &target, &raw_name))
            .await
            .map_err(|e| Error::extract(&self.name, e.to_string()))?
            .map_err(|e| {
                discard(&staging);
                Error::extract(&self.name, e.to_string())
            })?;

        for (dst, src) in &source.links {
            if !staging.join(src).is_file() {
                discard(&staging);
                return Err(Error::extract(
                    &self.name,
                    format!("archive does not contain {src} (declared for {dst})"),
                ));
            }
        }

        if let Err(e) = std::fs::rename(&staging, &content) {
            discard(&staging);
            return Err(Error::io(e, &content, "rename"));
        }
        debug!(tool = %self.name, path = %content.display(), "Unpacked");

        for (dst, src) in &source.links {
            tools::publish_artifact(ctx, self, platform, dst, &content.join(src))?;
        }
        Ok(())
    }
}

fn discard(staging: &Path) {
    if let Err(e) = std::fs::remove_dir_all(staging)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %staging.display(), error = %e, "Failed to remove staging directory");
    }
}

#[async_trait]
impl Tool for ArchiveTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Archive
    }

    fn published(&self, platform: Platform) -> Vec<String> {
        self.sources
            .get(&platform)
            .map(|source| source.links.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn is_compatible(&self, _registry: &ToolRegistry, platform: Platform) -> Result<bool> {
        Ok(self.sources.contains_key(&platform))
    }

    async fn verify(&self, ctx: &Context) -> Result<Vec<Error>> {
        let mut problems = Vec::new();
        for source in self.sources.values() {
            match self.download(ctx, source).await {
                Ok(data) => {
                    if let Err(actual) = source.hash.verify(&data) {
                        problems.push(Error::ChecksumMismatch {
                            tool: self.name.clone(),
                            url: source.url.clone(),
                            expected: source.hash.to_string(),
                            actual: actual.to_string(),
                        });
                    }
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => problems.push(e),
            }
        }
        let platforms: Vec<Platform> = self.sources.keys().copied().collect();
        problems.extend(tools::drift_problems(ctx, self, &platforms));
        Ok(problems)
    }

    async fn ensure(&self, ctx: &Context, platform: Platform) -> Result<()> {
        let source = self
            .sources
            .get(&platform)
            .ok_or_else(|| Error::incompatible(&self.name, platform))?;
        let published = self.published(platform);

        if published
            .iter()
            .any(|dst| tools::should_reinstall(ctx, self, platform, dst))
        {
            self.install(ctx, platform, source).await?;
        } else {
            debug!(tool = %self.name, %platform, "Already installed");
        }

        tools::link_platform_files(ctx, self, platform, &published)
    }
}
