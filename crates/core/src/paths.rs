//! Layout of the managed development tree.
//!
//! ```text
//! <root>/tools/<name>/<version>/<platform>/download/   private scratch area
//! <root>/tools/<name>/<version>/<platform>/links/      stable + checksum links
//! <root>/platforms/<platform>/bin/                     PATH entry per platform
//! <root>/<language>/{cache,home}/                      package manager state
//! <root>/env/                                          state shared with containers
//! ```
//!
//! The root resolves from `TOOLSMITH_ROOT`, then configuration, then the
//! platform cache directory (`~/.cache/toolsmith` on Linux).

use std::path::{Path, PathBuf};

use crate::platform::Platform;
use crate::{Error, Result};

/// Environment variable overriding the dev root.
pub const ROOT_ENV: &str = "TOOLSMITH_ROOT";

/// Default dev root below the platform cache directory.
///
/// # Errors
///
/// Returns an error if the cache directory cannot be determined.
pub fn default_root() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ROOT_ENV)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    let base = dirs::cache_dir()
        .ok_or_else(|| Error::configuration("Could not determine cache directory"))?;

    Ok(base.join("toolsmith"))
}

/// Paths inside a dev root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevPaths {
    root: PathBuf,
}

impl DevPaths {
    /// Wrap an existing root directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The dev root itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `tools/<name>/<version>/<platform>`
    #[must_use]
    pub fn tool_dir(&self, name: &str, version: &str, platform: Platform) -> PathBuf {
        self.root
            .join("tools")
            .join(name)
            .join(version)
            .join(platform.to_string())
    }

    /// Private extraction/build area of a tool.
    #[must_use]
    pub fn download_dir(&self, name: &str, version: &str, platform: Platform) -> PathBuf {
        self.tool_dir(name, version, platform).join("download")
    }

    /// Link farm of a tool.
    #[must_use]
    pub fn links_dir(&self, name: &str, version: &str, platform: Platform) -> PathBuf {
        self.tool_dir(name, version, platform).join("links")
    }

    /// Directory merging the published files of every tool for a platform.
    #[must_use]
    pub fn platform_dir(&self, platform: Platform) -> PathBuf {
        self.root.join("platforms").join(platform.to_string())
    }

    /// `bin` directory prepended to `PATH` for a platform.
    #[must_use]
    pub fn platform_bin_dir(&self, platform: Platform) -> PathBuf {
        self.platform_dir(platform).join("bin")
    }

    /// Bind-mount source shared with build containers.
    #[must_use]
    pub fn env_dir(&self) -> PathBuf {
        self.root.join("env")
    }

    /// Root of a language's package-manager state. Container builds keep it
    /// below [`Self::env_dir`] so the container sees it at the same path.
    #[must_use]
    pub fn language_dir(&self, language: &str, platform: Platform) -> PathBuf {
        if platform.is_container() {
            self.env_dir().join(language)
        } else {
            self.root.join(language)
        }
    }

    /// `<language>/cache/<kind>`
    #[must_use]
    pub fn language_cache(&self, language: &str, kind: &str, platform: Platform) -> PathBuf {
        self.language_dir(language, platform).join("cache").join(kind)
    }

    /// `<language>/home`
    #[must_use]
    pub fn language_home(&self, language: &str, platform: Platform) -> PathBuf {
        self.language_dir(language, platform).join("home")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_layout() {
        let paths = DevPaths::new("/dev-root");
        assert_eq!(
            paths.links_dir("go", "1.23.0", Platform::LINUX_AMD64),
            PathBuf::from("/dev-root/tools/go/1.23.0/linux-amd64/links")
        );
        assert_eq!(
            paths.download_dir("go", "1.23.0", Platform::DARWIN_ARM64),
            PathBuf::from("/dev-root/tools/go/1.23.0/darwin-arm64/download")
        );
        assert_eq!(
            paths.platform_bin_dir(Platform::LINUX_AMD64),
            PathBuf::from("/dev-root/platforms/linux-amd64/bin")
        );
    }

    #[test]
    fn test_container_language_dirs_live_under_env() {
        let paths = DevPaths::new("/dev-root");
        assert_eq!(
            paths.language_cache("go", "gobuild", Platform::DOCKER_AMD64),
            PathBuf::from("/dev-root/env/go/cache/gobuild")
        );
        assert_eq!(
            paths.language_home("go", Platform::LINUX_AMD64),
            PathBuf::from("/dev-root/go/home")
        );
    }

    #[test]
    fn test_default_root_honours_env() {
        temp_env::with_var(ROOT_ENV, Some("/custom/root"), || {
            assert_eq!(default_root().unwrap(), PathBuf::from("/custom/root"));
        });
    }

    #[test]
    fn test_default_root_ignores_empty_env() {
        temp_env::with_var(ROOT_ENV, Some(""), || {
            let root = default_root().unwrap();
            assert!(root.ends_with("toolsmith"));
        });
    }
}
