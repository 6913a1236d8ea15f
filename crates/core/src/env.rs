//! Environment descriptors.
//!
//! A descriptor is the set of variables handed to every tool invocation for a
//! platform: a `PATH` prefix pointing at the platform bin directory plus the
//! cache and home directories of each language's package manager, all inside
//! the dev root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::paths::DevPaths;
use crate::platform::Platform;

/// Synthesized environment for one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvDescriptor {
    path_prefix: Vec<PathBuf>,
    inherit_path: bool,
    vars: BTreeMap<String, String>,
}

impl EnvDescriptor {
    /// Empty descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Base descriptor for a platform.
    ///
    /// Host platforms get the platform bin directory in front of the ambient
    /// `PATH`; the container platform gets no `PATH` entries because the
    /// image decides its own search path.
    #[must_use]
    pub fn for_platform(paths: &DevPaths, platform: Platform) -> Self {
        if platform.is_container() {
            Self::new()
        } else {
            Self::new()
                .with_path_prefix(paths.platform_bin_dir(platform))
                .with_ambient_path()
        }
    }

    /// Go toolchain variables: `GOPATH`, `GOCACHE`, `GOLANGCI_LINT_CACHE`.
    #[must_use]
    pub fn go(paths: &DevPaths, platform: Platform) -> Self {
        Self::for_platform(paths, platform)
            .with_var("GOPATH", paths.language_home("go", platform))
            .with_var("GOCACHE", paths.language_cache("go", "gobuild", platform))
            .with_var(
                "GOLANGCI_LINT_CACHE",
                paths.language_cache("go", "golangci", platform),
            )
    }

    /// Rust toolchain variables: `CARGO_HOME` and `CARGO_TARGET_DIR`.
    #[must_use]
    pub fn rust(paths: &DevPaths, platform: Platform) -> Self {
        Self::for_platform(paths, platform)
            .with_var("CARGO_HOME", paths.language_home("rust", platform))
            .with_var(
                "CARGO_TARGET_DIR",
                paths.language_dir("rust", platform).join("target"),
            )
    }

    /// Zig variables: `ZIG_GLOBAL_CACHE_DIR` and `ZIG_LOCAL_CACHE_DIR`.
    #[must_use]
    pub fn zig(paths: &DevPaths, platform: Platform) -> Self {
        Self::for_platform(paths, platform)
            .with_var(
                "ZIG_GLOBAL_CACHE_DIR",
                paths.language_cache("zig", "global", platform),
            )
            .with_var(
                "ZIG_LOCAL_CACHE_DIR",
                paths.language_cache("zig", "build", platform),
            )
    }

    /// Prepend a directory to `PATH`. Earlier calls take precedence.
    #[must_use]
    pub fn with_path_prefix(mut self, dir: impl Into<PathBuf>) -> Self {
        self.path_prefix.push(dir.into());
        self
    }

    /// Append the ambient `PATH` after the managed prefix.
    #[must_use]
    pub fn with_ambient_path(mut self) -> Self {
        self.inherit_path = true;
        self
    }

    /// Set a variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl AsRef<Path>) -> Self {
        self.vars
            .insert(key.into(), value.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Value of a variable other than `PATH`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Directories the descriptor puts in front of `PATH`.
    #[must_use]
    pub fn path_prefix(&self) -> &[PathBuf] {
        &self.path_prefix
    }

    /// Rendered `PATH`, if the descriptor sets one.
    #[must_use]
    pub fn path(&self) -> Option<String> {
        self.render_path(std::env::var("PATH").ok().as_deref())
    }

    fn render_path(&self, ambient: Option<&str>) -> Option<String> {
        let mut parts: Vec<String> = self
            .path_prefix
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        if self.inherit_path
            && let Some(ambient) = ambient
            && !ambient.is_empty()
        {
            parts.push(ambient.to_string());
        }
        (!parts.is_empty()).then(|| parts.join(":"))
    }

    /// Every variable as `(key, value)` pairs, `PATH` first.
    #[must_use]
    pub fn vars(&self) -> Vec<(String, String)> {
        self.path()
            .map(|p| ("PATH".to_string(), p))
            .into_iter()
            .chain(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect()
    }

    /// Directories the variables point at, so callers can create them up front.
    #[must_use]
    pub fn directories(&self) -> Vec<PathBuf> {
        self.vars.values().map(PathBuf::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_descriptor_prefixes_platform_bin() {
        let paths = DevPaths::new("/dev-root");
        let env = EnvDescriptor::for_platform(&paths, Platform::LINUX_AMD64);
        assert_eq!(
            env.render_path(Some("/usr/bin")),
            Some("/dev-root/platforms/linux-amd64/bin:/usr/bin".to_string())
        );
        assert_eq!(
            env.render_path(None),
            Some("/dev-root/platforms/linux-amd64/bin".to_string())
        );
    }

    #[test]
    fn test_container_descriptor_has_no_path() {
        let paths = DevPaths::new("/dev-root");
        let env = EnvDescriptor::go(&paths, Platform::DOCKER_AMD64);
        assert!(env.path().is_none());
        assert_eq!(env.get("GOCACHE"), Some("/dev-root/env/go/cache/gobuild"));
        assert!(env.vars().iter().all(|(k, _)| k != "PATH"));
    }

    #[test]
    fn test_go_descriptor_keeps_state_in_dev_root() {
        let paths = DevPaths::new("/dev-root");
        let env = EnvDescriptor::go(&paths, Platform::DARWIN_ARM64);
        assert_eq!(env.get("GOPATH"), Some("/dev-root/go/home"));
        assert_eq!(
            env.get("GOLANGCI_LINT_CACHE"),
            Some("/dev-root/go/cache/golangci")
        );
        assert_eq!(env.vars()[0].0, "PATH");
    }

    #[test]
    fn test_rust_descriptor() {
        let paths = DevPaths::new("/dev-root");
        let env = EnvDescriptor::rust(&paths, Platform::LINUX_AMD64);
        assert_eq!(env.get("CARGO_HOME"), Some("/dev-root/rust/home"));
        assert_eq!(env.get("CARGO_TARGET_DIR"), Some("/dev-root/rust/target"));
        assert_eq!(env.directories().len(), 2);
    }
}
