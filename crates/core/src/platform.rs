//! Platform model.
//!
//! A platform is an OS/architecture pair. The `docker` OS is a virtual target
//! meaning "linux artifacts produced inside a disposable container"; tools
//! declare sources for it separately because such artifacts are consumed by
//! container builds, never executed on the host.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Error, Result};

/// Platform identifier combining OS and architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system, or the virtual container target.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// linux/amd64
    pub const LINUX_AMD64: Self = Self::new(Os::Linux, Arch::Amd64);
    /// darwin/amd64
    pub const DARWIN_AMD64: Self = Self::new(Os::Darwin, Arch::Amd64);
    /// darwin/arm64
    pub const DARWIN_ARM64: Self = Self::new(Os::Darwin, Arch::Arm64);
    /// linux/amd64 artifacts built inside a container
    pub const DOCKER_AMD64: Self = Self::new(Os::Docker, Arch::Amd64);

    /// Every platform the tool catalogue may declare sources for.
    pub const ALL: [Self; 4] = [
        Self::LINUX_AMD64,
        Self::DARWIN_AMD64,
        Self::DARWIN_ARM64,
        Self::DOCKER_AMD64,
    ];

    /// Create a new platform.
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// The platform toolsmith itself is running on.
    #[must_use]
    pub fn local() -> Self {
        Self {
            os: Os::current(),
            arch: Arch::current(),
        }
    }

    /// Whether this is the virtual container platform.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self.os, Os::Docker)
    }

    /// Whether binaries for this platform run on the current host.
    #[must_use]
    pub fn is_local(&self) -> bool {
        *self == Self::local()
    }

    /// OS the produced artifacts target. The container platform targets linux.
    #[must_use]
    pub const fn target_os(&self) -> Os {
        match self.os {
            Os::Docker => Os::Linux,
            os => os,
        }
    }

    /// Parse from strings like `linux-amd64` or `docker/amd64`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (os, arch) = s.split_once(['-', '/', '.'])?;
        Some(Self {
            os: Os::parse(os)?,
            arch: Arch::parse(arch)?,
        })
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::UnsupportedPlatform {
            requested: s.to_string(),
            supported: Self::ALL
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// Operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Linux host
    Linux,
    /// macOS host
    Darwin,
    /// Linux inside a container
    Docker,
}

impl Os {
    /// Get the current OS.
    #[must_use]
    pub fn current() -> Self {
        #[cfg(target_os = "macos")]
        return Self::Darwin;
        #[cfg(target_os = "linux")]
        return Self::Linux;
        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        compile_error!("Unsupported OS");
    }

    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "darwin" | "macos" => Some(Self::Darwin),
            "docker" | "container" => Some(Self::Docker),
            _ => None,
        }
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Darwin => write!(f, "darwin"),
            Self::Docker => write!(f, "docker"),
        }
    }
}

/// CPU architecture, named the way Go and container engines name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// x86-64
    Amd64,
    /// AArch64
    Arm64,
}

impl Arch {
    /// Get the current architecture.
    #[must_use]
    pub fn current() -> Self {
        #[cfg(target_arch = "aarch64")]
        return Self::Arm64;
        #[cfg(target_arch = "x86_64")]
        return Self::Amd64;
        #[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
        compile_error!("Unsupported architecture");
    }

    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "amd64" | "x86_64" | "x64" => Some(Self::Amd64),
            "arm64" | "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Amd64 => write!(f, "amd64"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_separators() {
        assert_eq!(Platform::parse("linux-amd64"), Some(Platform::LINUX_AMD64));
        assert_eq!(Platform::parse("darwin/arm64"), Some(Platform::DARWIN_ARM64));
        assert_eq!(Platform::parse("docker.amd64"), Some(Platform::DOCKER_AMD64));
        assert_eq!(Platform::parse("macos-x86_64"), Some(Platform::DARWIN_AMD64));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Platform::parse("linux").is_none());
        assert!(Platform::parse("windows-amd64").is_none());
        assert!(Platform::parse("linux-riscv").is_none());
    }

    #[test]
    fn test_from_str_lists_supported() {
        let err = "plan9-amd64".parse::<Platform>().unwrap_err();
        let message = match err {
            Error::UnsupportedPlatform { supported, .. } => supported,
            other => panic!("unexpected error: {other}"),
        };
        assert!(message.contains("docker-amd64"));
    }

    #[test]
    fn test_display_round_trips() {
        for platform in Platform::ALL {
            assert_eq!(Platform::parse(&platform.to_string()), Some(platform));
        }
    }

    #[test]
    fn test_container_targets_linux() {
        assert!(Platform::DOCKER_AMD64.is_container());
        assert_eq!(Platform::DOCKER_AMD64.target_os(), Os::Linux);
        assert_eq!(Platform::DARWIN_ARM64.target_os(), Os::Darwin);
        assert!(!Platform::LINUX_AMD64.is_container());
    }

    #[test]
    fn test_local_is_never_container() {
        let local = Platform::local();
        assert!(!local.is_container());
        assert!(local.is_local());
    }
}
