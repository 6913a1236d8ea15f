//! Error types for toolsmith provisioning and builds

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type shared by every toolsmith crate
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// No tool with the requested name is registered
    #[error("Tool '{name}' is not registered")]
    #[diagnostic(
        code(toolsmith::tools::not_found),
        help("Run `toolsmith tools list` to see the registered tools")
    )]
    ToolNotFound {
        /// Requested tool name
        name: String,
    },

    /// Two tool definitions share a name
    #[error("Tool '{name}' is registered more than once")]
    #[diagnostic(code(toolsmith::tools::duplicate))]
    DuplicateTool {
        /// Duplicated tool name
        name: String,
    },

    /// The tool declares no source for the platform
    #[error("Tool '{tool}' is not available for platform {platform}")]
    #[diagnostic(
        code(toolsmith::tools::incompatible),
        help("Pick one of the platforms the tool declares a source for")
    )]
    Incompatible {
        /// Tool name
        tool: String,
        /// Requested platform
        platform: String,
    },

    /// Fetching a source failed
    #[error("Downloading {tool} from {url} failed: {message}")]
    #[diagnostic(
        code(toolsmith::install::download),
        help("Check network access and re-run the command")
    )]
    Download {
        /// Tool name
        tool: String,
        /// Source URL
        url: String,
        /// Description of the failure
        message: String,
    },

    /// Unpacking a downloaded source failed
    #[error("Extracting {tool} failed: {message}")]
    #[diagnostic(code(toolsmith::install::extract))]
    Extract {
        /// Tool name
        tool: String,
        /// Description of the failure
        message: String,
    },

    /// Downloaded bytes do not match the declared hash
    #[error("Checksum mismatch for {tool} downloaded from {url}: expected {expected}, got {actual}")]
    #[diagnostic(
        code(toolsmith::install::checksum),
        help("The artifact was not installed. Update the declared hash only after confirming the new artifact is trusted")
    )]
    ChecksumMismatch {
        /// Tool name
        tool: String,
        /// Source URL
        url: String,
        /// Declared hash
        expected: String,
        /// Hash of the downloaded bytes
        actual: String,
    },

    /// I/O error with optional path context
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(toolsmith::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "symlink", "rename")
        operation: String,
    },

    /// Filesystem failure while swapping a link
    #[error("Publishing link {} failed", path.display())]
    #[diagnostic(
        code(toolsmith::install::link),
        help("The previous stable link, if any, was left untouched")
    )]
    Link {
        /// Link being published
        path: Box<Path>,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An installer step other than download or extraction failed
    #[error("Installing {tool} failed: {message}")]
    #[diagnostic(code(toolsmith::install::failed))]
    Install {
        /// Tool name
        tool: String,
        /// Description of the failure
        message: String,
    },

    /// A compiler invocation failed
    #[error("Building package '{package}' failed: {message}")]
    #[diagnostic(code(toolsmith::build::compile))]
    Compile {
        /// Package path
        package: String,
        /// Description of the failure
        message: String,
    },

    /// Version control reports uncommitted changes
    #[error("Working tree is not clean:\n{status}")]
    #[diagnostic(
        code(toolsmith::git::dirty),
        help("Commit the changes produced by the previous step or revert them")
    )]
    DirtyTree {
        /// Output of the status query
        status: String,
    },

    /// An external process exited unsuccessfully
    #[error("Command `{command}` failed{}", exit_code.map_or_else(|| " (terminated by signal)".to_string(), |c| format!(" with exit code {c}")))]
    #[diagnostic(code(toolsmith::exec::failed))]
    CommandFailed {
        /// Rendered command line
        command: String,
        /// Exit code, absent when killed by a signal
        exit_code: Option<i32>,
        /// Captured standard error, if any
        stderr: String,
    },

    /// An external process was cancelled
    #[error("Command `{command}` was cancelled")]
    #[diagnostic(code(toolsmith::exec::cancelled))]
    Cancelled {
        /// Rendered command line
        command: String,
    },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(toolsmith::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Platform string or platform request is not supported
    #[error("Platform '{requested}' is not supported here; supported: {supported}")]
    #[diagnostic(code(toolsmith::platform::unsupported))]
    UnsupportedPlatform {
        /// Requested platform
        requested: String,
        /// Platforms accepted in this context
        supported: String,
    },
}

impl Error {
    /// Create a not found error
    #[must_use]
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    /// Create an incompatibility error
    #[must_use]
    pub fn incompatible(tool: impl Into<String>, platform: impl ToString) -> Self {
        Self::Incompatible {
            tool: tool.into(),
            platform: platform.to_string(),
        }
    }

    /// Create a download error
    #[must_use]
    pub fn download(
        tool: impl Into<String>,
        url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Download {
            tool: tool.into(),
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an extraction error
    #[must_use]
    pub fn extract(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extract {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an installer error
    #[must_use]
    pub fn install(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Install {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a compile error
    #[must_use]
    pub fn compile(package: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Compile {
            package: package.as_ref().display().to_string(),
            message: message.into(),
        }
    }

    /// Create a link swap error
    #[must_use]
    pub fn link(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::Link {
            path: path.as_ref().into(),
            source,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Wrap an error from a compiler process with the package it was building.
    ///
    /// Cancellation passes through untouched so callers can still tell an
    /// interrupted build from a failed one.
    #[must_use]
    pub fn in_package(self, package: impl AsRef<Path>) -> Self {
        match self {
            Self::Cancelled { .. } | Self::Compile { .. } => self,
            other => Self::compile(package, other.to_string()),
        }
    }

    /// Whether the error was caused by cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for toolsmith operations
pub type Result<T> = std::result::Result<T, Error>;
