//! Core of toolsmith: provisioning versioned developer tools into a managed
//! dev root and running them.
//!
//! The pieces, leaves first:
//!
//! - [`platform`]: OS/architecture pairs, including the virtual container target
//! - [`tools`]: the [`Tool`] contract and the [`ToolRegistry`]
//! - [`link`]: the checksum-suffixed symlink swap every installer publishes through
//! - [`exec`]: cancellable external process execution
//! - [`env`]: environment descriptors handed to invoked tools
//! - [`command`]: named commands and the memoizing dependency runner

pub mod checksum;
pub mod command;
pub mod config;
pub mod context;
pub mod env;
mod error;
pub mod exec;
pub mod link;
pub mod paths;
pub mod platform;
pub mod tools;

pub use command::{Command, CommandFuture, Deps, Runner};
pub use config::Config;
pub use context::Context;
pub use env::EnvDescriptor;
pub use error::{Error, Result};
pub use exec::{ExecOutput, ExecSpec};
pub use paths::DevPaths;
pub use platform::{Arch, Os, Platform};
pub use tools::{Source, Sources, Tool, ToolKind, ToolRegistry};
