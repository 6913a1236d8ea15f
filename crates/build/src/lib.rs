//! Build orchestration for toolsmith.
//!
//! - [`catalog`]: every provisionable tool, assembled into a registry
//! - [`go`], [`rust`], [`zig`]: compile on the host or in a disposable container
//! - [`image`]: content-addressed builder images
//! - [`engine`]: the container engine seam and its `docker` implementation
//! - [`protobuf`]: Go code generation through `protoc`
//! - [`commands`]: the named command table
//! - [`inspect`]: ELF interpreter lookup for checking static builds

pub mod catalog;
pub mod commands;
pub mod container;
pub mod engine;
pub mod git;
pub mod go;
pub mod image;
pub mod inspect;
pub mod modules;
mod output;
pub mod protobuf;
pub mod rust;
pub mod zig;

pub use engine::{ContainerEngine, DockerCli, RunSpec};
pub use go::BuildRequest;
pub use rust::RustBuildRequest;
pub use zig::ZigBuildRequest;
