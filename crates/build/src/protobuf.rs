//! Go code generation from protobuf definitions.

use std::path::{Path, PathBuf};
use toolsmith_core::{Context, EnvDescriptor, Error, ExecSpec, Platform, Result};
use tracing::{debug, info};

use crate::catalog;
use crate::modules;
use crate::output;

/// A `protoc` plugin and the output flag it answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plugin {
    /// Catalogue name of the plugin tool.
    pub tool: &'static str,
    /// Output flag, e.g. `--go_out`.
    pub out_flag: &'static str,
}

/// Go message generator.
pub const GO: Plugin = Plugin {
    tool: catalog::PROTOC_GEN_GO,
    out_flag: "--go_out",
};

/// Go gRPC service generator.
pub const GO_GRPC: Plugin = Plugin {
    tool: catalog::PROTOC_GEN_GO_GRPC,
    out_flag: "--go-grpc_out",
};

/// `protoc` arguments compiling `files` from `proto_dir` with `plugin`.
#[must_use]
pub fn protoc_args(
    plugin: Plugin,
    plugin_bin: &Path,
    proto_dir: &Path,
    out_dir: &Path,
    files: &[PathBuf],
) -> Vec<String> {
    let mut args = vec![
        "--proto_path".to_string(),
        proto_dir.display().to_string(),
        "--plugin".to_string(),
        plugin_bin.display().to_string(),
        plugin.out_flag.to_string(),
        out_dir.display().to_string(),
    ];
    args.extend(files.iter().map(|f| f.display().to_string()));
    args
}

/// Compile every `.proto` file below `proto_dir` into `out_dir`.
///
/// # Errors
///
/// Returns provisioning errors or [`Error::Compile`] when `protoc` fails.
pub async fn generate(
    ctx: &Context,
    plugin: Plugin,
    proto_dir: &Path,
    out_dir: &Path,
) -> Result<()> {
    let files = modules::files_with_extension(proto_dir, "proto")?;
    if files.is_empty() {
        debug!(dir = %proto_dir.display(), "No protobuf definitions");
        return Ok(());
    }

    let platform = Platform::local();
    ctx.ensure_tool(catalog::PROTOC, platform).await?;
    ctx.ensure_tool(plugin.tool, platform).await?;
    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|e| Error::io(e, out_dir, "create"))?;

    let env = EnvDescriptor::go(ctx.paths(), platform);
    output::create_env_dirs(&env).await?;
    let plugin_bin = ctx.bin(format!("bin/{}", plugin.tool), platform);

    info!(dir = %proto_dir.display(), plugin = plugin.tool, files = files.len(), "Generating code");
    ExecSpec::new(ctx.bin("bin/protoc", platform))
        .args(protoc_args(plugin, &plugin_bin, proto_dir, out_dir, &files))
        .dir(proto_dir)
        .inherit_env()
        .envs(env.vars())
        .run(ctx.cancel())
        .await
        .map_err(|e| e.in_package(proto_dir))?;
    Ok(())
}

/// Go messages for every definition below `proto_dir`.
///
/// # Errors
///
/// See [`generate`].
pub async fn generate_go(ctx: &Context, proto_dir: &Path, out_dir: &Path) -> Result<()> {
    generate(ctx, GO, proto_dir, out_dir).await
}

/// Go gRPC services for every definition below `proto_dir`.
///
/// # Errors
///
/// See [`generate`].
pub async fn generate_go_grpc(ctx: &Context, proto_dir: &Path, out_dir: &Path) -> Result<()> {
    generate(ctx, GO_GRPC, proto_dir, out_dir).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolsmith_core::{Config, DevPaths, ToolRegistry};

    #[test]
    fn test_protoc_args() {
        let args = protoc_args(
            GO_GRPC,
            Path::new("/dev-root/platforms/linux-amd64/bin/protoc-gen-go-grpc"),
            Path::new("/src/proto"),
            Path::new("/src/gen"),
            &[PathBuf::from("/src/proto/api.proto")],
        );
        assert_eq!(
            args,
            vec![
                "--proto_path",
                "/src/proto",
                "--plugin",
                "/dev-root/platforms/linux-amd64/bin/protoc-gen-go-grpc",
                "--go-grpc_out",
                "/src/gen",
                "/src/proto/api.proto"
            ]
        );
    }

    #[tokio::test]
    async fn test_no_definitions_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(DevPaths::new(dir.path()), ToolRegistry::new(), Config::default());
        generate_go(&ctx, dir.path(), &dir.path().join("gen")).await.unwrap();
        assert!(!dir.path().join("gen").exists());
    }
}
