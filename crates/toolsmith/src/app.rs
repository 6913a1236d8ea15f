//! Command dispatch.
//!
//! [`execute`] turns a parsed [`Cli`] into calls on the core and build
//! crates and returns what should be printed on stdout.

use std::fmt::Write as _;
use std::path::Path;

use tokio_util::sync::CancellationToken;
use toolsmith_build::{
    BuildRequest, DockerCli, RustBuildRequest, ZigBuildRequest, catalog, commands, go, rust, zig,
};
use toolsmith_core::{Command, Config, Context, DevPaths, Platform, Runner};
use tracing::{info, warn};

use crate::cli::{BuildCommand, Cli, CliError, Commands, ToolsCommand};

/// Load configuration and the catalogue into a context bound to `cancel`.
///
/// # Errors
///
/// Returns a configuration error for unreadable or invalid configuration and
/// an execution error if the catalogue is inconsistent.
pub fn context(cli: &Cli, cwd: &Path, cancel: CancellationToken) -> Result<Context, CliError> {
    let config = Config::load(cli.config.as_deref(), cwd)?;
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => config.resolve_root()?,
    };
    let registry = catalog::registry()?;
    info!(root = %root.display(), tools = registry.len(), "Loaded catalogue");
    Ok(Context::new(DevPaths::new(root), registry, config).with_cancel(cancel))
}

/// Run the parsed command line, returning stdout text.
///
/// # Errors
///
/// Returns the mapped failure of whatever the command ran.
pub async fn execute(cli: Cli, cancel: CancellationToken) -> Result<String, CliError> {
    let cwd = std::env::current_dir()
        .map_err(|e| CliError::config(format!("Cannot determine working directory: {e}")))?;

    if matches!(cli.command, Commands::Commands) {
        return Ok(list_commands());
    }

    let ctx = context(&cli, &cwd, cancel)?;
    match cli.command {
        Commands::Tools(command) => tools(&ctx, command).await,
        Commands::Build(command) => build(&ctx, command).await,
        Commands::Run { commands } => run(&ctx, &commands).await,
        Commands::Commands => Ok(list_commands()),
    }
}

fn list_commands() -> String {
    let width = commands::COMMANDS
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or_default();
    commands::COMMANDS.iter().fold(String::new(), |mut out, c| {
        let _ = writeln!(out, "{:width$}  {}", c.name, c.description);
        out
    })
}

fn list_tools(ctx: &Context) -> String {
    let mut out = String::new();
    for tool in ctx.registry().iter() {
        let platforms: Vec<String> = Platform::ALL
            .iter()
            .filter(|p| tool.is_compatible(ctx.registry(), **p).unwrap_or(false))
            .map(ToString::to_string)
            .collect();
        let _ = writeln!(
            out,
            "{:<20} {:<10} {:<10} {}",
            tool.name(),
            tool.version(),
            tool.kind().to_string(),
            platforms.join(",")
        );
    }
    out
}

async fn tools(ctx: &Context, command: ToolsCommand) -> Result<String, CliError> {
    match command {
        ToolsCommand::List => Ok(list_tools(ctx)),
        ToolsCommand::Ensure { names, platform } => {
            let platform = platform.unwrap_or_else(Platform::local);
            for name in &names {
                ctx.ensure_tool(name, platform).await?;
            }
            Ok(String::new())
        }
        ToolsCommand::Install { platform } => {
            let installed = ctx.ensure_all(platform.unwrap_or_else(Platform::local)).await?;
            Ok(installed.iter().fold(String::new(), |mut out, name| {
                let _ = writeln!(out, "{name}");
                out
            }))
        }
        ToolsCommand::Verify => {
            let problems = ctx.verify_all().await?;
            if problems.is_empty() {
                return Ok(String::new());
            }
            for (tool, problem) in &problems {
                warn!(tool = %tool, problem = %problem, "Verification problem");
            }
            Err(CliError::exec_with_help(
                format!("{} verification problem(s) found", problems.len()),
                "Run `toolsmith tools ensure <name>` to reinstall drifted tools",
            ))
        }
        ToolsCommand::Bin { path, platform } => {
            let bin = ctx.bin(path, platform.unwrap_or_else(Platform::local));
            Ok(format!("{}\n", bin.display()))
        }
    }
}

async fn build(ctx: &Context, command: BuildCommand) -> Result<String, CliError> {
    let engine = DockerCli::from_config(&ctx.config().container);
    let output = match command {
        BuildCommand::Go {
            package,
            output,
            platform,
            cgo,
            static_build,
            tags,
            source_root,
        } => {
            let mut req = BuildRequest::new(platform.unwrap_or_else(Platform::local), package, output)
                .cgo(cgo)
                .static_build(static_build);
            req.tags = tags;
            req.source_root = source_root;
            go::build(ctx, &engine, &req).await?
        }
        BuildCommand::Rust {
            package,
            binary,
            output,
            platform,
        } => {
            let req = RustBuildRequest::new(
                platform.unwrap_or_else(Platform::local),
                package,
                binary,
                output,
            );
            rust::build(ctx, &engine, &req).await?
        }
        BuildCommand::Zig {
            package,
            output,
            step,
        } => {
            let mut req = ZigBuildRequest::new(package, output);
            req.step = step;
            zig::build(ctx, &req).await?
        }
    };
    Ok(format!("{}\n", output.display()))
}

/// Resolve every name before running anything.
///
/// # Errors
///
/// Returns a configuration error naming the first unknown command.
pub fn resolve_commands(names: &[String]) -> Result<Vec<&'static Command>, CliError> {
    names
        .iter()
        .map(|name| {
            commands::find(name).ok_or_else(|| {
                CliError::config_with_help(
                    format!("Unknown command '{name}'"),
                    "Run `toolsmith commands` to list them",
                )
            })
        })
        .collect()
}

async fn run(ctx: &Context, names: &[String]) -> Result<String, CliError> {
    let commands = resolve_commands(names)?;
    let runner = Runner::new();
    runner.run(ctx, &commands).await?;
    info!(completed = ?runner.completed(), "Commands finished");
    Ok(String::new())
}
