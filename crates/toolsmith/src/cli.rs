use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use toolsmith_core::Platform;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Usage or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Provisioning, build or command failure exit code
pub const EXIT_EXEC: i32 = 3;
/// Exit code for SIGINT (128 + signal number 2)
pub const EXIT_SIGINT: i32 = 130;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Usage or configuration error (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(toolsmith::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A tool, build or command failed (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(toolsmith::cli::exec))]
    Exec {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Cancelled by a signal (exit code 130)
    #[error("Interrupted")]
    #[diagnostic(code(toolsmith::cli::interrupted))]
    Interrupted,
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new execution error
    #[must_use]
    pub fn exec(message: impl Into<String>) -> Self {
        Self::Exec {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new execution error with help text
    #[must_use]
    pub fn exec_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Exec {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Convert `toolsmith_core::Error` to the matching `CliError` variant.
///
/// Unknown names, bad platforms and configuration problems are usage errors;
/// everything that happened while doing work is an execution error.
impl From<toolsmith_core::Error> for CliError {
    fn from(err: toolsmith_core::Error) -> Self {
        use toolsmith_core::Error;

        let help = err.help().map(|h| h.to_string());
        match err {
            Error::Cancelled { .. } => Self::Interrupted,
            // Avoid "Configuration error: Configuration error:"
            Error::Configuration { message } => Self::Config { message, help },
            Error::ToolNotFound { .. } => Self::config_with_help(
                err.to_string(),
                "Run `toolsmith tools list` to see the registered tools",
            ),
            Error::UnsupportedPlatform { .. } => Self::Config {
                message: err.to_string(),
                help,
            },
            other => Self::Exec {
                message: other.to_string(),
                help,
            },
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Exec { .. } => EXIT_EXEC,
        CliError::Interrupted => EXIT_SIGINT,
    }
}

/// Print `err` to stderr through miette
#[allow(clippy::print_stderr)]
pub fn render_error(err: &CliError) {
    let report = Report::new(err.clone());
    eprintln!("{report:?}");
    let _ = io::stderr().flush();
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    s.parse::<Platform>().map_err(|e| e.to_string())
}

/// Provision pinned developer tools and build with them.
#[derive(Parser, Debug)]
#[command(name = "toolsmith", version, about, long_about = None)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Dev root holding tools, caches and the link farm.
    #[arg(long, global = true, env = "TOOLSMITH_ROOT")]
    pub root: Option<PathBuf>,

    /// Configuration file; defaults to `toolsmith.toml` in the working directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Logging verbosity level.
    #[arg(long, global = true, default_value = "info", value_enum)]
    pub log_level: LogLevel,

    /// Log output format.
    #[arg(long, global = true, default_value = "compact", value_enum)]
    pub log_format: TracingFormat,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage provisioned tools.
    #[command(subcommand)]
    Tools(ToolsCommand),

    /// Build a package.
    #[command(subcommand)]
    Build(BuildCommand),

    /// Run named commands such as `lint` or `test/go`.
    Run {
        /// Command names, run in order.
        #[arg(required = true)]
        commands: Vec<String>,
    },

    /// List named commands.
    Commands,
}

/// `toolsmith tools ...`
#[derive(Subcommand, Debug)]
pub enum ToolsCommand {
    /// List registered tools.
    List,

    /// Install the named tools.
    Ensure {
        /// Tool names.
        #[arg(required = true)]
        names: Vec<String>,
        /// Target platform; defaults to the host.
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,
    },

    /// Install every tool compatible with the platform.
    Install {
        /// Target platform; defaults to the host.
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,
    },

    /// Re-check declared sources and installed files.
    Verify,

    /// Print the absolute path of a published file.
    Bin {
        /// Published path, e.g. `bin/go`.
        path: PathBuf,
        /// Target platform; defaults to the host.
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,
    },
}

/// `toolsmith build ...`
#[derive(Subcommand, Debug)]
pub enum BuildCommand {
    /// Build a Go package.
    Go {
        /// Package directory.
        #[arg(long)]
        package: PathBuf,
        /// Output binary.
        #[arg(long)]
        output: PathBuf,
        /// Host platform or `docker-amd64`; defaults to the host.
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,
        /// Enable cgo.
        #[arg(long)]
        cgo: bool,
        /// Link statically (container builds).
        #[arg(long = "static")]
        static_build: bool,
        /// Build tag; repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Tree mounted into the container; defaults to the package.
        #[arg(long)]
        source_root: Option<PathBuf>,
    },

    /// Build a Rust binary.
    Rust {
        /// Crate or workspace directory.
        #[arg(long)]
        package: PathBuf,
        /// Binary target name.
        #[arg(long)]
        binary: String,
        /// Output binary.
        #[arg(long)]
        output: PathBuf,
        /// Host platform or `docker-amd64`; defaults to the host.
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,
    },

    /// Build a Zig package on the host.
    Zig {
        /// Directory holding `build.zig`.
        #[arg(long)]
        package: PathBuf,
        /// Install prefix.
        #[arg(long)]
        output: PathBuf,
        /// Build step.
        #[arg(long)]
        step: Option<String>,
    },
}

/// Parse command line arguments into a CLI structure.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["toolsmith", "commands"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.log_format, TracingFormat::Compact);
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Commands::Commands));
    }

    #[test]
    fn test_build_go_flags() {
        let cli = Cli::try_parse_from([
            "toolsmith",
            "build",
            "go",
            "--package",
            "cmd/app",
            "--output",
            "out/app",
            "--platform",
            "docker-amd64",
            "--static",
            "--tag",
            "netgo",
            "--tag",
            "osusergo",
        ])
        .unwrap();
        match cli.command {
            Commands::Build(BuildCommand::Go {
                platform,
                static_build,
                cgo,
                tags,
                ..
            }) => {
                assert_eq!(platform, Some(Platform::DOCKER_AMD64));
                assert!(static_build);
                assert!(!cgo);
                assert_eq!(tags, vec!["netgo", "osusergo"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_bad_platform_is_a_usage_error() {
        let err = Cli::try_parse_from(["toolsmith", "tools", "install", "--platform", "plan9-mips"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_run_requires_a_command() {
        assert!(Cli::try_parse_from(["toolsmith", "run"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "toolsmith",
            "tools",
            "list",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.log_format, TracingFormat::Json);
    }

    #[test]
    fn test_error_mapping() {
        use toolsmith_core::Error;

        let cases = [
            (Error::configuration("bad key"), EXIT_CLI),
            (Error::tool_not_found("nope"), EXIT_CLI),
            (Error::incompatible("libevmone", "linux-amd64"), EXIT_EXEC),
            (Error::compile("cmd/app", "undefined: x"), EXIT_EXEC),
            (
                Error::Cancelled {
                    command: "go build".to_string(),
                },
                EXIT_SIGINT,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(exit_code_for(&CliError::from(err)), code);
        }
    }

    #[test]
    fn test_configuration_message_not_doubled() {
        let err = CliError::from(toolsmith_core::Error::configuration("bad key"));
        assert_eq!(err.to_string(), "Configuration error: bad key");
    }
}
