//! toolsmith CLI entry point.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use tokio_util::sync::CancellationToken;
use toolsmith::cli::{self, CliError, EXIT_EXEC, EXIT_OK, EXIT_SIGINT, exit_code_for, render_error};
use toolsmith::tracing::{TracingConfig, init_tracing};
use toolsmith::{app, shutdown};

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();
    if let Err(e) = init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.log_level.into(),
        filter: None,
    }) {
        eprintln!("{e:?}");
        std::process::exit(EXIT_EXEC);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(EXIT_EXEC);
        }
    };

    let cancel = CancellationToken::new();
    let result = runtime.block_on(async {
        shutdown::install_signal_handlers(cancel.clone());
        app::execute(cli, cancel.clone()).await
    });

    let code = match result {
        Ok(_) if cancel.is_cancelled() => EXIT_SIGINT,
        Ok(output) => {
            print!("{output}");
            EXIT_OK
        }
        Err(err) => {
            let err = if cancel.is_cancelled() { CliError::Interrupted } else { err };
            render_error(&err);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}
