//! Converge CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use converge::cli::{install_interrupt_handler, Cli, CommandContext, CommandDispatcher};
use converge::config::find_project_root;
use converge::error::ConvergeError;
use converge::ui::{create_ui, should_use_colors, OutputMode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is WARN
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("converge=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("converge=warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("converge starting with args: {:?}", cli);

    let output_mode = OutputMode::from_flags(cli.verbose, cli.quiet);
    let mut ui = create_ui(output_mode, !cli.no_color && should_use_colors());

    // Determine project root
    let project_root = match &cli.project {
        Some(project) => project.clone(),
        None => {
            let cwd = std::env::current_dir().unwrap_or_default();
            if cli.config.is_some() {
                cwd
            } else {
                find_project_root(&cwd).unwrap_or(cwd)
            }
        }
    };

    let context = CommandContext::new(&project_root)
        .with_config_path(cli.config.clone())
        .with_cancellation(install_interrupt_handler());
    let dispatcher = CommandDispatcher::new(context);

    match dispatcher.dispatch(&cli, ui.as_mut()) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            let code = match e {
                ConvergeError::ConfigParseError { .. }
                | ConvergeError::ConfigValidationError { .. } => 2,
                _ => 1,
            };
            ExitCode::from(code)
        }
    }
}
