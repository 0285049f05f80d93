//! compilerkit CLI - inspect and check native compiler toolchains

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use compilerkit::util::diagnostic::{emit, Diagnostic};
use compilerkit::CompilerError;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli, color) {
        if let Some(diagnostic) = e.downcast_ref::<Diagnostic>() {
            emit(diagnostic, color);
        } else if let Some(err) = e.downcast_ref::<CompilerError>() {
            emit(&err.to_diagnostic(), color);
        } else {
            eprintln!("error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, color: bool) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("compilerkit=debug")
    } else {
        EnvFilter::new("compilerkit=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .with_target(false)
        .without_time()
        .init();

    let config = cli.config.as_deref();

    // Execute command
    match cli.command {
        Commands::List(args) => commands::list::execute(args, config),
        Commands::Show(args) => commands::show::execute(args, config),
        Commands::Flags(args) => commands::flags::execute(args, config),
        Commands::Verify(args) => commands::verify::execute(args, config, color),
        Commands::Rpaths(args) => commands::rpaths::execute(args, config),
    }
}
