#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_lines)]

mod commands;
mod logging;

use clap::Parser;
use extbundle_core::{Config, Vendor};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "extbundle")]
#[command(author, version, about = "Browser-extension packaging with live reload", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Build the extension once
    Build {
        /// Target browser (chrome, firefox, opera, edge, safari)
        #[arg(long)]
        vendor: Option<Vendor>,

        /// Path to the config file (default: extbundle.config.json or extbundle.json)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Emit the manifest without structural validation
        #[arg(long)]
        skip_validation: bool,
    },

    /// Watch, rebuild on change and live-reload the extension
    Dev {
        /// Target browser (chrome, firefox, opera, edge, safari)
        #[arg(long)]
        vendor: Option<Vendor>,

        /// Path to the config file
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Reload server port (default: 35729)
        #[arg(long)]
        port: Option<u16>,

        /// Reload server host (default: localhost)
        #[arg(long)]
        host: Option<String>,

        /// Do not inject the reload client or start the reload server
        #[arg(long)]
        no_reload: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Build {
            vendor,
            config: config_path,
            skip_validation,
        }) => {
            let action = commands::build::BuildAction {
                cwd: config.cwd,
                vendor,
                config: config_path,
                skip_validation,
            };
            commands::build::run(action, cli.json)
        }
        Some(Commands::Dev {
            vendor,
            config: config_path,
            port,
            host,
            no_reload,
        }) => {
            if cli.json {
                eprintln!("error: dev does not support --json output");
                std::process::exit(2);
            }
            let action = commands::dev::DevAction {
                cwd: config.cwd,
                vendor,
                config: config_path,
                port,
                host,
                no_reload,
            };
            let rt = tokio::runtime::Runtime::new().into_diagnostic()?;
            rt.block_on(commands::dev::run(action))
        }
    }
}
