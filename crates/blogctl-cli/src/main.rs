use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod dispatch;
mod render;

use dispatch::run_cli;
use render::{exit_code_for, print_failure, resolve_output_style};

const LOG_ENV_VAR: &str = "BLOGCTL_LOG";

#[derive(Parser, Debug)]
#[command(name = "blogctl")]
#[command(about = "Manage a self-hosted blog instance", long_about = None)]
struct Cli {
    /// Instance root directory. Defaults to the working directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    #[arg(long, global = true, default_value = "production")]
    environment: String,
    /// System account that owns the content directory.
    #[arg(long, global = true)]
    service_user: Option<String>,
    #[arg(long, global = true)]
    migrator: Option<String>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run database migrations against the current release.
    Migrate,
    /// Run the migration step of an update for the already switched release.
    Update,
    /// Read or write an instance configuration key.
    Config { key: String, value: Option<String> },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Migrate => "migrate",
            Self::Update => "update",
            Self::Config { .. } => "config",
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_failure(&err, resolve_output_style());
            ExitCode::from(exit_code_for(&err))
        }
    }
}

#[cfg(test)]
mod tests;
