//! sysexec - command-line front end for systemcalls
//!
//! Exit status is 0 when the child exited 0, 1 otherwise. Status lines go to
//! stderr so the child's stdout passes through untouched.

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use systemcalls::{service_with, ExecConfig, ExecService};

#[derive(Parser, Debug)]
#[command(name = "sysexec")]
#[command(about = "Run a command through the shell, directly, or with stdout redirected", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Command interpreter for `shell` (overrides SYSTEMCALLS_SHELL)
    #[arg(long, global = true)]
    shell: Option<String>,

    /// Suppress the status line
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a command line through the shell
    Shell {
        /// Command line, interpreted by the shell
        command: String,
    },

    /// Run an executable by absolute path, without a shell
    Exec {
        /// Absolute path of the executable
        path: String,

        /// Arguments, passed verbatim
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run an executable with its stdout written to a file
    Redirect {
        /// File receiving stdout (created or truncated)
        #[arg(short, long)]
        output: PathBuf,

        /// Absolute path of the executable
        path: String,

        /// Arguments, passed verbatim
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Check whether the shell can be launched
    CheckShell,

    /// Print the effective configuration as JSON
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging() {
        eprintln!("{} {:#}", "warning:".yellow(), e);
    }

    let quiet = cli.quiet;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !quiet {
                eprintln!("{} {:#}", "✗".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(shell: Option<String>) -> Result<ExecConfig> {
    let mut config = ExecConfig::from_env().context("Invalid SYSTEMCALLS_* environment")?;
    if let Some(shell) = shell {
        config.shell = shell;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let service = service_with(load_config(cli.shell)?);

    if let Some(label) = execute(&service, &cli.command)? {
        if !cli.quiet {
            eprintln!("{} {}", "✓".green().bold(), label);
        }
    }
    Ok(())
}

/// Run the subcommand, returning a status label for commands that launch a child
fn execute(service: &ExecService, command: &Commands) -> Result<Option<String>> {
    let label = match command {
        Commands::Shell { command } => {
            service
                .try_shell_exec(command)
                .with_context(|| format!("shell command failed: {command}"))?;
            command.clone()
        }

        Commands::Exec { path, args } => {
            service
                .try_direct_exec(path, args.as_slice())
                .with_context(|| format!("{path} failed"))?;
            path.clone()
        }

        Commands::Redirect { output, path, args } => {
            service
                .try_redirect_exec(path, args.as_slice(), output)
                .with_context(|| format!("{path} > {} failed", output.display()))?;
            format!("{path} > {}", output.display())
        }

        Commands::CheckShell => {
            anyhow::ensure!(
                service.shell_available(),
                "shell {} is not available",
                service.config().shell
            );
            format!("shell {} is available", service.config().shell)
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(service.config())?);
            return Ok(None);
        }
    };

    Ok(Some(label))
}
