//! # gopin CLI Entry Point
//!
//! Parses arguments with clap, builds the run [`Config`], and hands off to
//! the workflow for the chosen subcommand.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::PathBuf;

use gopin::commands;
use gopin::config::Config;
use gopin::loader::GoToolchain;
use gopin::vcs::VcsRegistry;

#[cfg(windows)]
#[link(name = "kernel32")]
unsafe extern "system" {
    fn SetConsoleOutputCP(wCodePageID: u32) -> i32;
}

/// Status glyphs are UTF-8.
#[cfg(windows)]
fn enable_utf8_console() {
    unsafe {
        SetConsoleOutputCP(65001);
    }
}

#[cfg(not(windows))]
fn enable_utf8_console() {}

#[derive(Parser)]
#[command(name = "gopin")]
#[command(about = "Pin and vendor Go dependencies", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Print diagnostic output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Run as if started in this directory
    #[arg(short = 'C', long = "dir", global = true, env = "GOPIN_DIR", value_name = "DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List and copy dependencies into Godeps
    Save {
        /// Build tags to honor when resolving imports
        #[arg(long)]
        tags: Option<String>,
        /// Packages to save (default: the package in the current directory)
        packages: Vec<String>,
    },
    /// Check out listed dependency versions in the workspace
    Restore,
    /// Re-pin dependencies at the revision checked out in the workspace
    Update {
        /// Import path patterns; `...` matches any string
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// List dependencies whose checkout differs from the pinned revision
    Outdated {
        /// Only check dependencies matching these patterns
        patterns: Vec<String>,
    },
    /// Show version information
    Version,
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() {
    enable_utf8_console();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "x".red(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let project_dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let mut config = Config::load(&project_dir)?;
    config.verbose = cli.verbose;
    log::debug!("{:?}", config);

    let mut registry = VcsRegistry::new();
    match cli.command {
        Commands::Save { tags, packages } => {
            if let Some(tags) = tags {
                config.set_tags(&tags);
            }
            let loader = GoToolchain::new(&config);
            commands::save::run(&config, &loader, &mut registry, &packages)?;
            Ok(())
        }
        Commands::Restore => {
            let loader = GoToolchain::new(&config);
            commands::restore::run(&config, &loader, &mut registry)
        }
        Commands::Update { patterns } => {
            let loader = GoToolchain::new(&config);
            commands::update::run(&config, &loader, &mut registry, &patterns)
        }
        Commands::Outdated { patterns } => {
            let loader = GoToolchain::new(&config);
            commands::outdated::run(&config, &loader, &mut registry, &patterns)
        }
        Commands::Version => {
            println!(
                "gopin v{} ({}/{})",
                env!("CARGO_PKG_VERSION"),
                config.goos,
                config.goarch
            );
            Ok(())
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}
