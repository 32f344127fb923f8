//! CLI command implementations for lifcore

use clap::{Parser, Subcommand};

use crate::error::CliResult;

pub mod build_config;
pub mod inspect;
pub mod run;

/// lifcore - fixed-point LIF neuron processor
#[derive(Parser, Debug)]
#[command(
    name = "lifcore",
    version,
    about = "Fixed-point real-time LIF neuron processor",
    long_about = "Build binary parameter blocks from network descriptions, inspect them, \
                  and run them tick by tick through the neuron processor with spike, \
                  recording and profiler output."
)]
pub struct LifcoreCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a binary parameter block from a TOML network description
    #[command(alias = "build")]
    BuildConfig(build_config::BuildConfigCommand),

    /// Show the contents of a parameter block
    Inspect(inspect::InspectCommand),

    /// Run a parameter block through the neuron processor
    Run(run::RunCommand),
}

impl LifcoreCli {
    /// Execute the CLI command
    pub fn execute(self) -> CliResult<()> {
        match self.command {
            Commands::BuildConfig(cmd) => cmd.execute(),
            Commands::Inspect(cmd) => cmd.execute(),
            Commands::Run(cmd) => cmd.execute(),
        }
    }
}
