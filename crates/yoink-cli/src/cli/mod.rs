//! CLI for the yoink PDF fetcher.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use yoink_core::config;
use yoink_core::namer::NamingMode;

use commands::{run_checksum, run_history, run_status, run_update_command};

/// Top-level CLI for the yoink PDF fetcher.
#[derive(Debug, Parser)]
#[command(name = "yoink")]
#[command(about = "yoink: concurrent PDF fetcher with archive-on-change", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Output naming mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamingArg {
    /// Name files by entry id.
    ByItem,
    /// Name files by the PDF's embedded title.
    ByTitle,
}

impl From<NamingArg> for NamingMode {
    fn from(arg: NamingArg) -> Self {
        match arg {
            NamingArg::ByItem => NamingMode::ByItem,
            NamingArg::ByTitle => NamingMode::ByTitle,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch every manifest entry and archive changed documents.
    Run {
        /// Path to the TOML manifest.
        #[arg(long, default_value = "yoink.toml")]
        manifest: PathBuf,

        /// Output directory holding current files, history, and the index
        /// (default: current directory).
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Fetch up to N documents concurrently (default from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,

        /// How output files are named.
        #[arg(long, value_enum, default_value = "by-item")]
        naming: NamingArg,
    },

    /// Show the current archive records.
    Status {
        /// Output directory (default: current directory).
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Show the archived versions of one entry.
    History {
        /// Entry identifier.
        id: String,

        /// Output directory (default: current directory).
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Compute SHA-256 of a file (e.g. after download).
    Checksum {
        /// Path to the file.
        path: String,
    },
}

fn output_dir_or_cwd(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(d) => Ok(d),
        None => Ok(std::env::current_dir()?),
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                manifest,
                output_dir,
                jobs,
                naming,
            } => {
                let output_dir = output_dir_or_cwd(output_dir)?;
                run_update_command(&cfg, &manifest, &output_dir, jobs, naming.into()).await?;
            }
            CliCommand::Status { output_dir } => {
                run_status(&output_dir_or_cwd(output_dir)?)?;
            }
            CliCommand::History { id, output_dir } => {
                run_history(&output_dir_or_cwd(output_dir)?, &id)?;
            }
            CliCommand::Checksum { path } => run_checksum(Path::new(&path))?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
