//! CLI for the depot download client.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use depot_core::config;
use std::path::PathBuf;

use commands::{run_checksum, run_completions, run_get};

/// Top-level CLI for the depot download client.
#[derive(Debug, Parser)]
#[command(name = "depot")]
#[command(about = "depot: segmented parallel download client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a file with concurrent ranged requests.
    Get {
        /// Direct HTTP/HTTPS URL to download.
        url: String,

        /// Output path (defaults to a name derived from the URL).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Override the configured chunk count for this download.
        #[arg(long, value_name = "N")]
        chunks: Option<usize>,

        /// Verify the completed file against this SHA-256 digest.
        #[arg(long, value_name = "HEX")]
        sha256: Option<String>,
    },

    /// Compute SHA-256 of a file (e.g. after download).
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: clap_complete::Shell,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Get {
                url,
                output,
                chunks,
                sha256,
            } => {
                let mut cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                if let Some(n) = chunks {
                    cfg.chunk_count = n.max(1);
                }
                run_get(cfg, &url, output, sha256.as_deref())
            }
            CliCommand::Checksum { path } => run_checksum(&path),
            CliCommand::Completions { shell } => {
                run_completions(shell);
                Ok(())
            }
        }
    }
}
