// Copyright 2026 Vitrine Contributors
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

mod cli;
mod config;
mod download;
mod error;
mod harvest;
mod mirror;
mod outline;
mod paths;
mod renderer;
mod report;

#[derive(Parser)]
#[command(
    name = "vitrine",
    about = "Vitrine — mirror bot-protected gallery sites through a live browser session",
    version,
    after_help = "Run 'vitrine <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror a gallery site into a local directory tree
    Mirror {
        /// Landing page URL of the gallery
        url: String,
        /// Output directory root
        #[arg(long, default_value = "mirrored")]
        out: PathBuf,
        /// JSON file of manual section overrides
        #[arg(long)]
        overrides: Option<PathBuf>,
        /// Heading token that never becomes a section name (repeatable)
        #[arg(long = "skip-heading")]
        skip_headings: Vec<String>,
        /// Delay between subsection visits in milliseconds
        #[arg(long, default_value = "1000")]
        delay_ms: u64,
        /// Minimum byte size for a file to count as real content
        #[arg(long, default_value = "1000")]
        min_bytes: u64,
        /// Navigation and in-page fetch timeout in milliseconds
        #[arg(long, default_value = "30000")]
        timeout_ms: u64,
    },
    /// Discover and print the section outline without downloading
    Outline {
        /// Landing page URL of the gallery
        url: String,
        /// JSON file of manual section overrides
        #[arg(long)]
        overrides: Option<PathBuf>,
        /// Heading token that never becomes a section name (repeatable)
        #[arg(long = "skip-heading")]
        skip_headings: Vec<String>,
        /// Print the outline as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Mirror {
            url,
            out,
            overrides,
            skip_headings,
            delay_ms,
            min_bytes,
            timeout_ms,
        } => {
            cli::mirror_cmd::run(
                &url,
                &out,
                overrides.as_deref(),
                &skip_headings,
                delay_ms,
                min_bytes,
                timeout_ms,
            )
            .await
        }
        Commands::Outline {
            url,
            overrides,
            skip_headings,
            json,
        } => cli::outline_cmd::run(&url, overrides.as_deref(), &skip_headings, json).await,
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "vitrine", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}

fn init_tracing(verbose: bool, quiet: bool) {
    let directive = if verbose {
        "vitrine=debug"
    } else if quiet {
        "vitrine=warn"
    } else {
        "vitrine=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap()),
        )
        .init();
}
