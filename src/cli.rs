// src/cli.rs
//! CLI definitions for binresolve
//!
//! Keep in sync with `build.rs`, which renders the man page.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "binresolve")]
#[command(author = "Conary Contributors")]
#[command(version)]
#[command(about = "Decide where every package binary of a dependency graph comes from", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the binaries of a dependency graph
    Resolve {
        /// Graph file (TOML)
        #[arg(short, long)]
        graph: PathBuf,

        /// Configuration file (default: ~/.binresolve/config.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Build policy: no value forces everything; otherwise never,
        /// missing, outdated, or a glob over package references
        #[arg(short, long, num_args = 0.., value_name = "VALUE")]
        build: Option<Vec<String>>,

        /// Check remotes for newer binaries of cached packages
        #[arg(short, long)]
        update: bool,

        /// Only consult this remote
        #[arg(short, long)]
        remote: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}
