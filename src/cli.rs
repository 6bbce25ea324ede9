// src/cli.rs
//! CLI definitions for alpaca
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "alpaca")]
#[command(author = "Aleya Project")]
#[command(version)]
#[command(about = "AlpaCA - The Aleya Package Configuration Assistant", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Limit build and copy output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file to use instead of the default lookup
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install a package
    Install {
        /// Package to install (e.g. binutils, binutils/2.44 or binutils/2.44-1)
        package: String,

        /// Build the package from source, even if a prebuilt binary is available
        #[arg(short, long)]
        build: bool,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Show recipe information and the binary hash of a package
    Info {
        /// Package to describe (e.g. binutils, binutils/2.44 or binutils/2.44-1)
        package: String,

        #[command(flatten)]
        options: OptionArgs,
    },
}

/// Build option switches shared by commands that compute a fingerprint
#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Enable a build option (repeatable)
    #[arg(long = "with", value_name = "OPTION")]
    pub with: Vec<String>,

    /// Disable a build option (repeatable)
    #[arg(long = "without", value_name = "OPTION")]
    pub without: Vec<String>,
}
