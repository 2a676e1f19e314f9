//! Command-Line Interface

use crate::synthesis::model::ModelTier;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mimic - Record a desktop task once, replay it as a skill
#[derive(Parser, Debug)]
#[command(name = "mimic")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start recording a task (runs until stopped or timed out)
    Start {
        /// Task name (becomes the skill name)
        task: String,

        /// Blur every screenshot before it is saved
        #[arg(short, long)]
        privacy: bool,

        /// Compile the recording as soon as it ends
        #[arg(short = 'c', long)]
        auto_compile: bool,

        /// Skip the consent prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Stop the active recording
    Stop,

    /// Show whether a recording is in progress
    Status,

    /// Remove a stale session marker
    Clear,

    /// Compile a recording into SKILL.md
    Compile {
        /// Task name
        task: String,

        /// Model tier
        #[arg(short, long, value_enum)]
        model: Option<ModelTier>,

        /// Only print the estimated cost; nothing is sent
        #[arg(long)]
        cost_estimate: bool,
    },

    /// List recorded tasks
    List,

    /// Check capture backend, credential and skills directory
    Test,

    /// View or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
