// CLI module for eventforge
// Author: kelexine (https://github.com/kelexine)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// eventforge - cost-aware event title and description generator
#[derive(Parser, Debug)]
#[command(name = "eventforge", version, about, long_about = None)]
pub struct Args {
    /// Config file (defaults to ~/.eventforge/config.toml)
    #[arg(long, global = true, env = "EVENTFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve,

    /// Generate event titles and print one per line
    Titles {
        #[command(flatten)]
        event: EventArgs,

        /// Number of titles (1-5)
        #[arg(short = 'n', long, default_value_t = 3)]
        count: u8,
    },

    /// Generate a description for an event title
    Describe {
        /// Event title to describe
        #[arg(long)]
        title: String,

        #[command(flatten)]
        event: EventArgs,

        /// Maximum description length in characters (100-5000)
        #[arg(long, default_value_t = 1000)]
        max_chars: u32,
    },
}

/// Fields shared by title and description requests.
#[derive(clap::Args, Debug)]
pub struct EventArgs {
    #[arg(long)]
    pub category: String,

    #[arg(long)]
    pub event_type: String,

    #[arg(long)]
    pub tone: String,

    /// Free-text context to steer the wording
    #[arg(long)]
    pub context: Option<String>,

    /// Keyword tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Cost mode: economy, balanced or premium (defaults to config)
    #[arg(long)]
    pub mode: Option<String>,
}
