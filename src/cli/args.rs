//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Org chart editor: build, rearrange and persist a reporting hierarchy
#[derive(Parser, Debug)]
#[command(name = "orgview")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file, applied on top of the global config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the chart and the unassigned list
    Show {
        /// Print the stored record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a direct report
    Add {
        /// Manager id
        parent: String,
        /// Display name
        name: String,
        /// Role/title
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Rename a person
    Rename {
        /// Node id
        id: String,
        /// New display name
        name: String,
    },

    /// Set or clear a role/title
    Role {
        /// Node id
        id: String,
        /// New role (omit to clear)
        role: Option<String>,
    },

    /// Remove a person and everyone reporting to them
    Delete {
        /// Node id
        id: String,
    },

    /// Move a person (or an unassigned person) in the chart
    Move {
        /// Node id or unassigned person id
        id: String,
        /// Drop target id: new manager, or sibling with --before
        target: String,
        /// Insert before the target instead of under it
        #[arg(short, long)]
        before: bool,
    },

    /// Load the direct reports of a collapsed node
    Expand {
        /// Node id
        id: String,
    },

    /// Manage the unassigned list
    Pool {
        #[command(subcommand)]
        command: PoolCommands,
    },

    /// Discard the stored chart and start from the default
    Reset,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum PoolCommands {
    /// List unassigned people
    List,

    /// Add a person to the unassigned list
    Add {
        /// Display name
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config and data paths
    Path,

    /// Create config template
    Init {
        /// Create global config (default: print template to stdout)
        #[arg(short, long)]
        global: bool,
    },
}
