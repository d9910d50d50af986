//! CLI command handling.
//!
//! Provides subcommands for:
//! - Listing loaded tools (`list`)
//! - Validating definition files (`validate`)
//! - Printing a tool's argument schema (`schema`)
//! - Invoking a tool once (`call`)

mod tools;

use std::path::PathBuf;

use clap::{ColorChoice, Parser, Subcommand};

pub use tools::{parse_env_pair, run_command};

#[derive(Parser, Debug)]
#[command(name = "apiclaw")]
#[command(about = "Declarative HTTP tools for AI agents")]
#[command(
    long_about = "Loads tool definitions from <dir>/tools/ and runs them behind an egress guard.\n\
                  Examples:\n  apiclaw list\n  apiclaw call weather --params '{\"city\":\"Paris\"}'"
)]
#[command(version)]
#[command(color = ColorChoice::Auto)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base directory holding the tools/ subdirectory (overrides HTTP_TOOLS_DIR)
    #[arg(short, long, global = true)]
    pub dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List valid tool definitions
    List {
        /// Show method, timeout and allowed hosts
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate every definition file and report violations
    Validate,

    /// Print the argument schema of a tool
    Schema {
        /// Tool name
        name: String,
    },

    /// Invoke a tool once and print the execution result
    Call {
        /// Tool name
        name: String,

        /// Call arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Call-scoped environment override (repeatable)
        #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,
    },
}
