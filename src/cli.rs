use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "hipops")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Resolve a deployment configuration and dispatch its playbooks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve the configuration and run every playbook in order
    Run(RunArgs),

    /// Print the (resolved) configuration
    Show(ShowArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Run
// ============================================================================

#[derive(Args)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Inventory hosts passed to every playbook
    #[arg(short = 'h', long)]
    pub hosts: String,

    /// Configuration file (JSON, or TOML by extension)
    #[arg(short, long, env = "HIPOPS_CONFIG", default_value = "./config.json")]
    pub config: PathBuf,

    /// Directory prefix joined to each playbook file
    #[arg(
        short,
        long = "playbook-path",
        env = "HIPOPS_PLAYBOOK_PATH",
        default_value = "../../playbooks/"
    )]
    pub playbook_path: String,

    /// SSH private key passed to every playbook
    #[arg(short = 'k', long, env = "HIPOPS_PRIVATE_KEY", default_value = "")]
    pub private_key: String,

    /// Playbook executable
    #[arg(long, env = "HIPOPS_PROGRAM", default_value = "ansible-playbook")]
    pub program: String,

    /// Verbosity flag appended to every playbook command
    #[arg(long, default_value = "-vvvvv", allow_hyphen_values = true)]
    pub verbosity: String,

    /// Kill a playbook that runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Render missing fields and unknown apps as empty instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Pass `-e` values without quoting
    #[arg(long)]
    pub raw_vars: bool,

    /// Print the commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Only run the playbook with this name or play file
    #[arg(long, value_name = "NAME")]
    pub only: Option<String>,

    /// Stop after the first failed playbook
    #[arg(long)]
    pub fail_fast: bool,

    /// Ask before running anything
    #[arg(long)]
    pub confirm: bool,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}

// ============================================================================
// Show
// ============================================================================

#[derive(Args)]
pub struct ShowArgs {
    /// Configuration file (JSON, or TOML by extension)
    #[arg(short, long, env = "HIPOPS_CONFIG", default_value = "./config.json")]
    pub config: PathBuf,

    /// Show the document as loaded, before app names and data are resolved
    #[arg(long)]
    pub raw: bool,

    /// Print pretty JSON instead of a field listing
    #[arg(long)]
    pub json: bool,

    /// Tolerate unresolvable app templates
    #[arg(long)]
    pub lenient: bool,
}
