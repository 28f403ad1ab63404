/// CLI argument parsing and command handling

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::project::PullPolicy;

// Build timestamp injected at compile time
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "devmate")]
#[command(author, version = VERSION_WITH_BUILD, about = "Your friendly local development companion.", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Version of devmate
    Version,

    /// About devmate
    About,

    /// Check that git, docker and python are installed
    Init {
        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check if an HTTP endpoint is running and responding
    Health {
        /// URL to check
        #[arg(short, long, default_value = "http://localhost")]
        url: String,

        /// Path to check
        #[arg(short, long, default_value = "/")]
        path: String,

        /// Port to check
        #[arg(short = 'P', long)]
        port: Option<u16>,

        /// Maximum number of attempts
        #[arg(short = 'r', long)]
        max_retries: Option<u32>,

        /// Request timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Delay between attempts in seconds
        #[arg(short, long)]
        delay: Option<u64>,
    },

    /// Clone a git repository
    Clone {
        /// URL of the git repository to clone
        url: String,

        /// Directory where the repository will be cloned
        #[arg(short, long = "dir", alias = "directory")]
        dir: Option<PathBuf>,
    },

    /// Bring up a Compose or Dockerfile project and report service health
    Up(UpArgs),

    /// Clone a repository and bring it up
    Deploy {
        /// The Git URL to clone
        repo_url: String,

        /// Custom folder name for the clone
        #[arg(short, long)]
        name: Option<String>,

        /// Specific branch to clone
        #[arg(short, long)]
        branch: Option<String>,

        /// Port mappings to pass to the up command
        #[arg(short = 'p', long = "port")]
        ports: Vec<String>,

        /// Force rebuild/restart
        #[arg(short, long)]
        force: bool,

        /// Location of the config files inside the repository
        #[arg(short, long, default_value = ".")]
        location: PathBuf,
    },

    /// Show project or container logs
    Logs {
        /// Path to the project directory
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Number of lines to show
        #[arg(short, long, default_value = "100")]
        tail: usize,

        /// Follow log output
        #[arg(short, long)]
        follow: bool,

        /// Container name
        #[arg(short, long)]
        container: Option<String>,
    },

    /// Report service health of a running Compose project without starting it
    Status {
        /// Path where the compose file is present
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Compose file name inside the project directory
        #[arg(long)]
        file: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Clone, Debug)]
pub struct UpArgs {
    /// Path where the config file is present
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Compose file name inside the project directory
    #[arg(long)]
    pub file: Option<String>,

    /// Port mappings in HOST:CONTAINER format (e.g. -p 8080:80)
    #[arg(short = 'p', long = "port")]
    pub ports: Vec<String>,

    /// Pull policy for compose
    #[arg(long, value_enum)]
    pub pull: Option<PullPolicy>,

    /// Force restart container
    #[arg(short, long)]
    pub force: bool,
}
