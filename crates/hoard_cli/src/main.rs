//! Hoard CLI - mirror every repository you own, star, or belong to.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::list::OutputFormat;
use crate::commands::sync::SyncArgs;

#[derive(Parser)]
#[command(name = "hoard")]
#[command(version)]
#[command(about = "Mirror every repository you own, star, or belong to")]
#[command(
    long_about = "Hoard enumerates the repositories you own, have starred, or can access \
through organisations on GitHub and GitLab (including self-hosted instances), and keeps \
a local git mirror of each one under a single root directory."
)]
#[command(after_long_help = r#"EXAMPLES
    Mirror everything in the configuration:
        $ hoard sync

    Use a specific config file and more parallel clones:
        $ hoard --config ~/mirror.toml sync --concurrency 8

    List what would be mirrored, as JSON lines:
        $ hoard list --output json

    Write a starting configuration:
        $ hoard example-config > ~/.config/hoard/config.toml

CONFIGURATION
    Hoard reads configuration from (later entries win):
      1. ~/.config/hoard/config.toml (or $XDG_CONFIG_HOME/hoard/config.toml)
      2. ./hoard.toml
      3. --config <file> (TOML, or JSON for *.json)
      4. Environment variables (HOARD_ prefix, __ between section and key)
      5. .env file in current directory

ENVIRONMENT VARIABLES
    HOARD_GENERAL__ROOT        Mirror root directory
    HOARD_GENERAL__BLACKLIST   Comma-separated names or namespaces to skip
    HOARD_GITHUB__API_KEY      GitHub personal access token
    HOARD_GITLAB__API_KEY      GitLab personal access token
    HOARD_GITLAB__HOST         GitLab host (default: gitlab.com)
    RUST_LOG                   Log filter (default: hoard=info,hoard_cli=info)
"#)]
struct Cli {
    /// Configuration file (TOML, or JSON when the extension is .json)
    #[arg(short = 'C', long, global = true, env = "HOARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every configured source and clone or update each mirror
    Sync {
        #[command(flatten)]
        args: SyncArgs,
    },
    /// Print every repository the configured sources return
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Check the configuration without contacting any provider
    Validate,
    /// Print an example configuration file
    ExampleConfig,
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Commands that report progress through tracing even on a terminal.
fn uses_log_progress(command: &Commands) -> bool {
    matches!(command, Commands::List { .. })
}

fn init_tracing() {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("hoard=info,hoard_cli=info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Interactive terminals get progress bars instead of log lines, except
    // for `list`, whose stdout is the listing itself.
    if !Term::stdout().is_term() || uses_log_progress(&cli.command) {
        init_tracing();
    }

    // Handle commands that don't need configuration first
    match &cli.command {
        Commands::Completions { shell } => return commands::meta::handle_completions(*shell),
        Commands::Man { output } => return commands::meta::handle_man(output.clone()),
        Commands::ExampleConfig => return commands::meta::handle_example_config(),
        _ => {}
    }

    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync { args } => {
            let cancel = shutdown::setup_shutdown_handler();
            commands::sync::handle_sync(args, config, cancel).await?;
        }
        Commands::List { output } => {
            let cancel = shutdown::setup_shutdown_handler();
            commands::list::handle_list(output, config, cancel).await?;
        }
        Commands::Validate => {
            commands::validate::handle_validate(&config)?;
        }
        Commands::ExampleConfig | Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    Ok(())
}
