//! yrc-canteen: fetch the YRC canteen balance from the command line.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use yrc_canteen::{RetrievalMode, Retriever, Snapshot};
use yrc_canteen_cli::config::{Overrides, Settings};
use yrc_canteen_cli::output::{render_json, render_profiles, render_text};

/// Exit status when `--fail-on-error` is set and the retrieval failed.
const EXIT_RETRIEVAL_FAILED: i32 = 2;

#[derive(Parser)]
#[command(
    name = "yrc-canteen",
    about = "Show the YRC canteen balance for a student account",
    version
)]
struct Cli {
    /// Path to a settings JSON file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Portal username (student ID).
    #[arg(short, long)]
    username: Option<String>,

    /// Portal password.
    #[arg(short, long)]
    password: Option<String>,

    /// Portal profile (current, legacy).
    #[arg(long)]
    profile: Option<String>,

    /// Override the portal base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Minutes until the next refresh is due.
    #[arg(long)]
    refresh_minutes: Option<u32>,

    /// Print the snapshot as JSON.
    #[arg(long)]
    json: bool,

    /// Shorthand for `--log-level debug`.
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Exit with status 2 when the retrieval ends in a failure tag.
    #[arg(long)]
    fail_on_error: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve the balance (default).
    Balance,

    /// Retrieve balance, top-up, and expense totals.
    Summary,

    /// List the built-in portal profiles.
    Profiles,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   yrc-canteen completions bash > ~/.local/share/bash-completion/completions/yrc-canteen
    ///   yrc-canteen completions zsh > ~/.zfunc/_yrc-canteen
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mode = match cli.command.as_ref().unwrap_or(&Commands::Balance) {
        Commands::Balance => RetrievalMode::Balance,
        Commands::Summary => RetrievalMode::Summary,
        Commands::Profiles => {
            print!("{}", render_profiles());
            return Ok(());
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "yrc-canteen", &mut std::io::stdout());
            return Ok(());
        }
    };

    let overrides = Overrides {
        username: cli.username.clone(),
        password: cli.password.clone(),
        refresh_minutes: cli.refresh_minutes,
        profile: cli.profile.clone(),
        base_url: cli.base_url.clone(),
    };
    let settings = Settings::load(overrides, cli.settings.as_deref())?;
    tracing::debug!(?settings, "resolved settings");

    let credentials = settings.credentials()?;
    let profile = settings.portal_profile()?;
    let retriever = Retriever::new(profile, settings.client_options())?;

    let result = retriever.retrieve(&credentials, mode).await;
    let snapshot = Snapshot::build(
        &result,
        retriever.profile(),
        &settings.schedule(),
        chrono::Utc::now(),
    );

    if cli.json {
        println!("{}", render_json(&snapshot)?);
    } else {
        print!("{}", render_text(&snapshot));
    }

    if snapshot.failed && cli.fail_on_error {
        std::process::exit(EXIT_RETRIEVAL_FAILED);
    }

    Ok(())
}
