//! Leetdeck main entry point
//!
//! This is the command-line interface for the Leetdeck mirror.

use anyhow::Context;
use clap::Parser;
use leetdeck::auth::CredentialStore;
use leetdeck::browser::WebDriverSession;
use leetdeck::config::{load_config_with_hash, Config};
use leetdeck::storage::SqliteStorage;
use leetdeck::sync::{QueryClient, Synchronizer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Leetdeck: an incremental LeetCode mirror
///
/// Leetdeck copies your accepted problems, their official solutions and
/// the source of your accepted submissions into a local SQLite store,
/// pacing every request, and renders the store into a markdown study deck.
#[derive(Parser, Debug)]
#[command(name = "leetdeck")]
#[command(version)]
#[command(about = "An incremental LeetCode mirror", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate and print the configuration without syncing
    #[arg(long, conflicts_with_all = ["stats", "export_deck"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_deck"])]
    stats: bool,

    /// Render the study deck from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_deck: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_deck {
        handle_export_deck(&config)?;
    } else {
        handle_sync(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("leetdeck=info,warn"),
            1 => EnvFilter::new("leetdeck=debug,info"),
            2 => EnvFilter::new("leetdeck=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Leetdeck Dry Run ===\n");

    println!("Remote:");
    println!("  Base URL: {}", config.remote.base_url);
    println!("  User agent: {}", config.remote.user_agent);

    println!("\nBrowser:");
    println!("  WebDriver: {}", config.browser.webdriver_url);
    println!("  Headless: {}", config.browser.headless);
    println!("  Login timeout: {}s", config.browser.login_timeout_secs);
    println!(
        "  Extraction timeout: {}s",
        config.browser.extraction_timeout_secs
    );
    println!("  Ready selector: {}", config.browser.ready_selector);

    println!("\nSync:");
    println!(
        "  Pacing: {:.1}s to {:.1}s",
        config.sync.min_pace_secs, config.sync.max_pace_secs
    );
    println!("  Max attempts: {}", config.sync.max_attempts);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Credentials: {}", config.output.credentials_path);
    println!("  Deck: {}", config.output.deck_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use leetdeck::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-deck mode: renders the markdown study deck
fn handle_export_deck(config: &Config) -> anyhow::Result<()> {
    use leetdeck::output::generate_deck;

    println!("=== Exporting Study Deck ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.deck_path);
    println!();

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    tracing::info!("Rendering deck from database...");
    let count = generate_deck(&storage, Path::new(&config.output.deck_path))?;

    println!(
        "✓ Deck with {} problems exported to: {}",
        count, config.output.deck_path
    );

    Ok(())
}

/// Handles the main synchronization
async fn handle_sync(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    let mut browser =
        WebDriverSession::start(&config.browser.webdriver_url, config.browser.headless)
            .await
            .with_context(|| {
                format!(
                    "Could not start a browser session at {}",
                    config.browser.webdriver_url
                )
            })?;

    let outcome = sync_with_browser(config, config_hash, &mut storage, &mut browser).await;

    if let Err(e) = browser.close().await {
        tracing::warn!("Failed to close browser session: {}", e);
    }

    outcome
}

async fn sync_with_browser(
    config: &Config,
    config_hash: &str,
    storage: &mut SqliteStorage,
    browser: &mut WebDriverSession,
) -> anyhow::Result<()> {
    let credentials = CredentialStore::new(&config.output.credentials_path);
    let login_url = format!(
        "{}/accounts/login",
        config.remote.base_url.trim_end_matches('/')
    );
    let context = match credentials
        .obtain_session(
            browser,
            &login_url,
            Duration::from_secs(config.browser.login_timeout_secs),
        )
        .await
    {
        Ok(context) => context,
        Err(e) => {
            tracing::error!("Login failed: {}, please try again", e);
            return Err(e.into());
        }
    };

    let client = QueryClient::new(&context, &config.remote)?;

    let report = Synchronizer::new(storage, browser, client, config)
        .run(config_hash)
        .await?;

    tracing::info!(
        "Run {} finished: {} accepted, {} new problems, {} solutions, {} submissions stored",
        report.run_id,
        report.accepted_problems,
        report.new_problems,
        report.solutions_stored,
        report.submissions_stored
    );
    if report.submission_list_failures > 0 {
        tracing::warn!(
            "{} problems had unreadable submission lists; rerun to retry them",
            report.submission_list_failures
        );
    }
    if report.submission_store_failures > 0 {
        tracing::warn!(
            "{} problems had submissions that could not be stored; rerun to retry them",
            report.submission_store_failures
        );
    }

    Ok(())
}
