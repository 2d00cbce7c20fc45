//! Tablechat - terminal chat client
//!
#![doc = "Tablechat - terminal chat client"]
#![doc = "Main entry point for the Tablechat application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tablechat::cli::{Cli, Commands};
use tablechat::commands;
use tablechat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { search, session } => {
            if search {
                tracing::debug!("Web search enabled from the command line");
            }
            if let Some(id) = &session {
                tracing::debug!("Opening session: {}", id);
            }

            commands::chat::run_chat(config, search, session).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::info!("Starting sessions command");
            commands::sessions::handle_sessions(&config, command)?;
            Ok(())
        }
        Commands::Search {
            query,
            max_results,
            json,
        } => {
            tracing::info!("Starting search command");
            commands::search::run_search(&config, &query, max_results, json).await?;
            Ok(())
        }
        Commands::Report { output } => {
            tracing::info!("Starting report download");
            commands::report::run_report(&config, output).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never interleave with a streamed reply.
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "tablechat=debug"
    } else {
        "tablechat=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
