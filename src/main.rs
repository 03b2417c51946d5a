//! playsync - Keep Spotify playlists synced to local folders

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod library;
mod resolver;
mod search;
mod spotify;
mod sync;
mod tasks;
mod utils;

use cli::{Cli, Commands};
use library::{CoverCache, PlaylistStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "playsync=debug,reqwest=debug"
    } else {
        "playsync=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let store = Arc::new(PlaylistStore::open(&cli.store));
    let cache = Arc::new(CoverCache::new(&cli.cache_dir));

    match cli.command {
        Commands::Auth {
            client_id,
            client_secret,
            force,
        } => {
            cli::commands::auth(client_id, client_secret, force).await?;
        }
        Commands::Search { username } => {
            cli::commands::search_playlists(store, cache, username).await?;
        }
        Commands::Add { playlist } => {
            cli::commands::add_playlist(store, cache, playlist).await?;
        }
        Commands::List => {
            cli::commands::list(&store);
        }
        Commands::Enable { id, all } => {
            cli::commands::toggle(&store, id, all, true)?;
        }
        Commands::Disable { id, all } => {
            cli::commands::toggle(&store, id, all, false)?;
        }
        Commands::Remove { id, yes } => {
            cli::commands::remove(&store, &cache, &id, yes)?;
        }
        Commands::SetPriority { id, priority } => {
            cli::commands::set_priority(&store, &id, priority)?;
        }
        Commands::SetUser { username } => {
            cli::commands::set_user(&store, &username);
        }
        Commands::Sync { id, output, spotdl } => {
            cli::commands::sync(store, cache, id, output, spotdl).await?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
