//! CLI command implementations

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::Shell;
use colored::Colorize;
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::cli::Cli;
use crate::library::{CoverCache, PlaylistStore, cover_via_cache};
use crate::resolver::{SpotdlResolver, playlist_id_from_url};
use crate::search;
use crate::spotify::{PlaylistSource, SpotifyClient, SpotifyCredentials};
use crate::sync::SyncEngine;
use crate::tasks::{TaskEvent, TaskOutcome, TaskSlot};

fn build_client() -> Result<Arc<SpotifyClient>> {
    let credentials = SpotifyCredentials::load()?;
    Ok(Arc::new(SpotifyClient::new(credentials)?))
}

fn finish_line(operation: &str, outcome: TaskOutcome) -> Result<()> {
    match outcome {
        TaskOutcome::Success => {
            println!("{}", format!("{operation} complete.").green());
            Ok(())
        }
        TaskOutcome::PartialFailure => {
            println!(
                "{}",
                format!("{operation} finished with errors (see log output).").yellow()
            );
            Ok(())
        }
        TaskOutcome::Cancelled => {
            println!("{}", format!("{operation} cancelled.").yellow());
            Ok(())
        }
        TaskOutcome::FatalError => anyhow::bail!("{operation} failed"),
    }
}

/// Configure and verify Spotify API credentials
pub async fn auth(
    client_id: Option<String>,
    client_secret: Option<String>,
    force: bool,
) -> Result<()> {
    if !force && client_id.is_none() && client_secret.is_none() && SpotifyCredentials::load().is_ok()
    {
        println!("{}", "Credentials already configured.".green());
        println!("Use {} to replace them.", "playsync auth --force".cyan());
        return Ok(());
    }

    println!("{}", "Configuring Spotify API credentials...".cyan());

    let client_id = client_id.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Client ID")
            .interact_text()
            .expect("Failed to read client id")
    });
    let client_secret = client_secret.unwrap_or_else(|| {
        Password::new()
            .with_prompt("Client secret")
            .interact()
            .expect("Failed to read client secret")
    });

    let credentials = SpotifyCredentials {
        client_id,
        client_secret,
    };

    let client = SpotifyClient::new(credentials.clone())?;
    client
        .verify()
        .await
        .context("Credential check against the Spotify API failed")?;

    credentials.save()?;

    println!();
    println!("{}", "Authentication successful!".green().bold());
    println!(
        "Credentials stored in {}",
        SpotifyCredentials::config_path()?.display()
    );
    Ok(())
}

/// Search a user's public playlists and print each hit
pub async fn search_playlists(
    store: Arc<PlaylistStore>,
    cache: Arc<CoverCache>,
    username: String,
) -> Result<()> {
    let source: Arc<dyn PlaylistSource> = build_client()?;

    let mut slot = TaskSlot::new("search");
    let mut rx = slot.start({
        let store = store.clone();
        let cache = cache.clone();
        move |ctx| search::run_search(ctx, store, cache, source, username)
    })?;

    let mut found = 0usize;
    let mut outcome = TaskOutcome::Success;
    while let Some(event) = rx.recv().await {
        match event {
            TaskEvent::UsernameUpdated(username) => {
                println!("{} {}", "Username set to".yellow(), username.bold());
            }
            TaskEvent::PlaylistFound { record, .. } => {
                found += 1;
                println!(
                    "  {}  {} by {} ({} tracks)",
                    record.id.dimmed(),
                    record.title.bold(),
                    record.owner,
                    record.total_tracks
                );
            }
            TaskEvent::Finished(o) => outcome = o,
            _ => {}
        }
    }

    println!();
    println!(
        "{} playlist(s) found. Add one with {}.",
        found,
        "playsync add <id>".cyan()
    );
    finish_line("Search", outcome)
}

/// Fetch a playlist's metadata and add it to the collection
pub async fn add_playlist(
    store: Arc<PlaylistStore>,
    cache: Arc<CoverCache>,
    playlist: String,
) -> Result<()> {
    let source: Arc<dyn PlaylistSource> = build_client()?;

    let id = if playlist.starts_with("http://") || playlist.starts_with("https://") {
        playlist_id_from_url(&playlist)?
    } else {
        playlist
    };

    println!("{}", "Fetching playlist metadata...".cyan());
    let item = source.get_playlist(&id).await?;
    let record = item.into_record();
    let cover = cover_via_cache(&cache, source.as_ref(), &record.id, record.cover_url.as_deref()).await;

    let mut slot = TaskSlot::new("add");
    let mut rx = slot.start({
        let store = store.clone();
        let cache = cache.clone();
        move |ctx| search::run_add(ctx, store, cache, record, cover)
    })?;

    let mut outcome = TaskOutcome::Success;
    while let Some(event) = rx.recv().await {
        match event {
            TaskEvent::PlaylistAdded { record, .. } => {
                println!(
                    "{} {} ({} tracks, priority {})",
                    "Added".green().bold(),
                    record.title.bold(),
                    record.total_tracks,
                    record.priority
                );
            }
            TaskEvent::Finished(o) => outcome = o,
            _ => {}
        }
    }

    finish_line("Add", outcome)
}

/// Print the collection in sync order
pub fn list(store: &PlaylistStore) {
    let collection = store.all();

    if collection.playlists.is_empty() {
        println!("{}", "No playlists in the collection yet.".yellow());
        println!("Run {} to find some.", "playsync search".cyan());
        return;
    }

    println!(
        "{}",
        format!("Playlists for '{}':", collection.username).bold()
    );
    for record in collection.ordered() {
        let state = if record.enabled {
            "enabled ".green()
        } else {
            "disabled".red()
        };
        println!(
            "  [{}] {:>3}  {}  {} by {} ({} tracks)",
            state,
            record.priority,
            record.id.dimmed(),
            record.title.bold(),
            record.owner,
            record.total_tracks
        );
    }
}

/// Enable or disable one record, or the whole collection
pub fn toggle(store: &PlaylistStore, id: Option<String>, all: bool, enabled: bool) -> Result<()> {
    let state = if enabled { "Enabled" } else { "Disabled" };

    if all {
        let mut collection = store.all();
        for record in &mut collection.playlists {
            record.enabled = enabled;
        }
        let count = collection.playlists.len();
        store.set_all(collection);
        println!("{} {} playlist(s).", state.green(), count);
        return Ok(());
    }

    let id = id.context("Provide a playlist id or --all")?;
    let mut record = store
        .get(&id)
        .with_context(|| format!("No playlist with id '{id}' in the collection"))?;
    record.enabled = enabled;
    let title = record.title.clone();
    store.set(record);
    println!("{} {}", state.green(), title.bold());
    Ok(())
}

/// Remove a playlist and invalidate its cover cache entry
pub fn remove(store: &PlaylistStore, cache: &CoverCache, id: &str, yes: bool) -> Result<()> {
    let record = store
        .get(id)
        .with_context(|| format!("No playlist with id '{id}' in the collection"))?;

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove '{}' from the collection?", record.title))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    if store.remove(id).is_some() {
        cache.delete(id);
        println!("{} {}", "Removed".green(), record.title.bold());
    }
    Ok(())
}

/// Reassign one playlist's position in the sync order
pub fn set_priority(store: &PlaylistStore, id: &str, priority: u32) -> Result<()> {
    if !store.set_priority(id, i64::from(priority)) {
        anyhow::bail!("No playlist with id '{id}' in the collection");
    }
    println!("Priority of {} set to {}.", id.dimmed(), priority);
    Ok(())
}

/// Persist the username used by search
pub fn set_user(store: &PlaylistStore, username: &str) {
    store.set_username(username);
    println!("Username set to {}.", username.bold());
}

/// Sync one playlist or every enabled playlist
pub async fn sync(
    store: Arc<PlaylistStore>,
    cache: Arc<CoverCache>,
    id: Option<String>,
    output: PathBuf,
    spotdl: String,
) -> Result<()> {
    let source: Arc<dyn PlaylistSource> = build_client()?;
    let resolver = Arc::new(SpotdlResolver::new(spotdl, source.clone()));
    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        cache.clone(),
        source,
        resolver,
        output,
    ));

    let mut slot = TaskSlot::new("sync");
    let mut rx = match id {
        Some(id) => {
            let record = store
                .get(&id)
                .with_context(|| format!("No playlist with id '{id}' in the collection"))?;
            slot.start(move |ctx| engine.sync_one(ctx, record))?
        }
        None => slot.start(move |ctx| engine.sync_all(ctx))?,
    };

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut outcome = TaskOutcome::Success;
    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    TaskEvent::Progress(message) => {
                        if let Some((position, total)) = message.position {
                            bar.set_length(total as u64);
                            bar.set_position(position as u64);
                        }
                        bar.set_message(message.text);
                    }
                    TaskEvent::Finished(o) => outcome = o,
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Cancellation requested");
                bar.set_message("Cancelling after the current track...");
                slot.cancel();
            }
        }
    }

    match outcome {
        TaskOutcome::Success | TaskOutcome::PartialFailure => {
            bar.finish_with_message("Sync complete");
            Ok(())
        }
        TaskOutcome::Cancelled => {
            bar.finish_with_message("Sync cancelled");
            Ok(())
        }
        TaskOutcome::FatalError => {
            bar.abandon_with_message("Sync failed");
            anyhow::bail!("sync failed; is spotdl installed and are credentials configured?")
        }
    }
}

/// Print shell completions to stdout
pub fn completion(shell: Shell) {
    clap_complete::generate(
        shell,
        &mut Cli::command(),
        "playsync",
        &mut std::io::stdout(),
    );
}
