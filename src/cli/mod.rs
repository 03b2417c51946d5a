//! CLI module for playsync

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "playsync", about = "Keep Spotify playlists synced to local folders")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path of the playlist collection file
    #[arg(long, global = true, default_value = "playlists.json")]
    pub store: PathBuf,

    /// Directory of the cover cache
    #[arg(long, global = true, default_value = "cache/covers")]
    pub cache_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure Spotify API credentials
    Auth {
        /// Spotify application client id
        #[arg(long, env = "SPOTIFY_CLIENT_ID")]
        client_id: Option<String>,

        /// Spotify application client secret
        #[arg(long, env = "SPOTIFY_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Replace stored credentials
        #[arg(long)]
        force: bool,
    },

    /// Search a user's public playlists
    Search {
        /// Spotify user id ("default" resolves to the stored username)
        #[arg(value_name = "USERNAME", default_value = "default")]
        username: String,
    },

    /// Add a playlist to the managed collection
    Add {
        /// Playlist id or share URL
        #[arg(value_name = "PLAYLIST")]
        playlist: String,
    },

    /// Show the managed collection in sync order
    List,

    /// Enable playlists for syncing
    Enable {
        /// Playlist id
        #[arg(value_name = "ID", required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Enable every playlist
        #[arg(long)]
        all: bool,
    },

    /// Exclude playlists from syncing
    Disable {
        /// Playlist id
        #[arg(value_name = "ID", required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Disable every playlist
        #[arg(long)]
        all: bool,
    },

    /// Remove a playlist and its cached cover
    Remove {
        /// Playlist id
        #[arg(value_name = "ID")]
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Move a playlist to a new position in the sync order
    SetPriority {
        /// Playlist id
        #[arg(value_name = "ID")]
        id: String,

        /// New priority; lower syncs earlier
        #[arg(value_name = "PRIORITY")]
        priority: u32,
    },

    /// Set the username used by search
    SetUser {
        #[arg(value_name = "USERNAME")]
        username: String,
    },

    /// Download enabled playlists (or one playlist) to local folders
    Sync {
        /// Playlist id; omitted syncs every enabled playlist
        #[arg(value_name = "ID")]
        id: Option<String>,

        /// Output directory for playlist folders
        #[arg(short, long, default_value = "playlists")]
        output: PathBuf,

        /// Track download program
        #[arg(long, default_value = crate::resolver::DEFAULT_PROGRAM)]
        spotdl: String,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
