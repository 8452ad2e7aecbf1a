use std::io;
use std::path::PathBuf;
use std::process::exit;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::{Result, SpotifyCliError};
use crate::http::spotify::client::SpotifyClient;
use crate::playlist::{operations, shuffle, sync};

#[macro_use]
extern crate log;

mod config;
mod error;
mod file_io;
mod http;
mod model;
mod playlist;

const APPLICATION_NAME: &str = "spotifycli";

#[derive(Parser)]
#[command(name = "spotifycli", version, about = "Manage Spotify playlists from the command line")]
struct Cli {
    /// Path to a TOML config file (default: $XDG_CONFIG_HOME/spotifycli/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a playlist with tracks from stdin, one `artist:track` per line
    Create {
        /// The name of the playlist
        #[arg(long)]
        playlist: Option<String>,
        /// Abort on the first line without a matching track instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Create a playlist from liked songs, replacing an existing one of the same name
    #[command(name = "createfromliked")]
    CreateFromLiked {
        /// The name of the playlist
        #[arg(long)]
        playlist: Option<String>,
    },
    /// Remove a playlist
    Remove {
        /// The name of the playlist
        #[arg(long)]
        playlist: Option<String>,
    },
    /// Make a playlist contain exactly the liked songs
    #[command(name = "syncwithliked")]
    SyncWithLiked {
        /// The name of the playlist
        #[arg(long)]
        playlist: Option<String>,
        /// Only print what would be added and removed
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the tracks of a playlist
    Dump {
        /// The name of the playlist
        #[arg(long)]
        playlist: Option<String>,
    },
    /// Shuffle the order of a playlist on Spotify
    Shuffle {
        /// The name of the playlist
        #[arg(long)]
        playlist: Option<String>,
    },
    /// Authorize spotifycli again, e.g. after the stored token was revoked
    Login,
}

impl Command {
    /// The playlist name for commands that need one. Checked before anything talks to Spotify.
    fn playlist_name(&self) -> Result<Option<&str>> {
        let playlist = match self {
            Command::Create { playlist, .. }
            | Command::CreateFromLiked { playlist }
            | Command::Remove { playlist }
            | Command::SyncWithLiked { playlist, .. }
            | Command::Dump { playlist }
            | Command::Shuffle { playlist } => playlist,
            Command::Login => return Ok(None),
        };
        match playlist.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(Some(name)),
            _ => Err(SpotifyCliError::MissingArgument("playlist")),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            if let Err(print_error) = e.print() {
                error!("Unable to print usage: {}", print_error);
            }
            exit(1);
        }
    };

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let playlist_name = cli.command.playlist_name()?;
    let config = Config::load(cli.config.as_deref())?;

    if let Command::Login = cli.command {
        SpotifyClient::reauthorize(&config)?;
        return Ok(());
    }
    let playlist_name = playlist_name.ok_or(SpotifyCliError::MissingArgument("playlist"))?;
    let mut client = SpotifyClient::login(&config)?;

    match &cli.command {
        Command::Create { strict, .. } => {
            let track_uris = operations::find_track_uris(&mut client, io::stdin().lock(), *strict)?;
            let playlist = operations::get_or_create_playlist(&mut client, playlist_name)?;
            operations::add_tracks_to_playlist(&mut client, &track_uris, &playlist)?;
            info!("added {} tracks to {}", track_uris.len(), playlist.name);
        }
        Command::CreateFromLiked { .. } => {
            let playlist = operations::recreate_playlist(&mut client, playlist_name)?;
            operations::create_from_liked(&mut client, &playlist)?;
        }
        Command::Remove { .. } => {
            operations::remove_playlist(&mut client, playlist_name)?;
        }
        Command::SyncWithLiked { dry_run, .. } => {
            let playlist = operations::require_playlist(&mut client, playlist_name)?;
            let report = sync::sync_liked_with_playlist(&mut client, &playlist, *dry_run)?;
            info!(
                "synced {}: {} added, {} removed",
                playlist.name, report.added, report.removed
            );
        }
        Command::Dump { .. } => {
            let playlist = operations::require_playlist(&mut client, playlist_name)?;
            operations::dump_playlist(&mut client, &playlist, &mut io::stdout().lock())?;
        }
        Command::Shuffle { .. } => {
            let playlist = operations::require_playlist(&mut client, playlist_name)?;
            shuffle::shuffle_playlist(&mut client, &playlist, &mut rand::thread_rng())?;
        }
        Command::Login => {}
    }

    Ok(())
}
