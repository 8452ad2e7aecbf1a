use std::io;

use thiserror::Error;

use crate::http::spotify::client::ClientError;

#[derive(Debug, Error)]
pub enum SpotifyCliError {
    #[error("missing required argument --{0}")]
    MissingArgument(&'static str),
    #[error("no track found for artist '{artist}' and title '{title}'")]
    TrackNotFound { artist: String, title: String },
    #[error("expected a line of the form 'artist:track', got '{line}'")]
    InvalidInput { line: String },
    #[error("playlist '{0}' not found")]
    PlaylistNotFound(String),
    #[error("Spotify request failed: {0}")]
    Remote(#[from] ClientError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl From<toml::de::Error> for SpotifyCliError {
    fn from(error: toml::de::Error) -> Self {
        SpotifyCliError::Config(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SpotifyCliError>;
