use crate::file_io::model::Versioned;
use crate::http::spotify::auth::TokenResponse;
use crate::APPLICATION_NAME;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::{env, fs, io};
use ureq::serde_json;

pub fn store_spotify_token(token: &TokenResponse) -> io::Result<()> {
    let filename = get_spotify_token_filename()?;
    store_spotify_token_to_file(token, &filename)
}

pub fn get_spotify_token() -> io::Result<Option<TokenResponse>> {
    let filename = get_spotify_token_filename()?;
    get_spotify_token_from_file(&filename)
}

fn store_spotify_token_to_file(token: &TokenResponse, filename: &Path) -> io::Result<()> {
    let token = TokenResponseV1::from(token.clone());
    let token_as_json = serde_json::to_string(&token)?;
    let file = match File::create(filename) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if let Some(parent) = filename.parent() {
                fs::create_dir_all(parent)?;
            }
            File::create(filename)?
        }
        Err(e) => return Err(e),
    };
    let mut writer = BufWriter::new(file);
    writer.write_all(token_as_json.as_bytes())?;
    writer.flush()?;
    debug!("Stored Spotify token at {:?}", filename);

    Ok(())
}

fn get_spotify_token_from_file(filename: &Path) -> io::Result<Option<TokenResponse>> {
    let file = match File::open(filename) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            // This is not an error: on the first run, nobody has logged in yet.
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    let reader = BufReader::new(file);
    let token: TokenResponseV1 = serde_json::from_reader(reader)?;

    Ok(Some(token.into()))
}

fn get_spotify_token_filename() -> io::Result<PathBuf> {
    Ok(get_state_directory()?.join("spotify_token.json"))
}

fn get_state_directory() -> io::Result<PathBuf> {
    if let Ok(state_dir) = env::var("STATE_DIRECTORY") {
        // STATE_DIRECTORY is set if this application runs via systemd: More details here:
        // https://www.freedesktop.org/software/systemd/man/latest/systemd.exec.html#RuntimeDirectory=
        Ok(Path::new(&state_dir).to_path_buf())
    } else if let Ok(xdg_state_home) = env::var("XDG_STATE_HOME") {
        Ok(Path::new(&xdg_state_home).join(APPLICATION_NAME))
    } else if let Ok(home) = env::var("HOME") {
        Ok(Path::new(&home)
            .join(".local")
            .join("state")
            .join(APPLICATION_NAME))
    } else {
        Err(io::Error::new(
            ErrorKind::NotFound,
            "None of the environment vars STATE_DIRECTORY, XDG_STATE_HOME or HOME is set.",
        ))
    }
}

#[derive(Serialize, Deserialize)]
struct TokenResponseV1 {
    access_token: String,
    token_type: String,
    expires_in: usize,
    refresh_token: String,
}

impl Versioned<TokenResponse> for TokenResponseV1 {}

impl From<TokenResponse> for TokenResponseV1 {
    fn from(value: TokenResponse) -> Self {
        Self {
            access_token: value.access_token,
            token_type: value.token_type,
            expires_in: value.expires_in,
            refresh_token: value.refresh_token,
        }
    }
}

impl From<TokenResponseV1> for TokenResponse {
    fn from(value: TokenResponseV1) -> Self {
        Self {
            access_token: value.access_token,
            token_type: value.token_type,
            expires_in: value.expires_in,
            refresh_token: value.refresh_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> TokenResponse {
        TokenResponse {
            access_token: "BQDa9".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            refresh_token: "AQCx7".to_string(),
        }
    }

    #[test]
    fn store_and_load_token() {
        let dir = tempfile::tempdir().unwrap();
        // parent directories are created on demand
        let filename = dir.path().join("nested").join("spotify_token.json");

        store_spotify_token_to_file(&token(), &filename).unwrap();
        let loaded = get_spotify_token_from_file(&filename).unwrap();

        assert_eq!(loaded, Some(token()));
    }

    #[test]
    fn missing_token_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = get_spotify_token_from_file(&dir.path().join("spotify_token.json")).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn corrupt_token_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("spotify_token.json");
        fs::write(&filename, "{\"access_token\": 1").unwrap();
        assert!(get_spotify_token_from_file(&filename).is_err());
    }
}
