use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;
use url::Url;

use crate::error::{Result, SpotifyCliError};
use crate::APPLICATION_NAME;

/// Settings for the whole process. Built once in `main` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: Url,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Config {
    /// Reads the config file (the explicit one, or the default one if it exists) and applies the
    /// `CLIENT_ID`, `CLIENT_SECRET` and `REDIRECT_URI` environment variables on top of it.
    pub fn load(explicit_path: Option<&Path>) -> Result<Config> {
        let file = match explicit_path {
            Some(path) => parse_config_file(path)?,
            None => match get_config_path() {
                Ok(config_path) => {
                    let path = config_path.join(CONFIG_FILENAME);
                    match parse_config_file(&path) {
                        Ok(file) => file,
                        Err(SpotifyCliError::IoError(e)) if e.kind() == io::ErrorKind::NotFound => {
                            debug!("No config file at {:?}, using environment only.", path);
                            ConfigFileV1::default()
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(reason) => {
                    debug!("{}", reason);
                    ConfigFileV1::default()
                }
            },
        };

        Self::resolve(file, |key| env::var(key).ok())
    }

    fn resolve<F>(file: ConfigFileV1, lookup_env: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |key: &str| lookup_env(key).filter(|value| !value.trim().is_empty());

        let client_id = from_env("CLIENT_ID")
            .or(file.client_id)
            .ok_or_else(|| {
                SpotifyCliError::Config(
                    "no client id: set CLIENT_ID or client_id in the config file".to_string(),
                )
            })?;
        let client_secret = from_env("CLIENT_SECRET").or(file.client_secret);
        let redirect_uri = from_env("REDIRECT_URI")
            .or(file.redirect_uri)
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());
        let redirect_uri = Url::parse(&redirect_uri).map_err(|e| {
            SpotifyCliError::Config(format!("invalid redirect uri {}: {}", redirect_uri, e))
        })?;

        Ok(Config {
            client_id,
            client_secret,
            redirect_uri,
            request_timeout: Duration::from_secs(
                file.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            max_retries: file.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            initial_backoff: Duration::from_millis(
                file.initial_backoff_millis
                    .unwrap_or(DEFAULT_INITIAL_BACKOFF_MILLIS),
            ),
        })
    }
}

fn parse_config_file(path: &Path) -> Result<ConfigFileV1> {
    let contents = fs::read_to_string(path)?;
    let file: ConfigFileV1 = toml::from_str(&contents)?;
    debug!("Loaded config file {:?}", path);
    Ok(file)
}

pub fn get_config_path() -> std::result::Result<PathBuf, String> {
    if let Ok(config_dir) = env::var("CONFIGURATION_DIRECTORY") {
        // Set by systemd for services with ConfigurationDirectory=.
        Ok(Path::new(&config_dir).to_path_buf())
    } else if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
        Ok(Path::new(&xdg_config_home).join(APPLICATION_NAME))
    } else if let Ok(home) = env::var("HOME") {
        Ok(Path::new(&home).join(".config").join(APPLICATION_NAME))
    } else {
        Err(
            "None of the environment vars CONFIGURATION_DIRECTORY, XDG_CONFIG_HOME or HOME is set."
                .to_string(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFileV1 {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    request_timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    initial_backoff_millis: Option<u64>,
}

const CONFIG_FILENAME: &str = "config.toml";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:7185";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 4;
const DEFAULT_INITIAL_BACKOFF_MILLIS: u64 = 1000;
