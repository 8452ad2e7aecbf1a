use std::io;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use ureq::serde_json;

use crate::config::Config;
use crate::file_io::state;
use crate::http::spotify::auth::{self, TokenContainer};
use crate::http::spotify::model::{
    SpotifyPlaylistSimplified, SpotifyPlaylistTracks, SpotifySavedTracks, SpotifySearchResponse,
    SpotifySimplifiedPlaylistObject, SpotifySnapshotResponse, SpotifyUserObject,
};
use crate::model::{Page, Playlist, Track};
use crate::playlist::PlaylistService;

/// Blocking client for the handful of Spotify Web API endpoints spotifycli needs.
pub struct SpotifyClient {
    agent: ureq::Agent,
    token_container: TokenContainer,
    backoff: ExponentialBackoff,
    user_id: Option<String>,
}

impl SpotifyClient {
    /// Uses the stored token if there is one, otherwise asks the user to authorize spotifycli.
    pub fn login(config: &Config) -> ClientConnectionResult<Self> {
        let agent = build_agent(config);
        let token = match state::get_spotify_token()? {
            Some(token) => {
                debug!("Using stored Spotify token.");
                token
            }
            None => auth::authorize(&agent, config)?,
        };
        Ok(Self::new(config, agent, token))
    }

    /// Always runs the authorization flow, replacing any stored token.
    pub fn reauthorize(config: &Config) -> ClientConnectionResult<Self> {
        let agent = build_agent(config);
        let token = auth::authorize(&agent, config)?;
        Ok(Self::new(config, agent, token))
    }

    fn new(config: &Config, agent: ureq::Agent, token: auth::TokenResponse) -> Self {
        Self {
            token_container: TokenContainer::new(token, agent.clone(), config),
            agent,
            backoff: ExponentialBackoff::new(config.initial_backoff, config.max_retries),
            user_id: None,
        }
    }

    fn get<T>(&mut self, url: &str, query_params: &[(&str, &str)]) -> ClientConnectionResult<T>
    where
        T: DeserializeOwned,
    {
        let request = self
            .agent
            .get(url)
            .query_pairs(query_params.iter().copied());
        let response = request_with_auth(
            request,
            None,
            &mut self.token_container,
            RetryPolicy::Idempotent,
            false,
            self.backoff,
        )?;
        Ok(response.into_json::<T>()?)
    }

    fn send<T>(
        &mut self,
        method: &str,
        url: &str,
        body: &serde_json::Value,
        retry_policy: RetryPolicy,
    ) -> ClientConnectionResult<T>
    where
        T: DeserializeOwned,
    {
        let request = self.agent.request(method, url);
        let response = request_with_auth(
            request,
            Some(body),
            &mut self.token_container,
            retry_policy,
            false,
            self.backoff,
        )?;
        Ok(response.into_json::<T>()?)
    }

    fn current_user_id(&mut self) -> ClientConnectionResult<String> {
        if let Some(id) = &self.user_id {
            return Ok(id.clone());
        }
        let user: SpotifyUserObject = self.get(&format!("{}/me", API_BASE_URL), &[])?;
        self.user_id = Some(user.id.clone());
        Ok(user.id)
    }
}

impl PlaylistService for SpotifyClient {
    fn search_tracks(&mut self, query: &str) -> ClientConnectionResult<Vec<Track>> {
        let url = format!("{}/search", API_BASE_URL);
        let response: SpotifySearchResponse = self.get(
            &url,
            &[("q", query), ("type", "track"), ("limit", SEARCH_LIMIT)],
        )?;
        Ok(response
            .tracks
            .items
            .into_iter()
            .map(|track| track.into_track(None))
            .collect())
    }

    fn liked_tracks_page(&mut self, limit: u32, offset: u32) -> ClientConnectionResult<Page<Track>> {
        let url = format!("{}/me/tracks", API_BASE_URL);
        let (limit, offset) = (limit.to_string(), offset.to_string());
        let page: SpotifySavedTracks =
            self.get(&url, &[("limit", limit.as_str()), ("offset", offset.as_str())])?;
        Ok(page.into())
    }

    fn playlist_tracks_page(
        &mut self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> ClientConnectionResult<Page<Track>> {
        let url = format!("{}/playlists/{}/tracks", API_BASE_URL, playlist_id);
        let (limit, offset) = (limit.to_string(), offset.to_string());
        // Filter which fields we actually require, to keep the payload small.
        let fields = "limit,next,offset,total,\
            items(added_at,track(type,uri,name,is_local,artists(name)))";
        let page: SpotifyPlaylistTracks = self.get(
            &url,
            &[("limit", limit.as_str()), ("offset", offset.as_str()), ("fields", fields)],
        )?;
        Ok(page.into())
    }

    fn playlists_page(&mut self, limit: u32, offset: u32) -> ClientConnectionResult<Page<Playlist>> {
        let url = format!("{}/me/playlists", API_BASE_URL);
        let (limit, offset) = (limit.to_string(), offset.to_string());
        let page: SpotifyPlaylistSimplified =
            self.get(&url, &[("limit", limit.as_str()), ("offset", offset.as_str())])?;
        Ok(page.into())
    }

    fn create_playlist(&mut self, name: &str) -> ClientConnectionResult<Playlist> {
        let user_id = self.current_user_id()?;
        let url = format!("{}/users/{}/playlists", API_BASE_URL, user_id);
        let body = serde_json::json!({ "name": name, "public": true });
        let playlist: SpotifySimplifiedPlaylistObject =
            self.send("POST", &url, &body, RetryPolicy::RateLimitOnly)?;
        Ok(playlist.into())
    }

    fn delete_playlist(&mut self, playlist_id: &str) -> ClientConnectionResult<()> {
        // Spotify has no real delete: unfollowing your own playlist removes it from your library.
        let url = format!("{}/playlists/{}/followers", API_BASE_URL, playlist_id);
        let request = self.agent.delete(&url);
        request_with_auth(
            request,
            None,
            &mut self.token_container,
            RetryPolicy::Idempotent,
            false,
            self.backoff,
        )?;
        Ok(())
    }

    fn add_items(&mut self, playlist_id: &str, uris: &[String]) -> ClientConnectionResult<()> {
        let url = format!("{}/playlists/{}/tracks", API_BASE_URL, playlist_id);
        let body = serde_json::json!({ "uris": uris });
        let snapshot: SpotifySnapshotResponse =
            self.send("POST", &url, &body, RetryPolicy::RateLimitOnly)?;
        debug!("{} is now at snapshot {}", playlist_id, snapshot.snapshot_id);
        Ok(())
    }

    fn remove_items(&mut self, playlist_id: &str, uris: &[String]) -> ClientConnectionResult<()> {
        let url = format!("{}/playlists/{}/tracks", API_BASE_URL, playlist_id);
        let tracks: Vec<serde_json::Value> = uris
            .iter()
            .map(|uri| serde_json::json!({ "uri": uri }))
            .collect();
        let body = serde_json::json!({ "tracks": tracks });
        // Removing all occurrences of a uri twice has the same effect as removing them once.
        let snapshot: SpotifySnapshotResponse =
            self.send("DELETE", &url, &body, RetryPolicy::Idempotent)?;
        debug!("{} is now at snapshot {}", playlist_id, snapshot.snapshot_id);
        Ok(())
    }

    fn reorder_item(&mut self, playlist_id: &str, from: usize, to: usize) -> ClientConnectionResult<()> {
        let url = format!("{}/playlists/{}/tracks", API_BASE_URL, playlist_id);
        let body = reorder_body(from, to);
        let snapshot: SpotifySnapshotResponse =
            self.send("PUT", &url, &body, RetryPolicy::RateLimitOnly)?;
        debug!("{} is now at snapshot {}", playlist_id, snapshot.snapshot_id);
        Ok(())
    }
}

fn build_agent(config: &Config) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(config.request_timeout)
        .timeout(config.request_timeout)
        .user_agent(concat!("spotifycli/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Spotify's reorder call takes `insert_before`, which is an index into the playlist *before* the
/// item was taken out. We want the item at `from` to end up at index `to`.
fn reorder_body(from: usize, to: usize) -> serde_json::Value {
    let insert_before = if to > from { to + 1 } else { to };
    serde_json::json!({
        "range_start": from,
        "insert_before": insert_before,
        "range_length": 1,
    })
}

fn request_with_auth(
    request: ureq::Request,
    body: Option<&serde_json::Value>,
    token_container: &mut TokenContainer,
    retry_policy: RetryPolicy,
    retry_after_auth_failure: bool,
    exponential_backoff: ExponentialBackoff,
) -> ClientConnectionResult<ureq::Response> {
    let original_request = request.clone();
    let request = token_container
        .set_auth_header(request)
        .set("Content-Type", "application/json");
    let result = match body {
        Some(body) => request.send_json(body),
        None => request.call(),
    };
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(401, response)) => {
            if retry_after_auth_failure {
                // If we already tried to refresh our token, no need to try again.
                Err(ureq::Error::Status(401, response).into())
            } else {
                // Otherwise, the 401 may be because our token has expired, so we try a
                // refresh and then try again.
                info!("Spotify returned 401, token refresh may be required.");
                match token_container.refresh() {
                    Ok(()) => {
                        info!("Token refreshed successfully.");
                        request_with_auth(
                            original_request,
                            body,
                            token_container,
                            retry_policy,
                            true,
                            exponential_backoff,
                        )
                    }
                    Err(e) => {
                        if let ClientError::RefreshSpotifyTokenFailed = e {
                            error!(
                                "Unable to refresh spotify token. Run `spotifycli login` to \
                                authorize again."
                            );
                        }
                        Err(e)
                    }
                }
            }
        }
        Err(e) if retry_policy.should_retry(&e) => {
            match exponential_backoff.increase_after_limit_exceeded() {
                Some((duration, new_backoff)) => {
                    let duration = retry_delay(&e, duration);
                    warn!(
                        "{} {} failed ({}), retrying in {:?}.",
                        original_request.method(),
                        original_request.url(),
                        e,
                        duration
                    );
                    std::thread::sleep(duration);
                    request_with_auth(
                        original_request,
                        body,
                        token_container,
                        retry_policy,
                        retry_after_auth_failure,
                        new_backoff,
                    )
                }
                None => {
                    error!("Max. number of retries reached: {}", e);
                    Err(e.into())
                }
            }
        }
        Err(e) => {
            error!("Request error: {}", e);
            Err(e.into())
        }
    }
}

/// The backoff, or Spotify's `Retry-After` if that is longer. `Retry-After` is capped at
/// [`MAX_RETRY_AFTER`].
fn retry_delay(error: &ureq::Error, backoff: Duration) -> Duration {
    match retry_after(error) {
        Some(retry_after) => retry_after.min(MAX_RETRY_AFTER).max(backoff),
        None => backoff,
    }
}

fn retry_after(error: &ureq::Error) -> Option<Duration> {
    match error {
        ureq::Error::Status(429, response) => response
            .header("Retry-After")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs),
        _ => None,
    }
}

/// Which failures may be retried for a request.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RetryPolicy {
    /// Reads and mutations that can be replayed safely: 429, 5xx and transport errors.
    Idempotent,
    /// Mutations that may have been applied even though we got no answer (adding items creates
    /// duplicates when replayed): only 429, because then Spotify did not process the request.
    RateLimitOnly,
}

impl RetryPolicy {
    fn should_retry(&self, error: &ureq::Error) -> bool {
        match error {
            ureq::Error::Status(429, _) => true,
            ureq::Error::Status(status, _) if *status >= 500 => *self == RetryPolicy::Idempotent,
            ureq::Error::Status(_, _) => false,
            ureq::Error::Transport(_) => *self == RetryPolicy::Idempotent,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Transport),
    #[error("Spotify returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("HTTP protocol error: {0}")]
    HttpProtocolError(String),
    #[error("unable to refresh the Spotify token")]
    RefreshSpotifyTokenFailed,
    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),
}

impl From<ureq::Error> for ClientError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Status(status, response) => ClientError::Status {
                status,
                message: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => ClientError::Transport(transport),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ExponentialBackoff {
    max_retries: u32,
    previous_retries: u32,
    backoff_duration: Duration,
}

impl ExponentialBackoff {
    /// Returns the duration to wait for after a retryable failure, and the updated
    /// ExponentialBackoff to be used if subsequent attempts fail as well.
    fn increase_after_limit_exceeded(&self) -> Option<(Duration, Self)> {
        if self.max_retries > self.previous_retries {
            let backoff = Self {
                max_retries: self.max_retries,
                previous_retries: self.previous_retries + 1,
                backoff_duration: self.backoff_duration * 2,
            };
            Some((self.backoff_duration, backoff))
        } else {
            None
        }
    }

    fn new(initial_backoff_duration: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_duration: initial_backoff_duration,
            previous_retries: 0,
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 4)
    }
}

pub type ClientConnectionResult<T> = Result<T, ClientError>;

const API_BASE_URL: &str = "https://api.spotify.com/v1";
const SEARCH_LIMIT: &str = "10";
const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);
