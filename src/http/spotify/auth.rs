use base64::engine::general_purpose;
use base64::Engine;
use rand::distributions::{Alphanumeric, DistString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::Config;
use crate::file_io::state;
use crate::http::server;
use crate::http::spotify::client::{ClientConnectionResult, ClientError};

/// Runs the Authorization Code flow with PKCE: the user opens the printed URL, Spotify redirects
/// to our local listener, and the code from the redirect is exchanged for a token.
pub fn authorize(agent: &ureq::Agent, config: &Config) -> ClientConnectionResult<TokenResponse> {
    let code_verifier = generate_random_string(128);
    let code_challenge = sha256_base64_encoded(&code_verifier);
    let state = generate_random_string(16);
    let url = authorize_url(config, &state, &code_challenge)?;

    println!(
        "Open the following URL in your browser to authorize spotifycli:\n\n    {}\n",
        url
    );
    let code = server::wait_for_authorization_code(&config.redirect_uri, &state, &url)?;
    let token = get_token(agent, config, &code, &code_verifier)?;
    info!("Authorization successful.");
    if let Err(e) = state::store_spotify_token(&token) {
        error!("Unable to store spotify token: {:?}", e);
    }

    Ok(token)
}

fn authorize_url(
    config: &Config,
    state: &str,
    code_challenge: &str,
) -> ClientConnectionResult<Url> {
    Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("scope", SCOPE),
            ("state", state),
            ("code_challenge_method", "S256"),
            ("code_challenge", code_challenge),
            ("redirect_uri", config.redirect_uri.as_str()),
        ],
    )
    .map_err(|e| ClientError::AuthorizationFailed(e.to_string()))
}

fn get_token(
    agent: &ureq::Agent,
    config: &Config,
    code: &str,
    code_verifier: &str,
) -> ClientConnectionResult<TokenResponse> {
    let mut form = vec![
        ("client_id", config.client_id.as_str()),
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("code_verifier", code_verifier),
    ];
    if let Some(secret) = &config.client_secret {
        form.push(("client_secret", secret.as_str()));
    }
    let token: TokenResponse = agent.post(TOKEN_URL).send_form(&form)?.into_json()?;

    Ok(token)
}

fn generate_random_string(length: usize) -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), length)
}

fn sha256_base64_encoded(plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plain.as_bytes());
    let result = hasher.finalize();
    general_purpose::URL_SAFE_NO_PAD.encode(result)
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: usize,
    pub refresh_token: String,
}

// Spotify may or may not rotate the refresh token when we refresh.
#[derive(Debug, Deserialize)]
struct RefreshedToken {
    access_token: String,
    token_type: String,
    expires_in: usize,
    refresh_token: Option<String>,
}

// Holds the most recent token: every refresh replaces the token inside, and the new token is
// persisted right away. There is exactly one instance per process, owned by the SpotifyClient.
pub struct TokenContainer {
    token: TokenResponse,
    agent: ureq::Agent,
    client_id: String,
    client_secret: Option<String>,
}

impl TokenContainer {
    pub fn new(token_response: TokenResponse, agent: ureq::Agent, config: &Config) -> Self {
        Self {
            token: token_response,
            agent,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    pub fn set_auth_header(&self, request: ureq::Request) -> ureq::Request {
        let auth_header_value = format!("Bearer {}", self.token.access_token);
        request.set("Authorization", &auth_header_value)
    }

    pub fn refresh(&mut self) -> ClientConnectionResult<()> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", self.token.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        let refreshed: RefreshedToken = match self.agent.post(TOKEN_URL).send_form(&form) {
            Ok(r) => r.into_json()?,
            Err(e) => {
                debug!("Token refresh failed: {}", e);
                return Err(ClientError::RefreshSpotifyTokenFailed);
            }
        };
        let token_response = TokenResponse {
            access_token: refreshed.access_token,
            token_type: refreshed.token_type,
            expires_in: refreshed.expires_in,
            refresh_token: refreshed
                .refresh_token
                .unwrap_or_else(|| self.token.refresh_token.clone()),
        };
        if let Err(e) = state::store_spotify_token(&token_response) {
            error!("Unable to store token after refresh: {:?}", e);
        }
        self.token = token_response;

        Ok(())
    }
}

const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SCOPE: &str =
    "playlist-modify-public playlist-modify-private playlist-read-private user-library-read";
