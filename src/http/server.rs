use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};

use regex::Regex;
use url::{ParseError, Url};

use crate::http::spotify::client::{ClientConnectionResult, ClientError};

/// Blocks until Spotify redirects the browser to `redirect_uri` with an authorization code for
/// the given `state`, and returns that code.
///
/// Requests to `/authorize` are redirected to `auth_url`, so the user can also start the flow by
/// visiting the local address.
pub fn wait_for_authorization_code(
    redirect_uri: &Url,
    state: &str,
    auth_url: &Url,
) -> ClientConnectionResult<String> {
    let listen_address = listen_address(redirect_uri)?;
    let listener = TcpListener::bind(&listen_address)?;
    info!("Waiting for the Spotify redirect on {}", listen_address);

    for stream in listener.incoming() {
        let mut stream = stream?;
        match handle_connection(&mut stream, state) {
            Ok(HandleConnectionResult::Authorized(code)) => {
                write_response(
                    &mut stream,
                    "200 OK",
                    "spotifycli is authorized, you can close this tab.\n",
                );
                return Ok(code);
            }
            Ok(HandleConnectionResult::Denied(reason)) => {
                write_response(&mut stream, "200 OK", "Authorization was denied.\n");
                return Err(ClientError::AuthorizationFailed(reason));
            }
            Ok(HandleConnectionResult::InitiateAuth) => {
                let response = format!("HTTP/1.1 302 Found\r\nLocation: {}\r\n\r\n", auth_url);
                if let Err(e) = stream.write_all(response.as_bytes()) {
                    warn!("Unable to write response: {:?}", e);
                }
            }
            Ok(HandleConnectionResult::BadRequest) => {
                // Keep listening, maybe the browser just asked for a favicon and will
                // subsequently send the correct request.
                write_response(&mut stream, "400 Bad Request", "Bad Request\n");
            }
            Err(e) => {
                warn!("Ignoring invalid request on redirect listener: {}", e);
            }
        }
    }

    Err(ClientError::HttpProtocolError(
        "redirect listener stopped before receiving a code".to_string(),
    ))
}

fn write_response(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()) {
        warn!("Unable to write response: {:?}", e);
    }
}

fn listen_address(redirect_uri: &Url) -> ClientConnectionResult<String> {
    match (redirect_uri.host_str(), redirect_uri.port_or_known_default()) {
        (Some(host), Some(port)) => Ok(format!("{}:{}", host, port)),
        _ => Err(ClientError::AuthorizationFailed(format!(
            "redirect uri {} has no host and port to listen on",
            redirect_uri
        ))),
    }
}

fn handle_connection(
    stream: &mut TcpStream,
    state: &str,
) -> ClientConnectionResult<HandleConnectionResult> {
    let request_target = request_target_from_stream(stream)?;
    if request_target == "/authorize" {
        return Ok(HandleConnectionResult::InitiateAuth);
    }
    let query_params = query_params(&request_target).map_err(|e| {
        ClientError::HttpProtocolError(format!(
            "Unable to parse query params: {:?}. Probably, we've received invalid data over \
            the TCP connection.",
            e
        ))
    })?;

    Ok(evaluate_redirect(&query_params, state))
}

fn evaluate_redirect(query_params: &HashMap<String, String>, state: &str) -> HandleConnectionResult {
    match query_params.get("state") {
        Some(s) if s == state => {}
        Some(_) => {
            // OAuth uses the state param as a security measure against CSRF attacks, so a
            // redirect with a foreign state is not accepted.
            warn!("state from the redirect does not match.");
            return HandleConnectionResult::BadRequest;
        }
        None => {
            warn!("state is not present in the URL.");
            return HandleConnectionResult::BadRequest;
        }
    }

    match (query_params.get("code"), query_params.get("error")) {
        (Some(code), _) => HandleConnectionResult::Authorized(code.to_string()),
        (None, Some(error)) => HandleConnectionResult::Denied(error.to_string()),
        (None, None) => {
            warn!("code is not present in the URL.");
            HandleConnectionResult::BadRequest
        }
    }
}

#[derive(Debug, PartialEq)]
enum HandleConnectionResult {
    /// Spotify redirected with a code that can be exchanged for a token.
    Authorized(String),
    /// Spotify redirected with an error, e.g. because the user declined.
    Denied(String),
    /// The request cannot be processed.
    BadRequest,
    /// The client requested to initiate the authorization process at Spotify.
    InitiateAuth,
}

fn request_target_from_stream(stream: &mut TcpStream) -> ClientConnectionResult<String> {
    let mut request_line = String::new();
    BufReader::new(stream).read_line(&mut request_line)?;

    request_target(request_line.trim_end()).ok_or_else(|| {
        ClientError::HttpProtocolError(
            "Received TCP data that does not resemble a valid HTTP request".to_string(),
        )
    })
}

fn request_target(http_request_line: &str) -> Option<String> {
    // Check if input is a valid HTTP request line (RFC 7230):
    let pattern = r"^(?P<method>[A-Z]+) (?P<request_target>[^ ]+) (?P<version>HTTP/\d\.\d)$";
    let regex = Regex::new(pattern).ok()?;
    let captures = regex.captures(http_request_line)?;
    captures
        .name("request_target")
        .map(|target_match| target_match.as_str().to_string())
}

fn query_params(request_target: &str) -> Result<HashMap<String, String>, ParseError> {
    // The host is irrelevant, we only need a valid base to parse the query params.
    let url_as_string = format!("http://localhost{}", request_target);
    let url = Url::parse(&url_as_string)?;
    let params = url
        .query_pairs()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    Ok(params)
}
