use std::io::{BufRead, Write};

use crate::error::{Result, SpotifyCliError};
use crate::http::spotify::client::ClientConnectionResult;
use crate::model::{Playlist, Track, TrackQuery};
use crate::playlist::paging::fetch_all_pages;
use crate::playlist::{PlaylistService, CHUNK_SIZE, PAGE_SIZE};

/// Searches for `track:{title} artist:{artist}` and takes the best match.
pub fn find_track<S>(service: &mut S, query: &TrackQuery) -> ClientConnectionResult<Option<Track>>
where
    S: PlaylistService + ?Sized,
{
    let candidates = service.search_tracks(&query.search_query())?;
    Ok(candidates.into_iter().next())
}

/// Reads `artist:track` lines and looks up the uri for each of them.
///
/// Lines that cannot be parsed or have no search result are skipped with a warning, unless
/// `strict` is set, in which case the first such line aborts the whole run.
pub fn find_track_uris<S, R>(service: &mut S, input: R, strict: bool) -> Result<Vec<String>>
where
    S: PlaylistService + ?Sized,
    R: BufRead,
{
    let mut track_uris = vec![];
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        info!("searching {}", line);
        match lookup_line(service, line) {
            Ok(track) => {
                info!("found {} ({})", track, track.uri);
                track_uris.push(track.uri);
            }
            Err(
                e @ (SpotifyCliError::TrackNotFound { .. } | SpotifyCliError::InvalidInput { .. }),
            ) => {
                if strict {
                    return Err(e);
                }
                warn!("skipping: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(track_uris)
}

fn lookup_line<S>(service: &mut S, line: &str) -> Result<Track>
where
    S: PlaylistService + ?Sized,
{
    let query = TrackQuery::parse(line).ok_or_else(|| SpotifyCliError::InvalidInput {
        line: line.to_string(),
    })?;
    find_track(service, &query)?.ok_or(SpotifyCliError::TrackNotFound {
        artist: query.artist,
        title: query.title,
    })
}

/// Returns the first playlist in the user's library with exactly this name.
pub fn fetch_playlist<S>(service: &mut S, playlist_name: &str) -> ClientConnectionResult<Option<Playlist>>
where
    S: PlaylistService + ?Sized,
{
    let playlists = fetch_all_pages(PAGE_SIZE, |limit, offset| {
        service.playlists_page(limit, offset)
    })?;
    let playlist = playlists
        .into_iter()
        .find(|playlist| playlist.name == playlist_name);
    if let Some(playlist) = &playlist {
        info!(
            "found playlist {} with {} tracks",
            playlist.name, playlist.track_count
        );
    }

    Ok(playlist)
}

pub fn require_playlist<S>(service: &mut S, playlist_name: &str) -> Result<Playlist>
where
    S: PlaylistService + ?Sized,
{
    fetch_playlist(service, playlist_name)?
        .ok_or_else(|| SpotifyCliError::PlaylistNotFound(playlist_name.to_string()))
}

pub fn create_playlist<S>(service: &mut S, playlist_name: &str) -> ClientConnectionResult<Playlist>
where
    S: PlaylistService + ?Sized,
{
    info!("creating playlist {}", playlist_name);
    service.create_playlist(playlist_name)
}

pub fn get_or_create_playlist<S>(service: &mut S, playlist_name: &str) -> ClientConnectionResult<Playlist>
where
    S: PlaylistService + ?Sized,
{
    match fetch_playlist(service, playlist_name)? {
        Some(playlist) => Ok(playlist),
        None => create_playlist(service, playlist_name),
    }
}

/// Removes the playlist, if it exists. Returns whether there was one to remove.
pub fn remove_playlist<S>(service: &mut S, playlist_name: &str) -> ClientConnectionResult<bool>
where
    S: PlaylistService + ?Sized,
{
    match fetch_playlist(service, playlist_name)? {
        Some(playlist) => {
            info!("removing playlist {}", playlist.name);
            service.delete_playlist(&playlist.id)?;
            Ok(true)
        }
        None => {
            warn!("playlist {} does not exist, nothing to remove", playlist_name);
            Ok(false)
        }
    }
}

pub fn recreate_playlist<S>(service: &mut S, playlist_name: &str) -> ClientConnectionResult<Playlist>
where
    S: PlaylistService + ?Sized,
{
    if let Some(playlist) = fetch_playlist(service, playlist_name)? {
        info!("removing playlist {}", playlist.name);
        service.delete_playlist(&playlist.id)?;
    }
    create_playlist(service, playlist_name)
}

pub fn liked_tracks<S>(service: &mut S) -> ClientConnectionResult<Vec<Track>>
where
    S: PlaylistService + ?Sized,
{
    fetch_all_pages(PAGE_SIZE, |limit, offset| {
        service.liked_tracks_page(limit, offset)
    })
}

pub fn playlist_tracks<S>(service: &mut S, playlist: &Playlist) -> ClientConnectionResult<Vec<Track>>
where
    S: PlaylistService + ?Sized,
{
    fetch_all_pages(PAGE_SIZE, |limit, offset| {
        service.playlist_tracks_page(&playlist.id, limit, offset)
    })
}

/// Adds the uris in chunks of at most [`CHUNK_SIZE`]. Returns the number of calls made.
///
/// Chunks are not rolled back: if a call fails, the earlier chunks stay in the playlist.
pub fn add_tracks_to_playlist<S>(
    service: &mut S,
    track_uris: &[String],
    playlist: &Playlist,
) -> ClientConnectionResult<usize>
where
    S: PlaylistService + ?Sized,
{
    let mut calls = 0;
    for chunk in track_uris.chunks(CHUNK_SIZE) {
        service.add_items(&playlist.id, chunk)?;
        calls += 1;
    }
    debug!("added {} tracks in {} calls", track_uris.len(), calls);
    Ok(calls)
}

/// Removes all occurrences of the uris in chunks of at most [`CHUNK_SIZE`]. Returns the number
/// of calls made.
pub fn remove_tracks_from_playlist<S>(
    service: &mut S,
    track_uris: &[String],
    playlist: &Playlist,
) -> ClientConnectionResult<usize>
where
    S: PlaylistService + ?Sized,
{
    let mut calls = 0;
    for chunk in track_uris.chunks(CHUNK_SIZE) {
        service.remove_items(&playlist.id, chunk)?;
        calls += 1;
    }
    debug!("removed {} tracks in {} calls", track_uris.len(), calls);
    Ok(calls)
}

/// Fills the playlist with all liked songs, most recently liked first.
pub fn create_from_liked<S>(service: &mut S, playlist: &Playlist) -> ClientConnectionResult<usize>
where
    S: PlaylistService + ?Sized,
{
    let uris: Vec<String> = liked_tracks(service)?
        .into_iter()
        .map(|track| track.uri)
        .collect();
    info!("adding {} liked tracks to {}", uris.len(), playlist.name);
    add_tracks_to_playlist(service, &uris, playlist)?;
    Ok(uris.len())
}

/// Writes one `added_at<TAB>Artist: Title` line per playlist entry.
pub fn dump_playlist<S, W>(service: &mut S, playlist: &Playlist, out: &mut W) -> Result<usize>
where
    S: PlaylistService + ?Sized,
    W: Write,
{
    let tracks = playlist_tracks(service, playlist)?;
    for track in &tracks {
        writeln!(
            out,
            "{}\t{}",
            track.added_at.as_deref().unwrap_or_default(),
            track
        )?;
    }
    Ok(tracks.len())
}
