use std::collections::{HashMap, HashSet};

use crate::http::spotify::client::ClientConnectionResult;
use crate::model::{Playlist, Track};
use crate::playlist::operations::{
    add_tracks_to_playlist, liked_tracks, playlist_tracks, remove_tracks_from_playlist,
};
use crate::playlist::PlaylistService;

type TrackSet<'a> = HashMap<&'a str, &'a Track>;

/// What has to change so that a playlist contains exactly the liked songs.
#[derive(Debug, Default, PartialEq)]
pub struct SyncPlan {
    pub to_add: Vec<Track>,
    pub to_remove: Vec<Track>,
}

impl SyncPlan {
    /// `to_add` = liked − playlist and `to_remove` = playlist − liked, compared by uri only.
    /// Each uri appears at most once, in the order it was first seen in its source.
    pub fn compute(playlist_tracks: &[Track], liked_tracks: &[Track]) -> Self {
        let playlist_set = track_set(playlist_tracks);
        let liked_set = track_set(liked_tracks);

        Self {
            to_add: difference(liked_tracks, &playlist_set),
            to_remove: difference(playlist_tracks, &liked_set),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    fn uris_to_add(&self) -> Vec<String> {
        self.to_add.iter().map(|track| track.uri.clone()).collect()
    }

    fn uris_to_remove(&self) -> Vec<String> {
        self.to_remove.iter().map(|track| track.uri.clone()).collect()
    }
}

fn track_set(tracks: &[Track]) -> TrackSet<'_> {
    tracks
        .iter()
        .map(|track| (track.uri.as_str(), track))
        .collect()
}

fn difference(tracks: &[Track], exclude: &TrackSet<'_>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .iter()
        .filter(|track| !exclude.contains_key(track.uri.as_str()))
        .filter(|track| seen.insert(track.uri.as_str()))
        .cloned()
        .collect()
}

#[derive(Debug, PartialEq)]
pub struct SyncReport {
    pub added: usize,
    pub removed: usize,
}

/// Makes the playlist contain exactly the liked songs.
///
/// The plan is logged before anything is changed. There is no rollback: when a call fails, the
/// chunks before it stay applied and the error is returned. Running the sync again computes the
/// plan from the current state and finishes the job. With `dry_run`, only the plan is logged.
pub fn sync_liked_with_playlist<S>(
    service: &mut S,
    playlist: &Playlist,
    dry_run: bool,
) -> ClientConnectionResult<SyncReport>
where
    S: PlaylistService + ?Sized,
{
    let current_tracks = playlist_tracks(service, playlist)?;
    let liked = liked_tracks(service)?;

    info!("playlist track count: {}", track_set(&current_tracks).len());
    info!("liked track count: {}", track_set(&liked).len());

    let plan = SyncPlan::compute(&current_tracks, &liked);
    log_tracks("adding", &plan.to_add);
    log_tracks("removing", &plan.to_remove);

    if dry_run {
        info!("dry run, leaving {} unchanged", playlist.name);
        return Ok(SyncReport {
            added: 0,
            removed: 0,
        });
    }
    if plan.is_empty() {
        info!("{} is already in sync with liked songs", playlist.name);
    }

    add_tracks_to_playlist(service, &plan.uris_to_add(), playlist)?;
    remove_tracks_from_playlist(service, &plan.uris_to_remove(), playlist)?;

    Ok(SyncReport {
        added: plan.to_add.len(),
        removed: plan.to_remove.len(),
    })
}

fn log_tracks(prefix: &str, tracks: &[Track]) {
    info!("{} {} tracks", prefix, tracks.len());
    for track in tracks {
        info!("{} {}", prefix, track);
    }
}
