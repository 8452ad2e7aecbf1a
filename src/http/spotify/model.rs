use serde::Deserialize;

use crate::model::{Page, Playlist, Track};

pub type SpotifyPlaylistTracks = SpotifyPagingObject<SpotifyPlaylistTrackObject>;
pub type SpotifyPlaylistSimplified = SpotifyPagingObject<SpotifySimplifiedPlaylistObject>;
pub type SpotifySavedTracks = SpotifyPagingObject<SpotifySavedTrackObject>;

#[derive(Debug, Deserialize, PartialEq)]
pub struct SpotifyPagingObject<T> {
    pub limit: u32,
    pub next: Option<String>,
    pub offset: u32,
    pub total: u32,
    pub items: Vec<T>,
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct SpotifyPlaylistTrackObject {
    pub added_at: Option<String>,
    // null if the track was removed from the catalog.
    pub track: Option<SpotifyTrackOrEpisodeObject>,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum SpotifyTrackOrEpisodeObject {
    #[serde(rename(deserialize = "episode"))]
    SpotifyEpisodeObject { uri: String, name: String },
    #[serde(rename(deserialize = "track"))]
    SpotifyTrackObject(SpotifyTrackObject),
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SpotifyTrackObject {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtistObject>,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SpotifyArtistObject {
    pub name: String,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SpotifySavedTrackObject {
    pub added_at: String,
    pub track: SpotifyTrackObject,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SpotifySearchResponse {
    pub tracks: SpotifyPagingObject<SpotifyTrackObject>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SpotifySimplifiedPlaylistObject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tracks: SpotifySimplifiedPlaylistObjectTracks,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct SpotifySimplifiedPlaylistObjectTracks {
    pub total: u32,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SpotifyUserObject {
    pub id: String,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SpotifySnapshotResponse {
    pub snapshot_id: String,
}

impl SpotifyTrackObject {
    pub fn into_track(self, added_at: Option<String>) -> Track {
        let artist = self
            .artists
            .into_iter()
            .next()
            .map(|artist| artist.name)
            .unwrap_or_else(|| "Unknown".to_string());
        Track {
            uri: self.uri,
            artist,
            title: self.name,
            added_at,
        }
    }
}

impl From<SpotifySimplifiedPlaylistObject> for Playlist {
    fn from(value: SpotifySimplifiedPlaylistObject) -> Self {
        Self {
            id: value.id,
            name: value.name,
            track_count: value.tracks.total,
        }
    }
}

impl From<SpotifyPlaylistTracks> for Page<Track> {
    fn from(value: SpotifyPlaylistTracks) -> Self {
        let fetched = value.items.len() as u32;
        let items = value
            .items
            .into_iter()
            .filter_map(|item| match item.track {
                Some(SpotifyTrackOrEpisodeObject::SpotifyTrackObject(track)) => {
                    Some(track.into_track(item.added_at))
                }
                Some(SpotifyTrackOrEpisodeObject::SpotifyEpisodeObject { uri, .. }) => {
                    // podcast episodes are ignored, we support only music tracks.
                    debug!("Skipping episode {}", uri);
                    None
                }
                None => None,
            })
            .collect();
        Page {
            total: value.total,
            fetched,
            items,
        }
    }
}

impl From<SpotifySavedTracks> for Page<Track> {
    fn from(value: SpotifySavedTracks) -> Self {
        Page::new(
            value.total,
            value
                .items
                .into_iter()
                .map(|saved| saved.track.into_track(Some(saved.added_at)))
                .collect(),
        )
    }
}

impl From<SpotifyPlaylistSimplified> for Page<Playlist> {
    fn from(value: SpotifyPlaylistSimplified) -> Self {
        Page::new(
            value.total,
            value.items.into_iter().map(Playlist::from).collect(),
        )
    }
}
