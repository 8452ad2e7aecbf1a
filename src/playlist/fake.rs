use crate::http::spotify::client::{ClientConnectionResult, ClientError};
use crate::model::{Page, Playlist, Track, TrackQuery};
use crate::playlist::PlaylistService;

/// Remote calls recorded by [`FakePlaylistService`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Search(String),
    LikedPage { limit: u32, offset: u32 },
    PlaylistPage { id: String, limit: u32, offset: u32 },
    PlaylistsPage { limit: u32, offset: u32 },
    Create(String),
    Delete(String),
    Add { id: String, uris: Vec<String> },
    Remove { id: String, uris: Vec<String> },
    Reorder { id: String, from: usize, to: usize },
}

/// In-memory Spotify account: a catalog to search in, liked songs and playlists.
#[derive(Default)]
pub struct FakePlaylistService {
    pub catalog: Vec<Track>,
    pub liked: Vec<Track>,
    pub playlists: Vec<(Playlist, Vec<Track>)>,
    pub calls: Vec<Call>,
    /// Number of add calls that succeed before every further add call fails.
    pub failing_add_after: Option<usize>,
    next_id: usize,
}

pub fn track(id: &str) -> Track {
    Track {
        uri: format!("spotify:track:{}", id),
        artist: format!("artist {}", id),
        title: format!("title {}", id),
        added_at: Some("2024-01-01T00:00:00Z".to_string()),
    }
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

impl FakePlaylistService {
    pub fn with_catalog(mut self, catalog: Vec<Track>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_liked(mut self, liked: Vec<Track>) -> Self {
        self.liked = liked;
        self
    }

    pub fn with_playlist(mut self, name: &str, tracks: Vec<Track>) -> Self {
        self.next_id += 1;
        let playlist = Playlist {
            id: format!("playlist{}", self.next_id),
            name: name.to_string(),
            track_count: tracks.len() as u32,
        };
        self.playlists.push((playlist, tracks));
        self
    }

    pub fn playlist_uris(&self, name: &str) -> Vec<String> {
        self.playlists
            .iter()
            .find(|(playlist, _)| playlist.name == name)
            .map(|(_, tracks)| tracks.iter().map(|t| t.uri.clone()).collect())
            .unwrap_or_default()
    }

    pub fn playlist_id(&self, name: &str) -> String {
        self.playlists
            .iter()
            .find(|(playlist, _)| playlist.name == name)
            .map(|(playlist, _)| playlist.id.clone())
            .unwrap_or_default()
    }

    pub fn mutations(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    Call::Create(_)
                        | Call::Delete(_)
                        | Call::Add { .. }
                        | Call::Remove { .. }
                        | Call::Reorder { .. }
                )
            })
            .collect()
    }

    fn tracks_mut(&mut self, playlist_id: &str) -> ClientConnectionResult<&mut Vec<Track>> {
        self.playlists
            .iter_mut()
            .find(|(playlist, _)| playlist.id == playlist_id)
            .map(|(_, tracks)| tracks)
            .ok_or_else(|| not_found(playlist_id))
    }

    fn find_in_catalog(&self, uri: &str) -> Track {
        self.catalog
            .iter()
            .chain(self.liked.iter())
            .find(|track| track.uri == uri)
            .cloned()
            .unwrap_or_else(|| Track {
                uri: uri.to_string(),
                artist: "Unknown".to_string(),
                title: "Unknown".to_string(),
                added_at: None,
            })
    }
}

fn not_found(playlist_id: &str) -> ClientError {
    ClientError::Status {
        status: 404,
        message: format!("no playlist {}", playlist_id),
    }
}

fn page_of<T: Clone>(items: &[T], limit: u32, offset: u32) -> Page<T> {
    let start = (offset as usize).min(items.len());
    let end = (start + limit as usize).min(items.len());
    Page::new(items.len() as u32, items[start..end].to_vec())
}

impl PlaylistService for FakePlaylistService {
    fn search_tracks(&mut self, query: &str) -> ClientConnectionResult<Vec<Track>> {
        self.calls.push(Call::Search(query.to_string()));
        Ok(self
            .catalog
            .iter()
            .filter(|track| {
                let candidate = TrackQuery {
                    artist: track.artist.clone(),
                    title: track.title.clone(),
                };
                candidate.search_query() == query
            })
            .map(|track| Track {
                added_at: None,
                ..track.clone()
            })
            .collect())
    }

    fn liked_tracks_page(&mut self, limit: u32, offset: u32) -> ClientConnectionResult<Page<Track>> {
        self.calls.push(Call::LikedPage { limit, offset });
        Ok(page_of(&self.liked, limit, offset))
    }

    fn playlist_tracks_page(
        &mut self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> ClientConnectionResult<Page<Track>> {
        self.calls.push(Call::PlaylistPage {
            id: playlist_id.to_string(),
            limit,
            offset,
        });
        let tracks = self.tracks_mut(playlist_id)?;
        Ok(page_of(tracks, limit, offset))
    }

    fn playlists_page(&mut self, limit: u32, offset: u32) -> ClientConnectionResult<Page<Playlist>> {
        self.calls.push(Call::PlaylistsPage { limit, offset });
        let playlists: Vec<Playlist> = self
            .playlists
            .iter()
            .map(|(playlist, tracks)| Playlist {
                track_count: tracks.len() as u32,
                ..playlist.clone()
            })
            .collect();
        Ok(page_of(&playlists, limit, offset))
    }

    fn create_playlist(&mut self, name: &str) -> ClientConnectionResult<Playlist> {
        self.calls.push(Call::Create(name.to_string()));
        self.next_id += 1;
        let playlist = Playlist {
            id: format!("playlist{}", self.next_id),
            name: name.to_string(),
            track_count: 0,
        };
        self.playlists.push((playlist.clone(), vec![]));
        Ok(playlist)
    }

    fn delete_playlist(&mut self, playlist_id: &str) -> ClientConnectionResult<()> {
        self.calls.push(Call::Delete(playlist_id.to_string()));
        self.playlists.retain(|(playlist, _)| playlist.id != playlist_id);
        Ok(())
    }

    fn add_items(&mut self, playlist_id: &str, uris: &[String]) -> ClientConnectionResult<()> {
        let previous_adds = self
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Add { .. }))
            .count();
        if let Some(limit) = self.failing_add_after {
            if previous_adds >= limit {
                return Err(ClientError::Status {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                });
            }
        }
        self.calls.push(Call::Add {
            id: playlist_id.to_string(),
            uris: uris.to_vec(),
        });
        let new_tracks: Vec<Track> = uris.iter().map(|uri| self.find_in_catalog(uri)).collect();
        self.tracks_mut(playlist_id)?.extend(new_tracks);
        Ok(())
    }

    fn remove_items(&mut self, playlist_id: &str, uris: &[String]) -> ClientConnectionResult<()> {
        self.calls.push(Call::Remove {
            id: playlist_id.to_string(),
            uris: uris.to_vec(),
        });
        self.tracks_mut(playlist_id)?
            .retain(|track| !uris.contains(&track.uri));
        Ok(())
    }

    fn reorder_item(
        &mut self,
        playlist_id: &str,
        from: usize,
        to: usize,
    ) -> ClientConnectionResult<()> {
        self.calls.push(Call::Reorder {
            id: playlist_id.to_string(),
            from,
            to,
        });
        let tracks = self.tracks_mut(playlist_id)?;
        let track = tracks.remove(from);
        tracks.insert(to, track);
        Ok(())
    }
}
