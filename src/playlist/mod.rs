use crate::http::spotify::client::ClientConnectionResult;
use crate::model::{Page, Playlist, Track};

#[cfg(test)]
pub mod fake;
pub mod operations;
pub mod paging;
pub mod shuffle;
pub mod sync;

/// Maximum number of uris Spotify accepts in a single add or remove call that we use.
pub const CHUNK_SIZE: usize = 50;
/// Number of items requested per page from paginated listing calls.
pub const PAGE_SIZE: u32 = 50;

/// The remote operations spotifycli needs, and nothing more. Implemented by
/// [`SpotifyClient`](crate::http::spotify::client::SpotifyClient) and, in tests, by an in-memory
/// fake.
pub trait PlaylistService {
    /// Track candidates for the query, best match first.
    fn search_tracks(&mut self, query: &str) -> ClientConnectionResult<Vec<Track>>;

    fn liked_tracks_page(&mut self, limit: u32, offset: u32) -> ClientConnectionResult<Page<Track>>;

    fn playlist_tracks_page(
        &mut self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> ClientConnectionResult<Page<Track>>;

    /// Playlists in the current user's library.
    fn playlists_page(&mut self, limit: u32, offset: u32) -> ClientConnectionResult<Page<Playlist>>;

    fn create_playlist(&mut self, name: &str) -> ClientConnectionResult<Playlist>;

    fn delete_playlist(&mut self, playlist_id: &str) -> ClientConnectionResult<()>;

    /// Appends the uris to the end of the playlist. At most [`CHUNK_SIZE`] uris per call.
    fn add_items(&mut self, playlist_id: &str, uris: &[String]) -> ClientConnectionResult<()>;

    /// Removes all occurrences of each uri. At most [`CHUNK_SIZE`] uris per call.
    fn remove_items(&mut self, playlist_id: &str, uris: &[String]) -> ClientConnectionResult<()>;

    /// Moves the item at index `from` so that it ends up at index `to`.
    fn reorder_item(&mut self, playlist_id: &str, from: usize, to: usize)
        -> ClientConnectionResult<()>;
}
