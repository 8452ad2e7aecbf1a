use rand::Rng;

use crate::http::spotify::client::ClientConnectionResult;
use crate::model::Playlist;
use crate::playlist::PlaylistService;

/// Shuffles the playlist in place on Spotify, one reorder call per step (Fisher–Yates).
///
/// For each index `i` from the last one down to 1, an index `j` in `[0, i]` is drawn and the item
/// at `j` is moved to `i`. Positions above `i` are final at that point, so every permutation is
/// equally likely. Returns the number of reorder calls.
pub fn shuffle_playlist<S, R>(
    service: &mut S,
    playlist: &Playlist,
    rng: &mut R,
) -> ClientConnectionResult<usize>
where
    S: PlaylistService + ?Sized,
    R: Rng + ?Sized,
{
    // The track count in the playlist listing may be outdated.
    let track_count = service.playlist_tracks_page(&playlist.id, 1, 0)?.total as usize;
    info!("shuffling {} tracks in {}", track_count, playlist.name);

    let mut moves = 0;
    for i in (1..track_count).rev() {
        let j = rng.gen_range(0..=i);
        if i != j {
            debug!("moving item {} to {}", j, i);
            service.reorder_item(&playlist.id, j, i)?;
            moves += 1;
        }
    }

    info!("shuffled {} with {} moves", playlist.name, moves);
    Ok(moves)
}
