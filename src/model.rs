use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub uri: String,
    pub artist: String,
    pub title: String,
    // Only known for tracks that were listed from a playlist or from the liked songs.
    pub added_at: Option<String>,
}

impl Display for Track {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.artist, self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub track_count: u32,
}

/// One response of a paginated listing call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub total: u32,
    /// Entries the remote page held, including the ones dropped when converting it (podcast
    /// episodes, tracks removed from the catalog). Paging has to count these, not `items`.
    pub fetched: u32,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(total: u32, items: Vec<T>) -> Self {
        Self {
            total,
            fetched: items.len() as u32,
            items,
        }
    }
}

/// A single line read from stdin, e.g. `Daft Punk:One More Time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackQuery {
    pub artist: String,
    pub title: String,
}

impl TrackQuery {
    /// Splits the line on the first colon. Returns None if there is no colon at all.
    pub fn parse(line: &str) -> Option<Self> {
        let (artist, title) = line.trim().split_once(':')?;
        Some(Self {
            artist: artist.trim().to_string(),
            title: title.trim().to_string(),
        })
    }

    pub fn search_query(&self) -> String {
        format!("track:{} artist:{}", self.title, self.artist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_first_colon() {
        let query = TrackQuery::parse("Sleater-Kinney:Dig Me Out: Live").unwrap();
        assert_eq!(query.artist, "Sleater-Kinney");
        assert_eq!(query.title, "Dig Me Out: Live");
    }

    #[test]
    fn parse_trims_whitespace() {
        let query = TrackQuery::parse("  Portishead : Roads \n").unwrap();
        assert_eq!(
            query,
            TrackQuery {
                artist: "Portishead".to_string(),
                title: "Roads".to_string(),
            }
        );
    }

    #[test]
    fn parse_without_colon() {
        assert_eq!(TrackQuery::parse("just some text"), None);
    }

    #[test]
    fn search_query_format() {
        let query = TrackQuery::parse("Massive Attack:Teardrop").unwrap();
        assert_eq!(query.search_query(), "track:Teardrop artist:Massive Attack");
    }

    #[test]
    fn track_display() {
        let track = Track {
            uri: "spotify:track:1".to_string(),
            artist: "Björk".to_string(),
            title: "Jóga".to_string(),
            added_at: None,
        };
        assert_eq!(track.to_string(), "Björk: Jóga");
    }
}
