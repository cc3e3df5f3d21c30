use serde::{Serialize, Serializer};

pub const SPOTIFY_HOME_URL: &str = "https://open.spotify.com";

/// Metadata of the track that is currently playing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_image_url: Option<String>,
    pub track_url: String,
    pub progress_ms: u64,
    pub duration_ms: u64,
}

/// One immutable read of upstream playback state.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum PlaybackSnapshot {
    #[default]
    NotPlaying,
    Playing(NowPlaying),
}

impl PlaybackSnapshot {
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing(_))
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        match self {
            Self::Playing(track) => Some(track),
            Self::NotPlaying => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRepr<'a> {
    is_playing: bool,
    #[serde(flatten)]
    track: Option<&'a NowPlaying>,
}

impl Serialize for PlaybackSnapshot {
    fn serialize<S>(&self, se: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SnapshotRepr {
            is_playing: self.is_playing(),
            track: self.now_playing(),
        }
        .serialize(se)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn not_playing_serializes_without_metadata() {
        let value = serde_json::to_value(PlaybackSnapshot::NotPlaying).unwrap();
        assert_eq!(value, json!({ "isPlaying": false }));
    }

    #[test]
    fn playing_serializes_flat() {
        let snapshot = PlaybackSnapshot::Playing(NowPlaying {
            title: "Song".into(),
            artist: "A, B".into(),
            album: "Album".into(),
            album_image_url: None,
            track_url: "https://open.spotify.com/track/1".into(),
            progress_ms: 10,
            duration_ms: 20,
        });
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["isPlaying"], json!(true));
        assert_eq!(value["artist"], json!("A, B"));
        assert_eq!(value["albumImageUrl"], json!(null));
        assert_eq!(value["durationMs"], json!(20));
    }
}
