use super::state::{InputMode, WidgetState};
use crate::models::{PlaybackSnapshot, SPOTIFY_HOME_URL};

pub const NOW_PLAYING_HEADER: &str = "Now Playing";
pub const NOT_PLAYING_TEXT: &str = "Not currently playing";
pub const LISTEN_LABEL: &str = "Listen on Spotify";
pub const OPEN_LABEL: &str = "Open Spotify";

#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub label: &'static str,
    pub href: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IconLink {
    pub href: String,
    pub new_context: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AlbumArt {
    pub src: String,
    pub alt: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressBar {
    pub percent: f64,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PopupContent {
    NowPlaying {
        header: &'static str,
        album_art: Option<AlbumArt>,
        title: String,
        artist: String,
        album: String,
        progress: ProgressBar,
        link: Option<Link>,
    },
    NotPlaying {
        text: &'static str,
        link: Option<Link>,
    },
}

/// Everything a renderer needs to draw the widget.
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetView {
    /// None while loading: the bare icon is shown without a link.
    pub icon: Option<IconLink>,
    pub popup: Option<PopupContent>,
}

/// `m:ss`, seconds zero padded.
pub fn format_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{}:{:02}", minutes, seconds)
}

pub fn progress_percent(current_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    (current_ms as f64 / duration_ms as f64 * 100.0).min(100.0)
}

impl WidgetView {
    pub fn render(state: &WidgetState) -> Self {
        let Some(snapshot) = state.latest_snapshot() else {
            return Self {
                icon: None,
                popup: None,
            };
        };

        let touch = state.input_mode() == InputMode::Touch;
        let open = state.popup_visible();

        // An open touch popup turns the icon into a plain toggle.
        let icon = if touch && open {
            IconLink {
                href: "#".to_owned(),
                new_context: false,
            }
        } else {
            IconLink {
                href: state.external_url().to_owned(),
                new_context: true,
            }
        };

        let popup = open.then(|| match snapshot {
            PlaybackSnapshot::Playing(track) => {
                let current = state.displayed_progress_ms();
                PopupContent::NowPlaying {
                    header: NOW_PLAYING_HEADER,
                    album_art: track.album_image_url.as_ref().map(|src| AlbumArt {
                        src: src.clone(),
                        alt: format!("{} cover", track.album),
                    }),
                    title: track.title.clone(),
                    artist: track.artist.clone(),
                    album: track.album.clone(),
                    progress: ProgressBar {
                        percent: progress_percent(current, track.duration_ms),
                        label: format!(
                            "{} / {}",
                            format_time(current),
                            format_time(track.duration_ms)
                        ),
                    },
                    link: touch.then(|| Link {
                        label: LISTEN_LABEL,
                        href: track.track_url.clone(),
                    }),
                }
            }
            PlaybackSnapshot::NotPlaying => PopupContent::NotPlaying {
                text: NOT_PLAYING_TEXT,
                link: touch.then(|| Link {
                    label: OPEN_LABEL,
                    href: SPOTIFY_HOME_URL.to_owned(),
                }),
            },
        });

        Self { icon: Some(icon), popup }
    }
}
