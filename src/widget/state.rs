use crate::models::{PlaybackSnapshot, SPOTIFY_HOME_URL};
use serde::Serialize;

/// What the host device told us about its input hardware when the widget was mounted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub touch_events: bool,
    pub max_touch_points: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Pointer,
    Touch,
}

impl InputMode {
    pub fn detect(capabilities: DeviceCapabilities) -> Self {
        if capabilities.touch_events || capabilities.max_touch_points > 0 {
            Self::Touch
        } else {
            Self::Pointer
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetPhase {
    Loading,
    Idle,
    Playing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigate {
    pub url: String,
    pub new_context: bool,
}

/// What the progress timer should do after a snapshot was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressTimer {
    Restart,
    Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing, nothing moved.
    Ignored,
    Advanced,
    /// Progress hit the duration on this tick; the caller should refresh right away.
    ReachedEnd,
    /// Already clamped at the duration. The early refresh fires once per snapshot, so this tick does not refetch;
    /// the regular refresh timer keeps polling.
    AtEnd,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetState {
    latest_snapshot: Option<PlaybackSnapshot>,
    displayed_progress_ms: u64,
    popup_visible: bool,
    input_mode: InputMode,
    #[serde(skip)]
    end_refresh_requested: bool,
    #[serde(skip)]
    mutations: u64,
}

impl WidgetState {
    pub fn new(input_mode: InputMode) -> Self {
        Self {
            latest_snapshot: None,
            displayed_progress_ms: 0,
            popup_visible: false,
            input_mode,
            end_refresh_requested: false,
            mutations: 0,
        }
    }

    pub fn phase(&self) -> WidgetPhase {
        match &self.latest_snapshot {
            None => WidgetPhase::Loading,
            Some(PlaybackSnapshot::NotPlaying) => WidgetPhase::Idle,
            Some(PlaybackSnapshot::Playing(_)) => WidgetPhase::Playing,
        }
    }

    pub fn latest_snapshot(&self) -> Option<&PlaybackSnapshot> {
        self.latest_snapshot.as_ref()
    }

    pub fn displayed_progress_ms(&self) -> u64 {
        self.displayed_progress_ms
    }

    pub fn popup_visible(&self) -> bool {
        self.popup_visible
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    /// Number of state changes applied so far.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    /// The outside click listener only exists while a touch popup is open.
    pub fn outside_listener_active(&self) -> bool {
        self.input_mode == InputMode::Touch && self.popup_visible
    }

    pub fn external_url(&self) -> &str {
        self.latest_snapshot
            .as_ref()
            .and_then(PlaybackSnapshot::now_playing)
            .map(|track| track.track_url.as_str())
            .unwrap_or(SPOTIFY_HOME_URL)
    }

    /// Replaces the snapshot wholesale. Progress is always re-seeded from the snapshot so local drift is dropped.
    pub fn apply_snapshot(&mut self, snapshot: PlaybackSnapshot) -> ProgressTimer {
        self.displayed_progress_ms = snapshot
            .now_playing()
            .map(|track| track.progress_ms)
            .unwrap_or(0);
        self.end_refresh_requested = false;
        let timer = if snapshot.is_playing() {
            ProgressTimer::Restart
        } else {
            ProgressTimer::Stop
        };
        self.latest_snapshot = Some(snapshot);
        self.mutations += 1;
        timer
    }

    pub fn tick(&mut self, step_ms: u64) -> TickOutcome {
        let Some(duration_ms) = self
            .latest_snapshot
            .as_ref()
            .and_then(PlaybackSnapshot::now_playing)
            .map(|track| track.duration_ms)
        else {
            return TickOutcome::Ignored;
        };

        if self.end_refresh_requested {
            return TickOutcome::AtEnd;
        }

        let next = self.displayed_progress_ms.saturating_add(step_ms);
        self.mutations += 1;
        if next >= duration_ms {
            self.displayed_progress_ms = duration_ms;
            self.end_refresh_requested = true;
            TickOutcome::ReachedEnd
        } else {
            self.displayed_progress_ms = next;
            TickOutcome::Advanced
        }
    }

    fn set_popup_visible(&mut self, visible: bool) -> bool {
        if self.popup_visible == visible {
            return false;
        }
        self.popup_visible = visible;
        self.mutations += 1;
        true
    }

    /// Hover is tracked while loading too; the view keeps the popup hidden until a snapshot lands.
    pub fn pointer_enter(&mut self) -> bool {
        if self.input_mode != InputMode::Pointer {
            return false;
        }
        self.set_popup_visible(true)
    }

    pub fn pointer_leave(&mut self) -> bool {
        if self.input_mode != InputMode::Pointer {
            return false;
        }
        self.set_popup_visible(false)
    }

    /// A click or tap on the icon. Pointer users are sent to the track; touch users toggle the popup instead.
    pub fn click_widget(&mut self) -> Option<Navigate> {
        if self.phase() == WidgetPhase::Loading {
            return None;
        }
        match self.input_mode {
            InputMode::Pointer => Some(Navigate {
                url: self.external_url().to_owned(),
                new_context: true,
            }),
            InputMode::Touch => {
                let visible = !self.popup_visible;
                self.set_popup_visible(visible);
                None
            }
        }
    }

    /// The explicit "Listen on Spotify" affordance, only rendered inside an open touch popup.
    pub fn click_listen_link(&self) -> Option<Navigate> {
        if !self.outside_listener_active() || self.phase() == WidgetPhase::Loading {
            return None;
        }
        Some(Navigate {
            url: self.external_url().to_owned(),
            new_context: true,
        })
    }

    /// A click or tap anywhere on the page. Returns true when it closed the popup.
    pub fn document_click(&mut self, inside_widget: bool) -> bool {
        if inside_widget || !self.outside_listener_active() {
            return false;
        }
        self.set_popup_visible(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NowPlaying;

    fn playing(progress_ms: u64, duration_ms: u64) -> PlaybackSnapshot {
        PlaybackSnapshot::Playing(NowPlaying {
            title: "Song".into(),
            artist: "Artist".into(),
            album: "Album".into(),
            album_image_url: None,
            track_url: "https://open.spotify.com/track/1".into(),
            progress_ms,
            duration_ms,
        })
    }

    #[test]
    fn detects_touch_from_either_capability() {
        assert_eq!(
            InputMode::detect(DeviceCapabilities::default()),
            InputMode::Pointer
        );
        assert_eq!(
            InputMode::detect(DeviceCapabilities {
                touch_events: true,
                max_touch_points: 0
            }),
            InputMode::Touch
        );
        assert_eq!(
            InputMode::detect(DeviceCapabilities {
                touch_events: false,
                max_touch_points: 5
            }),
            InputMode::Touch
        );
    }

    #[test]
    fn phases_follow_snapshots() {
        let mut state = WidgetState::new(InputMode::Pointer);
        assert_eq!(state.phase(), WidgetPhase::Loading);

        assert_eq!(
            state.apply_snapshot(PlaybackSnapshot::NotPlaying),
            ProgressTimer::Stop
        );
        assert_eq!(state.phase(), WidgetPhase::Idle);

        assert_eq!(state.apply_snapshot(playing(0, 1000)), ProgressTimer::Restart);
        assert_eq!(state.phase(), WidgetPhase::Playing);
    }

    #[test]
    fn playing_snapshot_reseeds_progress() {
        let mut state = WidgetState::new(InputMode::Pointer);
        state.apply_snapshot(playing(10_000, 200_000));
        state.tick(1000);
        state.tick(1000);
        assert_eq!(state.displayed_progress_ms(), 12_000);

        state.apply_snapshot(playing(11_500, 200_000));
        assert_eq!(state.displayed_progress_ms(), 11_500);
    }

    #[test]
    fn progress_clamps_and_requests_one_refresh() {
        let mut state = WidgetState::new(InputMode::Pointer);
        state.apply_snapshot(playing(0, 3000));

        let outcomes = [state.tick(1000), state.tick(1000), state.tick(1000)];

        assert_eq!(
            outcomes,
            [
                TickOutcome::Advanced,
                TickOutcome::Advanced,
                TickOutcome::ReachedEnd
            ]
        );
        assert_eq!(state.displayed_progress_ms(), 3000);
        assert_eq!(state.tick(1000), TickOutcome::AtEnd);
        assert_eq!(state.displayed_progress_ms(), 3000);
    }

    #[test]
    fn overshooting_tick_clamps_to_duration() {
        let mut state = WidgetState::new(InputMode::Pointer);
        state.apply_snapshot(playing(2500, 3000));
        assert_eq!(state.tick(1000), TickOutcome::ReachedEnd);
        assert_eq!(state.displayed_progress_ms(), 3000);
    }

    #[test]
    fn ticks_do_nothing_unless_playing() {
        let mut state = WidgetState::new(InputMode::Pointer);
        assert_eq!(state.tick(1000), TickOutcome::Ignored);
        state.apply_snapshot(PlaybackSnapshot::NotPlaying);
        assert_eq!(state.tick(1000), TickOutcome::Ignored);
        assert_eq!(state.displayed_progress_ms(), 0);
    }

    #[test]
    fn pointer_hover_drives_visibility() {
        let mut state = WidgetState::new(InputMode::Pointer);
        state.apply_snapshot(PlaybackSnapshot::NotPlaying);

        assert!(state.pointer_enter());
        assert!(state.popup_visible());
        assert_eq!(
            state.click_widget(),
            Some(Navigate {
                url: SPOTIFY_HOME_URL.into(),
                new_context: true
            })
        );
        assert!(state.popup_visible());
        assert!(state.pointer_leave());
        assert!(!state.popup_visible());
    }

    #[test]
    fn pointer_click_opens_track() {
        let mut state = WidgetState::new(InputMode::Pointer);
        state.apply_snapshot(playing(0, 1000));
        let navigate = state.click_widget().unwrap();
        assert_eq!(navigate.url, "https://open.spotify.com/track/1");
        assert!(!state.outside_listener_active());
    }

    #[test]
    fn touch_tap_toggles_without_navigating() {
        let mut state = WidgetState::new(InputMode::Touch);
        state.apply_snapshot(playing(0, 1000));

        assert!(!state.pointer_enter());
        assert_eq!(state.click_widget(), None);
        assert!(state.popup_visible());
        assert!(state.outside_listener_active());

        assert_eq!(
            state.click_listen_link().map(|n| n.url),
            Some("https://open.spotify.com/track/1".to_owned())
        );

        assert_eq!(state.click_widget(), None);
        assert!(!state.popup_visible());
        assert_eq!(state.click_listen_link(), None);
    }

    #[test]
    fn touch_outside_tap_closes_popup() {
        let mut state = WidgetState::new(InputMode::Touch);
        state.apply_snapshot(PlaybackSnapshot::NotPlaying);
        state.click_widget();

        assert!(!state.document_click(true));
        assert!(state.popup_visible());
        assert!(state.document_click(false));
        assert!(!state.popup_visible());
        assert!(!state.document_click(false));
    }

    #[test]
    fn loading_never_opens_popup() {
        let mut pointer = WidgetState::new(InputMode::Pointer);
        assert_eq!(pointer.click_widget(), None);

        let mut touch = WidgetState::new(InputMode::Touch);
        assert_eq!(touch.click_widget(), None);
        assert!(!touch.popup_visible());
        assert_eq!(touch.mutations(), 0);
    }

    #[test]
    fn hover_during_loading_survives_first_snapshot() {
        let mut state = WidgetState::new(InputMode::Pointer);
        assert!(state.pointer_enter());
        assert_eq!(state.phase(), WidgetPhase::Loading);

        state.apply_snapshot(playing(0, 1000));
        assert!(state.popup_visible());

        assert!(state.pointer_leave());
        assert!(!state.popup_visible());
    }
}
