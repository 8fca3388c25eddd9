//! Application state management (Elm architecture)

use crate::theme::Theme;
use crate::widgets::BrowserState;
use platter_analysis::{VisualFrame, Visualizer};
use platter_audio::{AudioEvent, DeckId, SessionState};
use platter_input::Mode;

/// Frames a peak is held before it starts to fall (~667ms at 30fps)
const PEAK_HOLD_FRAMES: u16 = 20;
const PEAK_DECAY_RATE: f32 = 0.92;

/// UI-side peak hold for classic analog meter behaviour
#[derive(Debug, Clone, Copy, Default)]
pub struct PeakHold {
    peak: f32,
    hold_frames: u16,
}

impl PeakHold {
    /// Feed the current level once per frame; returns the held peak
    pub fn update(&mut self, level: f32) -> f32 {
        if level > self.peak {
            self.peak = level;
            self.hold_frames = PEAK_HOLD_FRAMES;
        } else if self.hold_frames > 0 {
            self.hold_frames -= 1;
        } else {
            self.peak *= PEAK_DECAY_RATE;
            if self.peak < 0.001 {
                self.peak = 0.0;
            }
        }
        self.peak
    }

    pub fn value(&self) -> f32 {
        self.peak
    }
}

/// Message type for colored status messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageType {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// Application state
pub struct AppState {
    /// Latest snapshot from the mixer session
    pub session: SessionState,

    // UI state
    pub mode: Mode,
    pub focused: DeckId,
    pub command_buffer: String,
    pub message: Option<String>,
    pub message_type: MessageType,
    pub show_help: bool,
    pub help_scroll: u16,

    // File browser
    pub browser: BrowserState,
    pub show_browser: bool,

    pub theme: Theme,

    // Animation state
    pub frame_count: u64,
    pub visualizer: Visualizer,
    /// Draw data per deck for the current frame
    pub frames: [Option<VisualFrame>; 2],
    /// Peak holds for deck A, deck B and the mic
    pub deck_peaks: [PeakHold; 2],
    pub mic_peak: PeakHold,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            session: SessionState::default(),
            mode: Mode::Normal,
            focused: DeckId::Left,
            command_buffer: String::new(),
            message: None,
            message_type: MessageType::Info,
            show_help: false,
            help_scroll: 0,
            browser: BrowserState::default(),
            show_browser: true,
            theme: Theme::default(),
            frame_count: 0,
            visualizer: Visualizer::default(),
            frames: [None, None],
            deck_peaks: [PeakHold::default(); 2],
            mic_peak: PeakHold::default(),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update state from audio engine event
    pub fn handle_audio_event(&mut self, event: AudioEvent) {
        match event {
            AudioEvent::StateUpdate(state) => {
                self.session = *state;
            }
            AudioEvent::TrackLoaded(deck) => {
                self.set_success(format!("Track loaded to deck {}", deck));
            }
            AudioEvent::TrackEnded(deck) => {
                self.set_message(format!("Deck {} reached the end of the track", deck));
            }
            AudioEvent::MicChanged(on) => {
                self.set_message(if on { "Mic on" } else { "Mic off" });
            }
            AudioEvent::RecordingStarted(path) => {
                self.set_success(format!("Recording to {}", path.display()));
            }
            AudioEvent::RecordingSaved(summary) => {
                let secs = summary.duration_secs as u64;
                self.set_success(format!(
                    "Saved {} ({}:{:02})",
                    summary.path.display(),
                    secs / 60,
                    secs % 60
                ));
            }
            AudioEvent::BroadcastStarted(url) => {
                self.set_success(format!("On air: {}", url));
            }
            AudioEvent::BroadcastStopped => {
                self.set_message("Off air");
            }
            AudioEvent::Error(msg) => {
                self.set_error(format!("Error: {}", msg));
            }
        }
    }

    /// Advance per-frame animation; `now` is monotonic wall-clock seconds
    pub fn update_frame(&mut self, now: f64) {
        self.frame_count = self.frame_count.wrapping_add(1);
        self.visualizer.tick(now);

        for deck in DeckId::ALL {
            let idx = deck.index();
            let analyser = self.session.decks[idx].analyser.as_ref();
            self.frames[idx] = self.visualizer.frame(analyser);
            let level = self.frames[idx].as_ref().map_or(0.0, |f| f.level);
            self.deck_peaks[idx].update(level);
        }
        let mic_level = if self.session.mic_enabled {
            self.session.mic_level
        } else {
            0.0
        };
        self.mic_peak.update(mic_level);
    }

    /// Manual waveform/spectrum switch
    pub fn toggle_visualizer(&mut self, now: f64) {
        let mode = self.visualizer.toggle(now);
        self.set_message(format!("Visualizer: {}", mode.label()));
    }

    /// Set current mode
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        if mode != Mode::Command {
            self.command_buffer.clear();
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0;
        }
    }

    pub fn help_scroll_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(3);
    }

    pub fn help_scroll_down(&mut self) {
        self.help_scroll = self.help_scroll.saturating_add(3);
    }

    /// Set theme by name
    pub fn set_theme(&mut self, name: &str) {
        match Theme::by_name(name) {
            Some(theme) => {
                self.theme = theme;
                self.set_success(format!("Theme set to: {}", self.theme.name));
            }
            None => {
                self.set_error(format!("Unknown theme: {}. Use default/amber/cyber", name));
            }
        }
    }

    /// Tab toggles between the two decks
    pub fn cycle_focus(&mut self) {
        self.focused = self.focused.other();
    }

    pub fn clear_message(&mut self) {
        self.message = None;
        self.message_type = MessageType::Info;
    }

    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.message_type = MessageType::Info;
    }

    pub fn set_success(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.message_type = MessageType::Success;
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.message_type = MessageType::Warning;
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.message_type = MessageType::Error;
    }
}

/// Main application wrapper
pub struct App {
    pub state: AppState,
    pub should_quit: bool,
}

impl App {
    pub fn new() -> Self {
        Self {
            state: AppState::new(),
            should_quit: false,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platter_analysis::{AnalyserSnapshot, VisualizerMode};
    use platter_audio::{RecordingFormat, RecordingSummary};
    use std::path::PathBuf;

    #[test]
    fn test_peak_hold_then_decay() {
        let mut hold = PeakHold::default();
        assert_eq!(hold.update(0.8), 0.8);
        for _ in 0..PEAK_HOLD_FRAMES {
            assert_eq!(hold.update(0.1), 0.8);
        }
        let decayed = hold.update(0.1);
        assert!(decayed < 0.8 && decayed > 0.7);
    }

    #[test]
    fn test_peak_hold_falls_to_zero() {
        let mut hold = PeakHold::default();
        hold.update(0.01);
        for _ in 0..200 {
            hold.update(0.0);
        }
        assert_eq!(hold.value(), 0.0);
    }

    #[test]
    fn test_state_update_replaces_session() {
        let mut state = AppState::new();
        let mut session = SessionState::default();
        session.crossfader = 0.2;
        session.decks[1].track_name = Some("Loop".into());
        state.handle_audio_event(AudioEvent::StateUpdate(Box::new(session)));

        assert_eq!(state.session.crossfader, 0.2);
        assert_eq!(state.session.deck(DeckId::Right).track_name.as_deref(), Some("Loop"));
    }

    #[test]
    fn test_event_messages() {
        let mut state = AppState::new();
        state.handle_audio_event(AudioEvent::TrackLoaded(DeckId::Right));
        assert_eq!(state.message.as_deref(), Some("Track loaded to deck B"));
        assert_eq!(state.message_type, MessageType::Success);

        state.handle_audio_event(AudioEvent::RecordingSaved(RecordingSummary {
            path: PathBuf::from("/tmp/set.wav"),
            format: RecordingFormat::Wav,
            duration_secs: 125.0,
        }));
        assert_eq!(state.message.as_deref(), Some("Saved /tmp/set.wav (2:05)"));

        state.handle_audio_event(AudioEvent::Error("no input device".into()));
        assert_eq!(state.message_type, MessageType::Error);
    }

    #[test]
    fn test_theme_switching() {
        let mut state = AppState::new();
        state.set_theme("amber");
        assert_eq!(state.theme.name, "amber");
        assert_eq!(state.message_type, MessageType::Success);

        state.set_theme("solarized");
        assert_eq!(state.theme.name, "amber");
        assert_eq!(state.message_type, MessageType::Error);
    }

    #[test]
    fn test_cycle_focus() {
        let mut state = AppState::new();
        state.cycle_focus();
        assert_eq!(state.focused, DeckId::Right);
        state.cycle_focus();
        assert_eq!(state.focused, DeckId::Left);
    }

    #[test]
    fn test_frames_follow_analysers() {
        let mut state = AppState::new();
        state.session.decks[0].analyser = Some(AnalyserSnapshot {
            level: 0.5,
            peak: 0.6,
            time_domain: vec![0.0; 8],
            ..AnalyserSnapshot::default()
        });

        state.update_frame(0.0);
        let frame = state.frames[0].as_ref().map(|f| (f.mode, f.trace.len()));
        assert_eq!(frame, Some((VisualizerMode::Waveform, 8)));
        assert!(state.frames[1].is_none());
        assert_eq!(state.deck_peaks[0].value(), 0.5);

        state.toggle_visualizer(1.0);
        state.update_frame(1.1);
        assert_eq!(state.frames[0].as_ref().map(|f| f.mode), Some(VisualizerMode::Spectrum));
    }

    #[test]
    fn test_help_scroll_saturates() {
        let mut state = AppState::new();
        state.toggle_help();
        state.help_scroll_up();
        assert_eq!(state.help_scroll, 0);
        state.help_scroll_down();
        assert_eq!(state.help_scroll, 3);
        state.toggle_help();
        state.toggle_help();
        assert_eq!(state.help_scroll, 0);
    }
}
