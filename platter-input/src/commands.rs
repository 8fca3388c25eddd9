//! Command definitions for Platter

use platter_audio::{
    AudioCommand, BroadcastSettings, CrossfaderCurve, DeckId, EffectKind, EqBand, RecordingFormat,
};
use std::path::PathBuf;

/// Crossfader travel per key press
pub const CROSSFADER_STEP: f32 = 0.05;
/// Scratch velocity sample sent per key press
pub const SCRATCH_VELOCITY: f64 = 50.0;

/// Input modes (vim-style)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Command,
    Help,
    Browser,
}

impl Mode {
    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Command => "COMMAND",
            Mode::Help => "HELP",
            Mode::Browser => "BROWSE",
        }
    }
}

/// Navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Commands that can be dispatched from input
#[derive(Debug, Clone)]
pub enum Command {
    // Transport
    Toggle(DeckId),
    Stop(DeckId),
    TogglePower(DeckId),
    Cue(DeckId),
    Scratch(DeckId, f64),

    // Channel strip
    AdjustVolume(DeckId, f32),
    AdjustPitch(DeckId, f32),
    ResetPitch(DeckId),
    AdjustEq(DeckId, EqBand, f32),
    ResetEq(DeckId),
    ToggleEffect(DeckId, EffectKind),

    // Mixer
    SetCrossfader(f32),
    MoveCrossfader(Direction),
    CenterCrossfader,
    SetCurve(CrossfaderCurve),
    CycleCurve,
    AdjustMasterVolume(f32),

    // Mic, recording, broadcast
    ToggleMic,
    SetMicGain(f32),
    ToggleRecording,
    StartRecording(RecordingFormat),
    ToggleBroadcast,
    StartBroadcast(BroadcastSettings),
    StopBroadcast,

    // Track loading
    LoadTrack(DeckId, PathBuf),
    BrowseFolder(PathBuf),
    BrowserSelectNext,
    BrowserSelectPrev,
    BrowserSelectFirst,
    BrowserSelectLast,
    BrowserLoadToDeck(DeckId),

    // UI
    ToggleHelp,
    HelpScrollUp,
    HelpScrollDown,
    ToggleVisualizer,
    SetTheme(String),
    CycleFocus,

    // Mode changes
    EnterCommandMode,
    EnterNormalMode,
    EnterBrowserMode,

    // Application
    Quit,
    Cancel,

    // Command mode input that didn't parse
    ExecuteCommand(String),
}

impl Command {
    /// The engine command this maps to directly, if any
    ///
    /// Commands that need application state (curve cycling, toggles that
    /// depend on configuration, loading) return `None`.
    pub fn audio_command(&self) -> Option<AudioCommand> {
        let cmd = match *self {
            Command::Toggle(deck) => AudioCommand::Toggle(deck),
            Command::Stop(deck) => AudioCommand::Stop(deck),
            Command::TogglePower(deck) => AudioCommand::TogglePower(deck),
            Command::Cue(deck) => AudioCommand::Cue(deck),
            Command::Scratch(deck, velocity) => AudioCommand::Scratch(deck, velocity),
            Command::AdjustVolume(deck, delta) => AudioCommand::AdjustVolume(deck, delta),
            Command::AdjustPitch(deck, delta) => AudioCommand::AdjustPitch(deck, delta),
            Command::ResetPitch(deck) => AudioCommand::SetPitch(deck, 0.0),
            Command::AdjustEq(deck, band, delta) => AudioCommand::AdjustEq(deck, band, delta),
            Command::ResetEq(deck) => AudioCommand::ResetEq(deck),
            Command::ToggleEffect(deck, kind) => AudioCommand::ToggleEffect(deck, kind),
            Command::SetCrossfader(pos) => AudioCommand::SetCrossfader(pos),
            Command::MoveCrossfader(Direction::Left) => {
                AudioCommand::MoveCrossfader(-CROSSFADER_STEP)
            }
            Command::MoveCrossfader(Direction::Right) => {
                AudioCommand::MoveCrossfader(CROSSFADER_STEP)
            }
            Command::CenterCrossfader => AudioCommand::CenterCrossfader,
            Command::SetCurve(curve) => AudioCommand::SetCrossfaderCurve(curve),
            Command::AdjustMasterVolume(delta) => AudioCommand::AdjustMasterVolume(delta),
            Command::ToggleMic => AudioCommand::ToggleMic,
            Command::SetMicGain(gain) => AudioCommand::SetMicGain(gain),
            Command::ToggleRecording => AudioCommand::ToggleRecording,
            Command::StopBroadcast => AudioCommand::StopBroadcast,
            _ => return None,
        };
        Some(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_mappings() {
        assert!(matches!(
            Command::Toggle(DeckId::Left).audio_command(),
            Some(AudioCommand::Toggle(DeckId::Left))
        ));
        assert!(matches!(
            Command::ResetPitch(DeckId::Right).audio_command(),
            Some(AudioCommand::SetPitch(DeckId::Right, p)) if p == 0.0
        ));
        assert!(matches!(
            Command::ToggleEffect(DeckId::Right, EffectKind::Delay).audio_command(),
            Some(AudioCommand::ToggleEffect(DeckId::Right, EffectKind::Delay))
        ));
        match Command::MoveCrossfader(Direction::Left).audio_command() {
            Some(AudioCommand::MoveCrossfader(delta)) => assert_eq!(delta, -CROSSFADER_STEP),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_stateful_commands_have_no_mapping() {
        assert!(Command::CycleCurve.audio_command().is_none());
        assert!(Command::ToggleBroadcast.audio_command().is_none());
        assert!(Command::LoadTrack(DeckId::Left, "x.wav".into())
            .audio_command()
            .is_none());
    }
}
