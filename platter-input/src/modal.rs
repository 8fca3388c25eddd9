//! Modal state machine for vim-style input handling

use crate::commands::{Command, Direction, Mode, SCRATCH_VELOCITY};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use platter_audio::{BroadcastSettings, DeckId, EffectKind, EqBand, DEFAULT_MOUNT, DEFAULT_PORT};

const VOLUME_STEP: f32 = 0.05;
const PITCH_STEP: f32 = 0.1;
const PITCH_STEP_COARSE: f32 = 1.0;
const EQ_STEP_DB: f32 = 1.5;
const MASTER_STEP: f32 = 0.05;

/// Handles keyboard input and converts to commands
pub struct InputHandler {
    mode: Mode,
    command_buffer: String,
    /// Deck that scratch, EQ and browser loads apply to
    focused_deck: DeckId,
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            command_buffer: String::new(),
            focused_deck: DeckId::Left,
        }
    }

    pub fn focused_deck(&self) -> DeckId {
        self.focused_deck
    }

    pub fn set_focused_deck(&mut self, deck: DeckId) {
        self.focused_deck = deck;
    }

    /// Get current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Get current command buffer (for display)
    pub fn command_buffer(&self) -> &str {
        &self.command_buffer
    }

    /// Handle a key event and return a command if applicable
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        match self.mode {
            Mode::Normal => self.handle_normal_mode(key),
            Mode::Command => self.handle_command_mode(key),
            Mode::Help => self.handle_help_mode(key),
            Mode::Browser => self.handle_browser_mode(key),
        }
    }

    fn handle_normal_mode(&mut self, key: KeyEvent) -> Option<Command> {
        let focused = self.focused_deck;
        match key.code {
            // Mode switching
            KeyCode::Char(':') => {
                self.mode = Mode::Command;
                self.command_buffer.clear();
                Some(Command::EnterCommandMode)
            }
            KeyCode::Char('?') => {
                self.mode = Mode::Help;
                Some(Command::ToggleHelp)
            }
            KeyCode::Char('/') | KeyCode::Char('o') => {
                self.mode = Mode::Browser;
                Some(Command::EnterBrowserMode)
            }

            // Crossfader
            KeyCode::Char('h') | KeyCode::Left => Some(Command::MoveCrossfader(Direction::Left)),
            KeyCode::Char('l') | KeyCode::Right => Some(Command::MoveCrossfader(Direction::Right)),
            KeyCode::Char('\\') => Some(Command::CenterCrossfader),
            KeyCode::Char('k') => Some(Command::CycleCurve),

            // Master volume
            KeyCode::Up => Some(Command::AdjustMasterVolume(MASTER_STEP)),
            KeyCode::Down => Some(Command::AdjustMasterVolume(-MASTER_STEP)),

            KeyCode::Tab => {
                self.focused_deck = self.focused_deck.other();
                Some(Command::CycleFocus)
            }

            // Scratch the focused deck, one velocity sample per press
            KeyCode::Char(',') => Some(Command::Scratch(focused, -SCRATCH_VELOCITY)),
            KeyCode::Char('.') => Some(Command::Scratch(focused, SCRATCH_VELOCITY)),

            // EQ on focused deck (1-3 raise, shifted 1-3 cut, 0 flat)
            KeyCode::Char('1') => Some(Command::AdjustEq(focused, EqBand::Low, EQ_STEP_DB)),
            KeyCode::Char('2') => Some(Command::AdjustEq(focused, EqBand::Mid, EQ_STEP_DB)),
            KeyCode::Char('3') => Some(Command::AdjustEq(focused, EqBand::High, EQ_STEP_DB)),
            KeyCode::Char('!') => Some(Command::AdjustEq(focused, EqBand::Low, -EQ_STEP_DB)),
            KeyCode::Char('@') => Some(Command::AdjustEq(focused, EqBand::Mid, -EQ_STEP_DB)),
            KeyCode::Char('#') => Some(Command::AdjustEq(focused, EqBand::High, -EQ_STEP_DB)),
            KeyCode::Char('0') => Some(Command::ResetEq(focused)),

            // Effects on focused deck
            KeyCode::Char('5') => Some(Command::ToggleEffect(focused, EffectKind::Reverb)),
            KeyCode::Char('6') => Some(Command::ToggleEffect(focused, EffectKind::Delay)),
            KeyCode::Char('7') => Some(Command::ToggleEffect(focused, EffectKind::Filter)),
            KeyCode::Char('8') => Some(Command::ToggleEffect(focused, EffectKind::Flanger)),

            // Deck A controls (lowercase)
            KeyCode::Char('a') => Some(Command::Toggle(DeckId::Left)),
            KeyCode::Char('z') => Some(Command::Stop(DeckId::Left)),
            KeyCode::Char('p') => Some(Command::TogglePower(DeckId::Left)),
            KeyCode::Char('x') => Some(Command::Cue(DeckId::Left)),
            KeyCode::Char('-') => Some(Command::AdjustVolume(DeckId::Left, -VOLUME_STEP)),
            KeyCode::Char('=') => Some(Command::AdjustVolume(DeckId::Left, VOLUME_STEP)),
            KeyCode::Char('[') => Some(Command::AdjustPitch(DeckId::Left, -PITCH_STEP)),
            KeyCode::Char(']') => Some(Command::AdjustPitch(DeckId::Left, PITCH_STEP)),
            KeyCode::Char('9') => Some(Command::ResetPitch(DeckId::Left)),

            // Deck B controls (uppercase)
            KeyCode::Char('A') => Some(Command::Toggle(DeckId::Right)),
            KeyCode::Char('Z') => Some(Command::Stop(DeckId::Right)),
            KeyCode::Char('P') => Some(Command::TogglePower(DeckId::Right)),
            KeyCode::Char('X') => Some(Command::Cue(DeckId::Right)),
            KeyCode::Char('_') => Some(Command::AdjustVolume(DeckId::Right, -VOLUME_STEP)),
            KeyCode::Char('+') => Some(Command::AdjustVolume(DeckId::Right, VOLUME_STEP)),
            KeyCode::Char('{') => Some(Command::AdjustPitch(DeckId::Right, -PITCH_STEP)),
            KeyCode::Char('}') => Some(Command::AdjustPitch(DeckId::Right, PITCH_STEP)),
            KeyCode::Char('(') => Some(Command::ResetPitch(DeckId::Right)),

            // Coarse pitch on the focused deck
            KeyCode::Char('<') => Some(Command::AdjustPitch(focused, -PITCH_STEP_COARSE)),
            KeyCode::Char('>') => Some(Command::AdjustPitch(focused, PITCH_STEP_COARSE)),

            // Master bus
            KeyCode::Char('m') => Some(Command::ToggleMic),
            KeyCode::Char('r') => Some(Command::ToggleRecording),
            KeyCode::Char('b') => Some(Command::ToggleBroadcast),
            KeyCode::Char('v') => Some(Command::ToggleVisualizer),

            // Quit
            KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Command::Quit)
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Command::Quit)
            }

            KeyCode::Esc => Some(Command::Cancel),

            _ => None,
        }
    }

    fn handle_command_mode(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Enter => {
                let cmd = parse_command(&self.command_buffer);
                self.mode = match cmd {
                    Some(Command::ToggleHelp) => Mode::Help,
                    Some(Command::BrowseFolder(_)) => Mode::Browser,
                    _ => Mode::Normal,
                };
                let buffer = std::mem::take(&mut self.command_buffer);
                cmd.or(Some(Command::ExecuteCommand(buffer)))
            }
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.command_buffer.clear();
                Some(Command::EnterNormalMode)
            }
            KeyCode::Backspace => {
                self.command_buffer.pop();
                if self.command_buffer.is_empty() {
                    self.mode = Mode::Normal;
                    Some(Command::EnterNormalMode)
                } else {
                    None
                }
            }
            KeyCode::Char(c) => {
                self.command_buffer.push(c);
                None
            }
            _ => None,
        }
    }

    fn handle_help_mode(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
                self.mode = Mode::Normal;
                Some(Command::ToggleHelp)
            }
            KeyCode::Char('j') | KeyCode::Down => Some(Command::HelpScrollDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Command::HelpScrollUp),
            _ => None,
        }
    }

    fn handle_browser_mode(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                Some(Command::EnterNormalMode)
            }

            KeyCode::Char('j') | KeyCode::Down => Some(Command::BrowserSelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Command::BrowserSelectPrev),
            KeyCode::Char('g') => Some(Command::BrowserSelectFirst),
            KeyCode::Char('G') => Some(Command::BrowserSelectLast),

            KeyCode::Char('a') => {
                self.mode = Mode::Normal;
                Some(Command::BrowserLoadToDeck(DeckId::Left))
            }
            KeyCode::Char('b') => {
                self.mode = Mode::Normal;
                Some(Command::BrowserLoadToDeck(DeckId::Right))
            }
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                Some(Command::BrowserLoadToDeck(self.focused_deck))
            }

            _ => None,
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Parse a `:` command line
pub fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();

    match input {
        "q" | "quit" => return Some(Command::Quit),
        "help" => return Some(Command::ToggleHelp),
        "record" | "rec" => return Some(Command::ToggleRecording),
        "offair" => return Some(Command::StopBroadcast),
        "mic" => return Some(Command::ToggleMic),
        _ => {}
    }

    let (verb, rest) = input.split_once(' ').unwrap_or((input, ""));
    let rest = rest.trim();

    match verb {
        // load a|b <path>
        "load" => {
            let (deck, path) = rest.split_once(' ')?;
            let deck = deck.parse::<DeckId>().ok()?;
            let path = unquote(path);
            (!path.is_empty()).then(|| Command::LoadTrack(deck, path.into()))
        }
        "cd" | "browse" => {
            let path = unquote(rest);
            (!path.is_empty()).then(|| Command::BrowseFolder(path.into()))
        }
        "theme" => (!rest.is_empty()).then(|| Command::SetTheme(rest.to_string())),
        "curve" => rest.parse().ok().map(Command::SetCurve),
        // fx a|b <effect>
        "fx" => {
            let (deck, kind) = rest.split_once(' ')?;
            let deck = deck.parse::<DeckId>().ok()?;
            let kind = kind.trim().parse::<EffectKind>().ok()?;
            Some(Command::ToggleEffect(deck, kind))
        }
        "xfade" => {
            let pos: f32 = rest.parse().ok()?;
            Some(Command::SetCrossfader(pos))
        }
        "mic" => {
            let gain: f32 = rest.parse().ok()?;
            Some(Command::SetMicGain(gain))
        }
        "record" | "rec" => rest.parse().ok().map(Command::StartRecording),
        // broadcast <server> [port] [mount] [key]
        "broadcast" => {
            let mut parts = rest.split_whitespace();
            let server = parts.next()?.to_string();
            let port = match parts.next() {
                Some(p) => p.parse().ok()?,
                None => DEFAULT_PORT,
            };
            let mount = parts.next().unwrap_or(DEFAULT_MOUNT).to_string();
            let stream_key = parts.next().unwrap_or_default().to_string();
            Some(Command::StartBroadcast(BroadcastSettings {
                server,
                port,
                mount,
                stream_key,
            }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platter_audio::{CrossfaderCurve, RecordingFormat};

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn type_line(handler: &mut InputHandler, line: &str) -> Option<Command> {
        handler.handle_key(key(':'));
        for c in line.chars() {
            handler.handle_key(key(c));
        }
        handler.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
    }

    #[test]
    fn test_scratch_keys_follow_focus() {
        let mut handler = InputHandler::new();
        assert!(matches!(
            handler.handle_key(key('.')),
            Some(Command::Scratch(DeckId::Left, v)) if v == SCRATCH_VELOCITY
        ));
        handler.handle_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        assert_eq!(handler.focused_deck(), DeckId::Right);
        assert!(matches!(
            handler.handle_key(key(',')),
            Some(Command::Scratch(DeckId::Right, v)) if v == -SCRATCH_VELOCITY
        ));
    }

    #[test]
    fn test_deck_keys() {
        let mut handler = InputHandler::new();
        assert!(matches!(handler.handle_key(key('a')), Some(Command::Toggle(DeckId::Left))));
        assert!(matches!(handler.handle_key(key('A')), Some(Command::Toggle(DeckId::Right))));
        assert!(matches!(handler.handle_key(key('P')), Some(Command::TogglePower(DeckId::Right))));
        assert!(matches!(
            handler.handle_key(key('!')),
            Some(Command::AdjustEq(DeckId::Left, EqBand::Low, d)) if d < 0.0
        ));
        assert!(handler.handle_key(key('q')).is_none());
        assert!(matches!(
            handler.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        ));
    }

    #[test]
    fn test_command_mode_load() {
        let mut handler = InputHandler::new();
        match type_line(&mut handler, "load b '/music/my track.mp3'") {
            Some(Command::LoadTrack(DeckId::Right, path)) => {
                assert_eq!(path.to_str(), Some("/music/my track.mp3"))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(handler.mode(), Mode::Normal);
        assert!(handler.command_buffer().is_empty());
    }

    #[test]
    fn test_command_mode_unparsed_falls_through() {
        let mut handler = InputHandler::new();
        assert!(matches!(
            type_line(&mut handler, "frobnicate"),
            Some(Command::ExecuteCommand(s)) if s == "frobnicate"
        ));
    }

    #[test]
    fn test_parse_commands() {
        assert!(matches!(parse_command("curve cut"), Some(Command::SetCurve(CrossfaderCurve::Cut))));
        assert!(matches!(
            parse_command("record mp3"),
            Some(Command::StartRecording(RecordingFormat::Mp3))
        ));
        assert!(matches!(parse_command("rec"), Some(Command::ToggleRecording)));
        assert!(matches!(parse_command("xfade 0.25"), Some(Command::SetCrossfader(p)) if p == 0.25));
        assert!(parse_command("load c song.mp3").is_none());
        assert!(parse_command("curve sigmoid").is_none());

        match parse_command("broadcast radio.example.com 8010") {
            Some(Command::StartBroadcast(s)) => {
                assert_eq!(s.server, "radio.example.com");
                assert_eq!(s.port, 8010);
                assert_eq!(s.mount, DEFAULT_MOUNT);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_effect_keys_follow_focus() {
        let mut handler = InputHandler::new();
        assert!(matches!(
            handler.handle_key(key('5')),
            Some(Command::ToggleEffect(DeckId::Left, EffectKind::Reverb))
        ));
        handler.handle_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        assert!(matches!(
            handler.handle_key(key('8')),
            Some(Command::ToggleEffect(DeckId::Right, EffectKind::Flanger))
        ));
        assert!(matches!(
            parse_command("fx a delay"),
            Some(Command::ToggleEffect(DeckId::Left, EffectKind::Delay))
        ));
        assert!(parse_command("fx b chorus").is_none());
        assert!(parse_command("fx filter").is_none());
    }

    #[test]
    fn test_backspace_leaves_command_mode() {
        let mut handler = InputHandler::new();
        handler.handle_key(key(':'));
        handler.handle_key(key('q'));
        assert_eq!(handler.mode(), Mode::Command);
        assert!(matches!(
            handler.handle_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE)),
            Some(Command::EnterNormalMode)
        ));
        assert_eq!(handler.mode(), Mode::Normal);
    }

    #[test]
    fn test_browser_mode() {
        let mut handler = InputHandler::new();
        assert!(matches!(handler.handle_key(key('o')), Some(Command::EnterBrowserMode)));
        assert_eq!(handler.mode(), Mode::Browser);
        assert!(matches!(handler.handle_key(key('j')), Some(Command::BrowserSelectNext)));
        assert!(matches!(
            handler.handle_key(key('b')),
            Some(Command::BrowserLoadToDeck(DeckId::Right))
        ));
        assert_eq!(handler.mode(), Mode::Normal);
    }

    #[test]
    fn test_help_command_enters_help_mode() {
        let mut handler = InputHandler::new();
        handler.handle_key(key(':'));
        for c in "help".chars() {
            handler.handle_key(key(c));
        }
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert!(matches!(handler.handle_key(enter), Some(Command::ToggleHelp)));
        assert_eq!(handler.mode(), Mode::Help);
        assert!(matches!(handler.handle_key(key('j')), Some(Command::HelpScrollDown)));
        assert!(matches!(handler.handle_key(key('q')), Some(Command::ToggleHelp)));
        assert_eq!(handler.mode(), Mode::Normal);
    }
}
