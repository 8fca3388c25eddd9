//! Status bar widget - mode indicator, command line, and master bus badges

use crate::app::MessageType;
use crate::theme::{Lamp, Theme};
use platter_audio::{BroadcastState, DeckId};
use platter_input::Mode;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

/// Widget for displaying the status bar with mode and command input
pub struct StatusBarWidget<'a> {
    mode: Mode,
    command_buffer: &'a str,
    message: Option<&'a str>,
    message_type: MessageType,
    theme: &'a Theme,
    mic_enabled: bool,
    recording: Option<f64>,
    on_air: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(mode: Mode, command_buffer: &'a str, theme: &'a Theme) -> Self {
        Self {
            mode,
            command_buffer,
            message: None,
            message_type: MessageType::Info,
            theme,
            mic_enabled: false,
            recording: None,
            on_air: false,
        }
    }

    pub fn message(mut self, msg: Option<&'a str>, msg_type: MessageType) -> Self {
        self.message = msg;
        self.message_type = msg_type;
        self
    }

    pub fn mic(mut self, enabled: bool) -> Self {
        self.mic_enabled = enabled;
        self
    }

    /// Elapsed seconds of the running recording, if any
    pub fn recording(mut self, elapsed: Option<f64>) -> Self {
        self.recording = elapsed;
        self
    }

    pub fn broadcast(mut self, state: &BroadcastState) -> Self {
        self.on_air = matches!(state, BroadcastState::OnAir { .. });
        self
    }

    fn mode_string(&self) -> (&'static str, Style) {
        let style = match self.mode {
            Mode::Normal | Mode::Help => self.theme.highlight(),
            Mode::Command => Style::from(self.theme.accent),
            Mode::Browser => self.theme.deck_style(DeckId::Right),
        };
        (self.mode.display_name(), style)
    }

    fn format_elapsed(secs: f64) -> String {
        let secs = secs.max(0.0) as u64;
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    fn badges(&self) -> Line<'a> {
        let mic = Span::styled("MIC", self.theme.lamp(Lamp::when(self.mic_enabled, Lamp::On)));
        let rec = match self.recording {
            Some(elapsed) => Span::styled(
                format!("REC {}", Self::format_elapsed(elapsed)),
                self.theme.lamp(Lamp::Alert),
            ),
            None => Span::styled("REC", self.theme.lamp(Lamp::Off)),
        };
        let live = Span::styled("LIVE", self.theme.lamp(Lamp::when(self.on_air, Lamp::Alert)));
        Line::from(vec![mic, Span::raw(" "), rec, Span::raw(" "), live])
    }
}

impl Widget for StatusBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        let chunks = Layout::horizontal([
            Constraint::Length(10), // Mode indicator
            Constraint::Min(20),    // Command/message area
            Constraint::Length(19), // MIC / REC / LIVE
            Constraint::Length(22), // Help hint
        ])
        .split(area);

        let (mode_text, mode_style) = self.mode_string();
        let mode_line = Line::from(vec![
            Span::raw("["),
            Span::styled(mode_text, mode_style),
            Span::raw("]"),
        ]);
        Paragraph::new(mode_line).render(chunks[0], buf);

        let content = if self.mode == Mode::Command {
            Line::from(vec![
                Span::styled(":", Style::from(self.theme.accent)),
                Span::styled(self.command_buffer, self.theme.normal()),
                Span::styled("█", self.theme.highlight()),
            ])
        } else if let Some(msg) = self.message {
            let msg_style = match self.message_type {
                MessageType::Info => self.theme.dim(),
                MessageType::Success => Style::from(self.theme.accent),
                MessageType::Warning => Style::default().fg(self.theme.warning),
                MessageType::Error => Style::default().fg(self.theme.danger),
            };
            Line::from(Span::styled(msg, msg_style))
        } else {
            Line::from(Span::styled(
                "Ready. Press ? for help, : for commands",
                self.theme.dim(),
            ))
        };
        Paragraph::new(content).render(chunks[1], buf);

        Paragraph::new(self.badges()).render(chunks[2], buf);

        let help = match self.mode {
            Mode::Normal => "Tab:deck  o:files  ?:help",
            Mode::Command => "Enter:run  Esc:cancel",
            Mode::Browser => "j/k:nav  a/b:load",
            Mode::Help => "j/k:scroll  Esc:close",
        };
        let help_line = Line::from(Span::styled(help, self.theme.dim()));
        Paragraph::new(help_line).render(chunks[3], buf);
    }
}

/// Help overlay widget with scrolling support
pub struct HelpWidget<'a> {
    theme: &'a Theme,
    scroll: u16,
}

impl<'a> HelpWidget<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme, scroll: 0 }
    }

    pub fn scroll(mut self, scroll: u16) -> Self {
        self.scroll = scroll;
        self
    }

    pub(crate) fn help_lines() -> Vec<&'static str> {
        vec![
            "╔════════════════════════════════════════════════════════════════╗",
            "║                PLATTER - two decks and a mixer                 ║",
            "║                  ↑/↓ or j/k to scroll                          ║",
            "╠════════════════════════════════════════════════════════════════╣",
            "║ TRANSPORT                    DECK A        DECK B              ║",
            "║   Play/Pause                   a             A                 ║",
            "║   Stop                         z             Z                 ║",
            "║   Power on/off                 p             P                 ║",
            "║   Cue (set / preview)          x             X                 ║",
            "║   Volume ±                    -/=           _/+                ║",
            "║   Pitch ±0.1%                 [/]           {/}                ║",
            "║   Reset pitch                  9             (                 ║",
            "╠────────────────────────────────────────────────────────────────╣",
            "║ FOCUSED DECK (Tab switches)                                    ║",
            "║   , / .         Scratch back / forward                         ║",
            "║   < / >         Pitch ±1%                                      ║",
            "║   1 / 2 / 3     Boost low / mid / high EQ                      ║",
            "║   ! / @ / #     Cut low / mid / high EQ                        ║",
            "║   0             Flatten EQ                                     ║",
            "║   5 / 6         Toggle reverb / delay                          ║",
            "║   7 / 8         Toggle band-pass filter / flanger              ║",
            "╠────────────────────────────────────────────────────────────────╣",
            "║ MIXER                                                          ║",
            "║   h / l         Crossfader left / right                        ║",
            "║   \\             Center crossfader                              ║",
            "║   k             Cycle curve: equal power / linear / cut        ║",
            "║   ↑ / ↓         Master volume                                  ║",
            "╠────────────────────────────────────────────────────────────────╣",
            "║ MASTER BUS                                                     ║",
            "║   m             Microphone on/off                              ║",
            "║   r             Start / stop recording                         ║",
            "║   b             Go on air / off air                            ║",
            "║   v             Switch visualizer waveform / spectrum          ║",
            "╠────────────────────────────────────────────────────────────────╣",
            "║ COMMANDS (:)                                                   ║",
            "║   :load a <path>      Load track to deck A                     ║",
            "║   :load b <path>      Load track to deck B                     ║",
            "║   :cd <folder>        Browse a folder                          ║",
            "║   :curve <name>       equal_power / linear / cut               ║",
            "║   :xfade <0-1>        Set crossfader position                  ║",
            "║   :fx a|b <effect>    reverb / delay / filter / flanger        ║",
            "║   :mic <gain>         Set microphone gain                      ║",
            "║   :record <format>    Record as wav / mp3 / webm               ║",
            "║   :broadcast <host> [port] [mount] [key]                       ║",
            "║   :offair             Stop broadcasting                        ║",
            "║   :theme <name>       default / amber / cyber                  ║",
            "║   :q                  Quit                                     ║",
            "╠────────────────────────────────────────────────────────────────╣",
            "║ FILE BROWSER (press / or o to open)                            ║",
            "║   j / k         Navigate down / up                             ║",
            "║   g / G         Jump to first / last file                      ║",
            "║   Enter         Load selected file to focused deck             ║",
            "║   a / b         Load to deck A / B                             ║",
            "║   Esc           Close browser                                  ║",
            "╠════════════════════════════════════════════════════════════════╣",
            "║               Press Esc or ? to close help                     ║",
            "║                  Ctrl-Q to quit Platter                        ║",
            "╚════════════════════════════════════════════════════════════════╝",
        ]
    }
}

impl Widget for HelpWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                buf[(x, y)].set_char(' ').set_style(self.theme.normal());
            }
        }

        let help_text = Self::help_lines();
        let total_lines = help_text.len() as u16;
        let visible_lines = area.height.min(total_lines);

        let max_scroll = total_lines.saturating_sub(visible_lines);
        let scroll = self.scroll.min(max_scroll);

        let start_x = area.x + area.width.saturating_sub(68) / 2;

        for (i, line) in help_text
            .iter()
            .skip(scroll as usize)
            .take(visible_lines as usize)
            .enumerate()
        {
            let y = area.y + i as u16;
            for (j, ch) in line.chars().enumerate() {
                let x = start_x + j as u16;
                if x >= area.x + area.width {
                    break;
                }

                let style = if matches!(
                    ch,
                    '║' | '╔' | '╗' | '╚' | '╝' | '═' | '╠' | '╣' | '─' | '│'
                ) {
                    self.theme.border()
                } else {
                    self.theme.normal()
                };

                buf[(x, y)].set_char(ch).set_style(style);
            }
        }

        if total_lines > visible_lines {
            let indicator = format!(" [{}/{}] ", scroll + 1, max_scroll + 1);
            let indicator_x = area.x + area.width.saturating_sub(indicator.len() as u16 + 2);
            let indicator_y = area.y + area.height - 1;

            for (i, ch) in indicator.chars().enumerate() {
                let x = indicator_x + i as u16;
                if x < area.x + area.width {
                    buf[(x, indicator_y)]
                        .set_char(ch)
                        .set_style(self.theme.dim());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, width: u16) -> String {
        (0..width).map(|x| buf[(x, 0u16)].symbol().to_string()).collect()
    }

    #[test]
    fn test_help_box_is_rectangular() {
        let lines = HelpWidget::help_lines();
        let width = lines[0].chars().count();
        for line in &lines {
            assert_eq!(line.chars().count(), width, "{}", line);
        }
    }

    #[test]
    fn test_command_line_shows_buffer() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 90, 1);
        let mut buf = Buffer::empty(area);
        StatusBarWidget::new(Mode::Command, "load a x.mp3", &theme).render(area, &mut buf);
        let text = row(&buf, 90);
        assert!(text.starts_with("[COMMAND]"));
        assert!(text.contains(":load a x.mp3"));
    }

    #[test]
    fn test_badges_show_recording_time() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 90, 1);
        let mut buf = Buffer::empty(area);
        StatusBarWidget::new(Mode::Normal, "", &theme)
            .mic(true)
            .recording(Some(75.0))
            .broadcast(&BroadcastState::Offline)
            .render(area, &mut buf);
        assert!(row(&buf, 90).contains("MIC REC 01:15 LIVE"));
    }
}
