//! Deck widget - displays track info, overview, and the channel strip

use crate::theme::{Lamp, Theme};
use platter_audio::{DeckState, EffectKind, EQ_RANGE_DB};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Characters for vertical bar rendering (8 levels + empty)
pub(crate) const BAR_CHARS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Widget for displaying a single deck
pub struct DeckWidget<'a> {
    state: &'a DeckState,
    theme: &'a Theme,
    title: &'a str,
    is_focused: bool,
    /// UI-side peak hold of the deck's output level
    peak_hold: f32,
}

impl<'a> DeckWidget<'a> {
    pub fn new(state: &'a DeckState, theme: &'a Theme, title: &'a str) -> Self {
        Self {
            state,
            theme,
            title,
            is_focused: false,
            peak_hold: 0.0,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.is_focused = focused;
        self
    }

    pub fn peak_hold(mut self, peak: f32) -> Self {
        self.peak_hold = peak;
        self
    }

    pub(crate) fn format_time(secs: f64) -> String {
        let secs = secs.max(0.0);
        let mins = (secs / 60.0) as u32;
        let secs = secs % 60.0;
        format!("{:02}:{:05.2}", mins, secs)
    }

    fn render_transport(&self) -> Span<'a> {
        let symbol = if self.state.is_scratching {
            "⟲"
        } else if self.state.is_playing {
            "▶"
        } else {
            "⏹"
        };
        Span::styled(
            format!(" {} ", symbol),
            if self.state.is_playing {
                self.theme.highlight()
            } else {
                self.theme.dim()
            },
        )
    }

    fn render_power(&self) -> Span<'a> {
        if self.state.is_powered_on {
            Span::styled("PWR", self.theme.lamp(Lamp::On))
        } else {
            Span::styled("OFF", self.theme.lamp(Lamp::Off))
        }
    }

    /// Static overview with playhead and cue marker
    fn render_overview(&self, width: usize) -> Line<'a> {
        let overview = match &self.state.overview {
            Some(overview) if !overview.is_empty() && self.state.duration > 0.0 => overview,
            _ => return Line::from(Span::styled("─".repeat(width), self.theme.dim())),
        };

        let progress = self.state.progress();
        let playhead_pos = ((progress * width as f64) as usize).min(width.saturating_sub(1));
        let cue_pos = self.state.cue_point.map(|cue| {
            let cue_progress = (cue / self.state.duration).clamp(0.0, 1.0);
            ((cue_progress * width as f64) as usize).min(width.saturating_sub(1))
        });

        let columns = overview.resample(width);
        let spans = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                if i == playhead_pos {
                    Span::styled("│", self.theme.highlight())
                } else if Some(i) == cue_pos {
                    Span::styled("C", self.theme.highlight().add_modifier(Modifier::BOLD))
                } else {
                    // span is peak-to-peak, 0.0 - 2.0
                    let height = (column.span() / 2.0).clamp(0.0, 1.0);
                    let bar_char = BAR_CHARS[((height * 8.0) as usize).min(8)];
                    Span::styled(
                        bar_char.to_string(),
                        self.theme.waveform_style(i < playhead_pos),
                    )
                }
            })
            .collect::<Vec<_>>();

        Line::from(spans)
    }

    /// LED ladder for a 0.0 - 1.0 value with a peak marker
    pub(crate) fn render_meter(
        value: f32,
        peak_hold: f32,
        width: usize,
        theme: &Theme,
    ) -> Vec<Span<'a>> {
        let filled = (value.clamp(0.0, 1.0) * width as f32) as usize;
        let peak_pos = (peak_hold.clamp(0.0, 1.0) * width as f32) as usize;
        let yellow_threshold = (width as f32 * 0.75) as usize;
        let red_threshold = (width as f32 * 0.90) as usize;

        (0..width)
            .map(|i| {
                let segment_style = if i >= red_threshold {
                    Style::default().fg(theme.danger)
                } else if i >= yellow_threshold {
                    Style::default().fg(theme.warning)
                } else {
                    Style::default().fg(theme.accent)
                };

                if i < filled {
                    Span::styled("█", segment_style)
                } else if i == peak_pos && peak_pos > 0 && peak_pos < width {
                    Span::styled("│", segment_style)
                } else {
                    Span::styled("░", theme.dim())
                }
            })
            .collect()
    }

    /// Lamps for the switched-on effects, in deck colour
    fn effect_spans(&self) -> Vec<Span<'a>> {
        let lamp = self.theme.lamp(Lamp::Deck(self.state.id));
        EffectKind::ALL
            .into_iter()
            .filter(|kind| self.state.effects.is_on(*kind))
            .flat_map(|kind| [Span::raw(" "), Span::styled(kind.label(), lamp)])
            .collect()
    }

    fn eq_span(&self, label: &'static str, gain_db: f32) -> Vec<Span<'a>> {
        let style = if gain_db <= -EQ_RANGE_DB + 0.01 {
            // fully cut, the classic "kill"
            Style::default().fg(self.theme.danger)
        } else if gain_db.abs() < 0.05 {
            self.theme.dim()
        } else {
            Style::default().fg(self.theme.accent)
        };
        vec![
            Span::styled(label, self.theme.dim()),
            Span::styled(format!("{:+5.1} ", gain_db), style),
        ]
    }
}

impl Widget for DeckWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.is_focused {
            self.theme.border_active()
        } else {
            self.theme.border()
        };

        let title_text = if self.is_focused {
            format!(" ► {} ◄ ", self.title)
        } else {
            format!("   {}   ", self.title)
        };
        let title_style = if self.is_focused {
            self.theme.highlight()
        } else {
            self.theme.title()
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(title_text, title_style));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height < 5 || inner.width < 20 {
            return;
        }

        let chunks = Layout::vertical([
            Constraint::Length(1), // Transport + name
            Constraint::Length(1), // Overview
            Constraint::Length(1), // Time / pitch
            Constraint::Length(1), // Volume
            Constraint::Length(1), // EQ
        ])
        .split(inner);

        // Row 1: transport, power, name
        let track_name = self.state.track_name.as_deref().unwrap_or("No track loaded");
        let name_width = (inner.width as usize).saturating_sub(9);
        let truncated_name: String = track_name.chars().take(name_width).collect();
        let line = Line::from(vec![
            self.render_transport(),
            self.render_power(),
            Span::raw(" "),
            Span::styled(truncated_name, self.theme.normal()),
        ]);
        Paragraph::new(line).render(chunks[0], buf);

        // Row 2: overview
        Paragraph::new(self.render_overview(inner.width as usize)).render(chunks[1], buf);

        // Row 3: time, pitch, effective rate
        let remaining = (self.state.duration - self.state.position).max(0.0);
        let time_str = format!(
            "{} -{} ",
            Self::format_time(self.state.position),
            Self::format_time(remaining)
        );
        let pitch_style = if self.state.pitch.abs() < 0.05 {
            self.theme.dim()
        } else {
            Style::from(self.theme.accent)
        };
        let mut spans = vec![
            Span::styled(time_str, self.theme.normal()),
            Span::raw("│ "),
            Span::styled(format!("PITCH:{:+5.1}%", self.state.pitch), pitch_style),
            Span::raw(" │ "),
            Span::styled(format!("×{:.2}", self.state.rate), self.theme.normal()),
        ];
        if self.state.is_scratching {
            spans.push(Span::raw(" "));
            spans.push(Span::styled("SCR", self.theme.lamp(Lamp::On)));
        }
        Paragraph::new(Line::from(spans)).render(chunks[2], buf);

        // Row 4: volume fader with output peak hold
        let meter_width = (inner.width as usize).saturating_sub(10);
        let mut spans = vec![Span::styled("VOL:", self.theme.dim())];
        spans.extend(Self::render_meter(
            self.state.volume,
            self.peak_hold,
            meter_width,
            self.theme,
        ));
        spans.push(Span::styled(
            format!("{:3}%", (self.state.volume * 100.0).round() as u32),
            self.theme.normal(),
        ));
        Paragraph::new(Line::from(spans)).render(chunks[3], buf);

        // Row 5: three-band EQ in dB, then active effects
        let mut spans = self.eq_span("LO", self.state.eq_low);
        spans.extend(self.eq_span("MID", self.state.eq_mid));
        spans.extend(self.eq_span("HI", self.state.eq_high));
        spans.push(Span::styled("dB", self.theme.dim()));
        spans.extend(self.effect_spans());
        Paragraph::new(Line::from(spans)).render(chunks[4], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platter_analysis::WaveformOverview;
    use platter_audio::DeckId;

    fn row_text(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width).map(|x| buf[(x, y)].symbol().to_string()).collect()
    }

    #[test]
    fn test_format_time() {
        assert_eq!(DeckWidget::format_time(0.0), "00:00.00");
        assert_eq!(DeckWidget::format_time(65.5), "01:05.50");
        assert_eq!(DeckWidget::format_time(-3.0), "00:00.00");
    }

    #[test]
    fn test_meter_fill() {
        let theme = Theme::default();
        let spans = DeckWidget::render_meter(0.5, 0.8, 10, &theme);
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "█████░░░│░");
    }

    #[test]
    fn test_render_empty_deck() {
        let theme = Theme::default();
        let state = DeckState::empty(DeckId::Left);
        let area = Rect::new(0, 0, 40, 7);
        let mut buf = Buffer::empty(area);
        DeckWidget::new(&state, &theme, "DECK A").render(area, &mut buf);

        assert!(row_text(&buf, 1, 40).contains("No track loaded"));
        assert!(row_text(&buf, 2, 40).contains("───"));
    }

    #[test]
    fn test_active_effects_show_on_eq_row() {
        let theme = Theme::default();
        let mut state = DeckState::empty(DeckId::Right);
        state.is_powered_on = true;
        state.effects.delay = true;
        state.effects.flanger = true;
        let area = Rect::new(0, 0, 60, 7);
        let mut buf = Buffer::empty(area);
        DeckWidget::new(&state, &theme, "DECK B").render(area, &mut buf);

        let row = row_text(&buf, 5, 60);
        assert!(row.contains("dB DLY FLG"), "{}", row);
        assert!(!row.contains("REV"));
    }

    #[test]
    fn test_render_overview_with_playhead_and_cue() {
        let theme = Theme::default();
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.1).sin()).collect();
        let overview = WaveformOverview::from_interleaved(&samples, 1, 100, 64).into_arc();

        let mut state = DeckState::empty(DeckId::Right);
        state.is_loaded = true;
        state.duration = 10.0;
        state.position = 5.0;
        state.cue_point = Some(0.0);
        state.overview = Some(overview);

        let widget = DeckWidget::new(&state, &theme, "DECK B");
        let line = widget.render_overview(20);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text.chars().nth(10), Some('│'));
        assert_eq!(text.chars().next(), Some('C'));
    }
}
