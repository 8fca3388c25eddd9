//! Crossfader widget - fader position, curve, and the resulting deck gains

use crate::theme::Theme;
use platter_audio::{CrossfaderCurve, DeckId};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Span,
    widgets::{Block, Borders, Widget},
};

/// Widget for displaying the crossfader
pub struct CrossfaderWidget<'a> {
    position: f32, // 0.0 (full A) to 1.0 (full B)
    theme: &'a Theme,
    curve: CrossfaderCurve,
    gains: (f32, f32),
}

impl<'a> CrossfaderWidget<'a> {
    pub fn new(position: f32, theme: &'a Theme) -> Self {
        Self {
            position,
            theme,
            curve: CrossfaderCurve::default(),
            gains: (0.0, 0.0),
        }
    }

    pub fn curve(mut self, curve: CrossfaderCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Effective per-deck gains after the crossfader law
    pub fn gains(mut self, left: f32, right: f32) -> Self {
        self.gains = (left, right);
        self
    }

    /// Column of the knob on a fader `width` cells wide
    fn knob_column(position: f32, width: usize) -> usize {
        (position.clamp(0.0, 1.0) * (width - 1) as f32).round() as usize
    }

    fn put_str(buf: &mut Buffer, area: Rect, mut x: u16, y: u16, text: &str, style: Style) -> u16 {
        for ch in text.chars() {
            if x >= area.x + area.width {
                break;
            }
            buf[(x, y)].set_char(ch).set_style(style);
            x += 1;
        }
        x
    }
}

impl Widget for CrossfaderWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(" CROSSFADER ", self.theme.title()));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width < 10 || inner.height < 1 {
            return;
        }

        let width = inner.width as usize;

        // Row 0: "A:100%  EQUAL_POWER  B:  0%"
        if inner.height >= 2 {
            let left = format!("A:{:3}%", (self.gains.0 * 100.0).round() as u32);
            let right = format!("B:{:3}%", (self.gains.1 * 100.0).round() as u32);
            let curve = self.curve.as_str().to_uppercase();
            let total = left.len() + curve.len() + right.len() + 4;
            let y = inner.y;
            let mut x = inner.x + (width.saturating_sub(total)) as u16 / 2;
            x = Self::put_str(buf, inner, x, y, &left, self.theme.deck_style(DeckId::Left));
            x = Self::put_str(buf, inner, x, y, "  ", self.theme.normal());
            x = Self::put_str(buf, inner, x, y, &curve, self.theme.dim());
            x = Self::put_str(buf, inner, x, y, "  ", self.theme.normal());
            Self::put_str(buf, inner, x, y, &right, self.theme.deck_style(DeckId::Right));
        }

        // The end cells carry the deck labels
        let fader_pos = Self::knob_column(self.position, width).clamp(1, width - 2);

        let mut line = String::with_capacity(width);
        line.push('A');
        for i in 1..width - 1 {
            if i == fader_pos {
                line.push('●');
            } else if i == width / 2 {
                line.push('┼');
            } else {
                line.push('─');
            }
        }
        line.push('B');

        // Fader sits under the gain row when there is room for both
        let y = if inner.height >= 2 { inner.y + 1 } else { inner.y };
        for (i, ch) in line.chars().enumerate() {
            let x = inner.x + i as u16;
            let style = match ch {
                'A' => self.theme.deck_style(DeckId::Left),
                'B' => self.theme.deck_style(DeckId::Right),
                '●' => self.theme.highlight(),
                '┼' => self.theme.dim(),
                _ => self.theme.normal(),
            };
            buf[(x, y)].set_char(ch).set_style(style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knob_column_spans_fader() {
        assert_eq!(CrossfaderWidget::knob_column(0.0, 21), 0);
        assert_eq!(CrossfaderWidget::knob_column(0.5, 21), 10);
        assert_eq!(CrossfaderWidget::knob_column(1.0, 21), 20);
        assert_eq!(CrossfaderWidget::knob_column(7.0, 21), 20);
    }

    #[test]
    fn test_render_shows_curve_and_knob() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 32, 4);
        let mut buf = Buffer::empty(area);
        CrossfaderWidget::new(0.25, &theme)
            .curve(CrossfaderCurve::Linear)
            .gains(0.75, 0.25)
            .render(area, &mut buf);

        let top: String = (0..32u16).map(|x| buf[(x, 1u16)].symbol().to_string()).collect();
        assert!(top.contains("LINEAR"));
        assert!(top.contains("A: 75%"));

        let fader: String = (0..32u16).map(|x| buf[(x, 2u16)].symbol().to_string()).collect();
        assert!(fader.contains('●'));
    }
}
