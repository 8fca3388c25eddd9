//! Per-deck visualizer panel - oscilloscope trace or banded spectrum

use crate::theme::Theme;
use crate::widgets::deck::BAR_CHARS;
use platter_analysis::{VisualFrame, VisualizerMode};
use platter_audio::DeckId;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Widget drawing one deck's [`VisualFrame`]
pub struct VisualizerWidget<'a> {
    frame: Option<&'a VisualFrame>,
    deck: DeckId,
    mode: VisualizerMode,
    theme: &'a Theme,
}

impl<'a> VisualizerWidget<'a> {
    pub fn new(frame: Option<&'a VisualFrame>, deck: DeckId, theme: &'a Theme) -> Self {
        Self {
            frame,
            deck,
            mode: frame.map(|f| f.mode).unwrap_or_default(),
            theme,
        }
    }

    /// Mode to show in the title when there is no frame
    pub fn mode(mut self, mode: VisualizerMode) -> Self {
        if self.frame.is_none() {
            self.mode = mode;
        }
        self
    }

    /// Vertical bar, bottom to top
    fn render_bar(magnitude: f32, height: u16) -> Vec<char> {
        let total_levels = (magnitude.clamp(0.0, 1.0) * 8.0 * height as f32) as usize;
        let full_blocks = total_levels / 8;
        let partial = total_levels % 8;

        (0..height as usize)
            .map(|row| {
                if row < full_blocks {
                    '█'
                } else if row == full_blocks && partial > 0 {
                    BAR_CHARS[partial]
                } else {
                    ' '
                }
            })
            .collect()
    }

    /// Row for an amplitude in -1.0..1.0, 0 at the top
    fn trace_row(sample: f32, height: usize) -> usize {
        let mid_y = height / 2;
        let y_offset = (sample.clamp(-1.0, 1.0) * (mid_y as f32 - 0.5)) as i32;
        (mid_y as i32 - y_offset).clamp(0, height as i32 - 1) as usize
    }

    fn render_waveform(&self, trace: &[f32], inner: Rect, buf: &mut Buffer, style: Style) {
        let width = inner.width as usize;
        let height = inner.height as usize;
        let mid_y = inner.y + (height / 2) as u16;

        for x in 0..width {
            buf[(inner.x + x as u16, mid_y)]
                .set_char('─')
                .set_style(self.theme.dim());
        }

        if trace.is_empty() {
            return;
        }

        for x in 0..width {
            let sample = trace[(x * trace.len() / width).min(trace.len() - 1)];
            let ch = if sample.abs() > 0.7 {
                '█'
            } else if sample.abs() > 0.3 {
                '▓'
            } else if sample.abs() > 0.1 {
                '░'
            } else {
                '·'
            };
            let y = inner.y + Self::trace_row(sample, height) as u16;
            buf[(inner.x + x as u16, y)].set_char(ch).set_style(style);
        }
    }

    fn render_spectrum(&self, bands: &[f32], inner: Rect, buf: &mut Buffer) {
        let width = inner.width as usize;
        let bands_to_show = width.min(bands.len());
        if bands_to_show == 0 {
            return;
        }
        let start_x = (width - bands_to_show) / 2;

        for band in 0..bands_to_show {
            let band_idx = band * bands.len() / bands_to_show;
            let bar = Self::render_bar(bands[band_idx], inner.height);
            let style = self.theme.spectrum_style(band_idx, bands.len());
            let x = inner.x + (start_x + band) as u16;

            for (row, ch) in bar.into_iter().enumerate() {
                if ch != ' ' {
                    let y = inner.y + inner.height - 1 - row as u16;
                    buf[(x, y)].set_char(ch).set_style(style);
                }
            }
        }
    }
}

impl Widget for VisualizerWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!(" {} {} ", self.deck, self.mode.label());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(title, self.theme.title()));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width < 4 || inner.height < 2 {
            return;
        }

        let Some(frame) = self.frame else {
            let line = Line::from(Span::styled("no signal", self.theme.dim()));
            Paragraph::new(line).render(inner, buf);
            return;
        };

        match frame.mode {
            VisualizerMode::Waveform => {
                self.render_waveform(&frame.trace, inner, buf, self.theme.deck_style(self.deck))
            }
            VisualizerMode::Spectrum => self.render_spectrum(&frame.trace, inner, buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bar_partial() {
        assert_eq!(VisualizerWidget::render_bar(0.0, 2), vec![' ', ' ']);
        assert_eq!(VisualizerWidget::render_bar(1.0, 2), vec!['█', '█']);
        assert_eq!(VisualizerWidget::render_bar(0.75, 2), vec!['█', '▄']);
    }

    #[test]
    fn test_trace_row_maps_extremes() {
        assert_eq!(VisualizerWidget::trace_row(0.0, 9), 4);
        assert_eq!(VisualizerWidget::trace_row(1.0, 9), 1);
        assert_eq!(VisualizerWidget::trace_row(-1.0, 9), 7);
    }

    #[test]
    fn test_missing_frame_draws_placeholder() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 20, 5);
        let mut buf = Buffer::empty(area);
        VisualizerWidget::new(None, DeckId::Left, &theme)
            .mode(VisualizerMode::Spectrum)
            .render(area, &mut buf);

        let top: String = (0..20u16).map(|x| buf[(x, 0u16)].symbol().to_string()).collect();
        assert!(top.contains("A SPEC"));
        let row: String = (1..19u16).map(|x| buf[(x, 1u16)].symbol().to_string()).collect();
        assert!(row.starts_with("no signal"));
    }

    #[test]
    fn test_spectrum_bars_grow_from_bottom() {
        let theme = Theme::default();
        let frame = VisualFrame {
            mode: VisualizerMode::Spectrum,
            level: 0.5,
            peak: 0.5,
            trace: vec![1.0, 0.0],
        };
        let area = Rect::new(0, 0, 6, 5);
        let mut buf = Buffer::empty(area);
        VisualizerWidget::new(Some(&frame), DeckId::Right, &theme).render(area, &mut buf);

        // inner is 4x3; two bands centered at x = 2 and 3
        for y in 1..4u16 {
            assert_eq!(buf[(2u16, y)].symbol(), "█");
            assert_eq!(buf[(3u16, y)].symbol(), " ");
        }
    }
}
