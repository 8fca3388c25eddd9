//! Master VU meter - deck and mic levels with peak hold

use crate::theme::Theme;
use platter_audio::DeckId;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Span,
    widgets::{Block, Borders, Widget},
};

const MIN_DB: f32 = -48.0;
const MAX_DB: f32 = 6.0;
const DB_MARKERS: [i32; 7] = [6, 0, -6, -12, -24, -36, -48];

/// One vertical meter column
#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    level: f32,
    peak_hold: f32,
    active: bool,
}

/// Vertical meters for both decks and the microphone
pub struct MasterVuMeterWidget<'a> {
    theme: &'a Theme,
    deck_a: Channel,
    deck_b: Channel,
    mic: Channel,
    master_volume: f32,
}

impl<'a> MasterVuMeterWidget<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self {
            theme,
            deck_a: Channel {
                active: true,
                ..Channel::default()
            },
            deck_b: Channel {
                active: true,
                ..Channel::default()
            },
            mic: Channel::default(),
            master_volume: 1.0,
        }
    }

    pub fn levels(mut self, level_a: f32, level_b: f32) -> Self {
        self.deck_a.level = level_a;
        self.deck_b.level = level_b;
        self
    }

    pub fn peak_holds(mut self, peak_a: f32, peak_b: f32) -> Self {
        self.deck_a.peak_hold = peak_a;
        self.deck_b.peak_hold = peak_b;
        self
    }

    /// Mic level; an inactive mic draws as an empty meter
    pub fn mic(mut self, level: f32, peak_hold: f32, enabled: bool) -> Self {
        self.mic = Channel {
            level,
            peak_hold,
            active: enabled,
        };
        self
    }

    pub fn master_volume(mut self, volume: f32) -> Self {
        self.master_volume = volume;
        self
    }

    /// Convert linear level to dB
    fn level_to_db(level: f32) -> f32 {
        if level <= 0.0 {
            -60.0
        } else {
            20.0 * level.log10()
        }
    }

    /// Map dB value to meter position (0.0-1.0)
    fn db_to_position(db: f32) -> f32 {
        ((db - MIN_DB) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0)
    }

    fn color_for_db(&self, db: f32) -> Style {
        if db > 0.0 {
            Style::default().fg(self.theme.danger)
        } else if db > -6.0 {
            Style::default().fg(self.theme.warning)
        } else {
            Style::default().fg(self.theme.accent)
        }
    }

    /// Draw one row of one meter column at (x, y)
    fn render_meter_row(&self, buf: &mut Buffer, x: u16, y: u16, channel: Channel, row: usize, rows: usize) {
        let row_ratio = row as f32 / (rows - 1) as f32;
        let row_db = MAX_DB - row_ratio * (MAX_DB - MIN_DB);
        let threshold = 1.0 - row_ratio;
        let peak_row_size = 1.0 / rows as f32;

        let fill = Self::db_to_position(Self::level_to_db(channel.level));
        let peak = Self::db_to_position(Self::level_to_db(channel.peak_hold));
        let color = self.color_for_db(row_db);

        let (fill_char, fill_style) = if !channel.active {
            ('·', self.theme.dim())
        } else if channel.level > 1.0 && row == 0 {
            ('!', Style::default().fg(self.theme.danger))
        } else if peak >= threshold && peak < threshold + peak_row_size {
            ('▓', color)
        } else if fill >= threshold {
            ('█', color)
        } else {
            (' ', self.theme.normal())
        };

        buf[(x, y)].set_char('┃').set_style(self.theme.dim());
        buf[(x + 1, y)].set_char(fill_char).set_style(fill_style);
        buf[(x + 2, y)].set_char('┃').set_style(self.theme.dim());
    }
}

impl Widget for MasterVuMeterWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(" VU ", self.theme.title()));

        let inner = block.inner(area);
        block.render(area, buf);

        // scale + three meters with gaps
        const SCALE_WIDTH: u16 = 3;
        const METER_WIDTH: u16 = 3;
        const GAP: u16 = 1;
        let content_width = SCALE_WIDTH + 1 + METER_WIDTH * 3 + GAP * 2;
        if inner.width < content_width || inner.height < 5 {
            return;
        }

        // Meters, then a label row and a master volume row
        let meter_height = inner.height as usize - 2;
        let start_x = inner.x + (inner.width - content_width) / 2;
        let meters_x = start_x + SCALE_WIDTH + 1;
        let columns = [
            (self.deck_a, 'A', self.theme.deck_style(DeckId::Left)),
            (self.deck_b, 'B', self.theme.deck_style(DeckId::Right)),
            (self.mic, 'M', self.theme.normal()),
        ];

        for row in 0..meter_height {
            let y = inner.y + row as u16;

            let marker = DB_MARKERS.iter().find(|&&db| {
                let marker_row =
                    ((MAX_DB - db as f32) / (MAX_DB - MIN_DB) * (meter_height - 1) as f32) as usize;
                marker_row == row
            });
            if let Some(db) = marker {
                for (i, ch) in format!("{:>3}", db).chars().enumerate() {
                    buf[(start_x + i as u16, y)]
                        .set_char(ch)
                        .set_style(self.theme.dim());
                }
            }

            for (i, (channel, _, _)) in columns.iter().enumerate() {
                let x = meters_x + i as u16 * (METER_WIDTH + GAP);
                self.render_meter_row(buf, x, y, *channel, row, meter_height);
            }
        }

        let label_y = inner.y + meter_height as u16;
        for (i, (_, label, style)) in columns.iter().enumerate() {
            let x = meters_x + i as u16 * (METER_WIDTH + GAP) + 1;
            buf[(x, label_y)].set_char(*label).set_style(*style);
        }

        let master = format!("MST {:3}%", (self.master_volume * 100.0).round() as u32);
        let info_y = label_y + 1;
        let info_x = inner.x + inner.width.saturating_sub(master.len() as u16) / 2;
        for (i, ch) in master.chars().enumerate() {
            let x = info_x + i as u16;
            if x < inner.x + inner.width {
                buf[(x, info_y)].set_char(ch).set_style(self.theme.normal());
            }
        }
    }
}
