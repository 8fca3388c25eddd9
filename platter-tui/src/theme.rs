//! CRT-style themes for Platter

use platter_audio::DeckId;
use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    /// Primary foreground color (text, borders)
    pub fg: Color,
    /// Dimmed foreground (secondary text)
    pub fg_dim: Color,
    /// Background color
    pub bg: Color,
    /// Highlight color (selected items, active elements)
    pub highlight: Color,
    /// Accent color (meters, spectrum peaks)
    pub accent: Color,
    /// Warning color
    pub warning: Color,
    /// Error/danger color
    pub danger: Color,
    /// Deck A color
    pub deck_a: Color,
    /// Deck B color
    pub deck_b: Color,
}

/// Indicator lamp states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lamp {
    Off,
    /// Lit in the accent colour (PWR, MIC, SCR)
    On,
    /// Lit in a deck's colour (effect slots)
    Deck(DeckId),
    /// Blinking danger lamp (REC, LIVE)
    Alert,
}

impl Lamp {
    /// `lit` when `on`, otherwise unlit
    pub fn when(on: bool, lit: Lamp) -> Lamp {
        if on {
            lit
        } else {
            Lamp::Off
        }
    }
}

impl Theme {
    pub fn normal(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn dim(&self) -> Style {
        Style::default().fg(self.fg_dim).bg(self.bg)
    }

    /// Inverted bold, for selection and the playing transport
    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    pub fn border_active(&self) -> Style {
        Style::default().fg(self.highlight)
    }

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    pub fn deck_color(&self, deck: DeckId) -> Color {
        match deck {
            DeckId::Left => self.deck_a,
            DeckId::Right => self.deck_b,
        }
    }

    pub fn deck_style(&self, deck: DeckId) -> Style {
        Style::default().fg(self.deck_color(deck))
    }

    /// Level colour (0.0 - 1.0): accent, then warning above 75%, danger above 90%
    pub fn meter_style(&self, level: f32) -> Style {
        let color = if level > 0.9 {
            self.danger
        } else if level > 0.75 {
            self.warning
        } else {
            self.accent
        };
        Style::default().fg(color)
    }

    /// Spectrum bar colour: deck A hue for bass, deck B hue for treble
    pub fn spectrum_style(&self, band: usize, total_bands: usize) -> Style {
        let ratio = band as f32 / total_bands.max(1) as f32;
        let color = if ratio < 0.33 {
            self.deck_a
        } else if ratio < 0.66 {
            self.accent
        } else {
            self.deck_b
        };
        Style::default().fg(color)
    }

    /// Overview colour: played part bright, remainder dim
    pub fn waveform_style(&self, is_played: bool) -> Style {
        Style::default().fg(if is_played { self.accent } else { self.fg_dim })
    }

    pub fn lamp(&self, lamp: Lamp) -> Style {
        let lit = |color| {
            Style::default()
                .fg(self.bg)
                .bg(color)
                .add_modifier(Modifier::BOLD)
        };
        match lamp {
            Lamp::Off => Style::default().fg(self.fg_dim),
            Lamp::On => lit(self.accent),
            Lamp::Deck(deck) => lit(self.deck_color(deck)),
            Lamp::Alert => lit(self.danger).add_modifier(Modifier::SLOW_BLINK),
        }
    }

    /// Look up a built-in theme by name
    pub fn by_name(name: &str) -> Option<Theme> {
        match name.to_lowercase().as_str() {
            "default" | "green" | "phosphor" | "phosphor-green" => Some(CRT_GREEN),
            "amber" | "orange" => Some(CRT_AMBER),
            "cyber" | "cyberpunk" | "neon" => Some(CYBERPUNK),
            _ => None,
        }
    }
}

/// Classic phosphor green CRT theme
pub const CRT_GREEN: Theme = Theme {
    name: "phosphor-green",
    fg: Color::Rgb(51, 255, 51),        // #33ff33 - phosphor green
    fg_dim: Color::Rgb(25, 128, 25),    // dimmed green
    bg: Color::Rgb(0, 10, 0),           // near black with green tint
    highlight: Color::Rgb(180, 255, 180), // bright green
    accent: Color::Rgb(100, 255, 100),  // medium green
    warning: Color::Rgb(255, 255, 100), // yellow-green
    danger: Color::Rgb(255, 100, 100),  // red warning
    deck_a: Color::Rgb(100, 255, 150),  // green-cyan
    deck_b: Color::Rgb(150, 255, 100),  // yellow-green
};

/// Amber CRT theme (1980s monochrome)
pub const CRT_AMBER: Theme = Theme {
    name: "amber",
    fg: Color::Rgb(255, 176, 0),        // #ffb000 - amber
    fg_dim: Color::Rgb(128, 88, 0),     // dimmed amber
    bg: Color::Rgb(10, 5, 0),           // near black with amber tint
    highlight: Color::Rgb(255, 220, 128), // bright amber
    accent: Color::Rgb(255, 200, 64),   // medium amber
    warning: Color::Rgb(255, 255, 100), // yellow
    danger: Color::Rgb(255, 100, 100),  // red warning
    deck_a: Color::Rgb(255, 180, 50),   // orange-amber
    deck_b: Color::Rgb(255, 220, 100),  // yellow-amber
};

/// Cyberpunk neon theme
pub const CYBERPUNK: Theme = Theme {
    name: "cyberpunk",
    fg: Color::Rgb(0, 255, 255),        // cyan
    fg_dim: Color::Rgb(0, 128, 128),    // dim cyan
    bg: Color::Rgb(5, 0, 10),           // dark purple-black
    highlight: Color::Rgb(255, 0, 255), // magenta
    accent: Color::Rgb(0, 255, 128),    // neon green
    warning: Color::Rgb(255, 255, 0),   // yellow
    danger: Color::Rgb(255, 50, 50),    // red
    deck_a: Color::Rgb(255, 100, 255),  // pink
    deck_b: Color::Rgb(100, 255, 255),  // light cyan
};

impl Default for Theme {
    fn default() -> Self {
        CRT_GREEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_lookup() {
        assert_eq!(Theme::by_name("default").map(|t| t.name), Some("phosphor-green"));
        assert_eq!(Theme::by_name("AMBER").map(|t| t.name), Some("amber"));
        assert_eq!(Theme::by_name("neon").map(|t| t.name), Some("cyberpunk"));
        assert!(Theme::by_name("solarized").is_none());
    }

    #[test]
    fn test_meter_zones() {
        let theme = CRT_GREEN;
        assert_eq!(theme.meter_style(0.5).fg, Some(theme.accent));
        assert_eq!(theme.meter_style(0.8).fg, Some(theme.warning));
        assert_eq!(theme.meter_style(0.95).fg, Some(theme.danger));
    }

    #[test]
    fn test_lamps() {
        let theme = CYBERPUNK;
        assert_eq!(theme.lamp(Lamp::Off).bg, None);
        assert_eq!(theme.lamp(Lamp::On).bg, Some(theme.accent));
        assert_eq!(theme.lamp(Lamp::Deck(DeckId::Right)).bg, Some(theme.deck_b));

        let alert = theme.lamp(Lamp::Alert);
        assert_eq!(alert.bg, Some(theme.danger));
        assert!(alert.add_modifier.contains(Modifier::SLOW_BLINK));
        assert!(!theme.lamp(Lamp::On).add_modifier.contains(Modifier::SLOW_BLINK));

        assert_eq!(Lamp::when(false, Lamp::Alert), Lamp::Off);
        assert_eq!(Lamp::when(true, Lamp::On), Lamp::On);
    }
}
