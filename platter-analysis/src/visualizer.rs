//! Visualizer clock - turns analyser snapshots into per-frame draw data
//!
//! The display alternates between an oscilloscope-style waveform trace and
//! a banded spectrum every few seconds of real time. A deck without an
//! analyser snapshot simply produces no frame.

use crate::analyser::{AnalyserSnapshot, SPECTRUM_BANDS};

/// Seconds between automatic mode switches
pub const MODE_SWITCH_SECS: f64 = 5.0;

/// What the visualizer panel is drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualizerMode {
    #[default]
    Waveform,
    Spectrum,
}

impl VisualizerMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Waveform => Self::Spectrum,
            Self::Spectrum => Self::Waveform,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Waveform => "WAVE",
            Self::Spectrum => "SPEC",
        }
    }
}

/// One frame of draw data for a single deck
#[derive(Debug, Clone, PartialEq)]
pub struct VisualFrame {
    pub mode: VisualizerMode,
    /// VU level (0.0 - 1.0)
    pub level: f32,
    pub peak: f32,
    /// Waveform trace (-1.0 - 1.0) or spectrum bands (0.0 - 1.0)
    pub trace: Vec<f32>,
}

/// Mode clock shared by both deck panels
#[derive(Debug, Clone)]
pub struct Visualizer {
    mode: VisualizerMode,
    switch_interval: f64,
    last_switch: Option<f64>,
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new(MODE_SWITCH_SECS)
    }
}

impl Visualizer {
    pub fn new(switch_interval: f64) -> Self {
        Self {
            mode: VisualizerMode::default(),
            switch_interval: switch_interval.max(0.1),
            last_switch: None,
        }
    }

    pub fn mode(&self) -> VisualizerMode {
        self.mode
    }

    /// Advance the mode clock; `now` is monotonic wall-clock seconds
    pub fn tick(&mut self, now: f64) -> VisualizerMode {
        match self.last_switch {
            None => self.last_switch = Some(now),
            Some(last) if now - last >= self.switch_interval => {
                self.mode = self.mode.toggled();
                self.last_switch = Some(now);
            }
            Some(_) => {}
        }
        self.mode
    }

    /// Flip the mode now and restart the switch timer
    pub fn toggle(&mut self, now: f64) -> VisualizerMode {
        self.mode = self.mode.toggled();
        self.last_switch = Some(now);
        self.mode
    }

    /// Build draw data for one deck; `None` when there is nothing to sample
    pub fn frame(&self, snapshot: Option<&AnalyserSnapshot>) -> Option<VisualFrame> {
        let snapshot = snapshot?;
        let trace = match self.mode {
            VisualizerMode::Waveform => snapshot.time_domain.clone(),
            VisualizerMode::Spectrum => snapshot.spectrum.bands[..SPECTRUM_BANDS].to_vec(),
        };
        Some(VisualFrame {
            mode: self.mode,
            level: snapshot.level,
            peak: snapshot.peak,
            trace,
        })
    }
}
