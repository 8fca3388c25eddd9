//! Audio analysis module for Platter
//!
//! Provides analyser taps for metering, a static waveform overview of
//! loaded tracks, and the visualizer mode clock.

mod analyser;
mod visualizer;
mod waveform;

pub use analyser::{
    AnalyserSnapshot, AnalyserTap, SpectrumData, DECK_FFT_SIZE, MIC_FFT_SIZE, SPECTRUM_BANDS,
};
pub use visualizer::{VisualFrame, Visualizer, VisualizerMode, MODE_SWITCH_SECS};
pub use waveform::{WaveformColumn, WaveformOverview, OVERVIEW_COLUMNS};
