//! Decoded track audio shared between the loader and a deck

use platter_analysis::{WaveformOverview, OVERVIEW_COLUMNS};
use std::sync::Arc;

/// Immutable decoded audio (interleaved stereo f32)
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    name: Option<String>,
    overview: Arc<WaveformOverview>,
}

impl AudioBuffer {
    /// Wrap interleaved stereo samples; computes the waveform overview
    pub fn new(samples: Vec<f32>, sample_rate: u32, name: Option<String>) -> Self {
        let overview =
            WaveformOverview::from_interleaved(&samples, 2, sample_rate, OVERVIEW_COLUMNS);
        Self {
            samples: Arc::new(samples),
            sample_rate: sample_rate.max(1),
            name,
            overview: Arc::new(overview),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn overview(&self) -> Arc<WaveformOverview> {
        Arc::clone(&self.overview)
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Linearly interpolated stereo frame at a fractional frame index
    #[inline]
    pub fn frame_at(&self, position: f64) -> (f32, f32) {
        let frames = self.frames();
        if frames == 0 || position < 0.0 || position >= frames as f64 {
            return (0.0, 0.0);
        }
        let idx = position as usize;
        let frac = (position - idx as f64) as f32;
        let next = (idx + 1).min(frames - 1);

        let l0 = self.samples[idx * 2];
        let r0 = self.samples[idx * 2 + 1];
        let l1 = self.samples[next * 2];
        let r1 = self.samples[next * 2 + 1];

        (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_and_frames() {
        let buffer = AudioBuffer::new(vec![0.0; 2 * 44100 * 3], 44100, Some("loop".into()));
        assert_eq!(buffer.frames(), 44100 * 3);
        assert!((buffer.duration() - 3.0).abs() < 1e-9);
        assert_eq!(buffer.name(), Some("loop"));
        assert!(!buffer.overview().is_empty());
    }

    #[test]
    fn test_frame_interpolation() {
        let buffer = AudioBuffer::new(vec![0.0, 1.0, 1.0, 0.0], 10, None);
        assert_eq!(buffer.frame_at(0.0), (0.0, 1.0));
        assert_eq!(buffer.frame_at(0.5), (0.5, 0.5));
        assert_eq!(buffer.frame_at(-0.1), (0.0, 0.0));
        assert_eq!(buffer.frame_at(2.0), (0.0, 0.0));
    }
}
