//! Band-pass filter effect
//!
//! RBJ constant-peak band-pass biquad, fully wet once faded in. Leaves a
//! telephone-like slice of the track around the centre frequency.

use super::{Effect, WetEnvelope};
use std::f32::consts::PI;

const DEFAULT_CENTER_HZ: f32 = 1000.0;
const DEFAULT_Q: f32 = 1.0;

/// Direct form I history for one channel
#[derive(Debug, Default, Clone, Copy)]
struct History {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

pub struct BandPass {
    sample_rate: f32,
    center: f32,
    q: f32,
    b0: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    history: [History; 2],
    enabled: bool,
    envelope: WetEnvelope,
}

impl BandPass {
    pub fn new(sample_rate: u32) -> Self {
        let mut filter = Self {
            sample_rate: sample_rate.max(1) as f32,
            center: DEFAULT_CENTER_HZ,
            q: DEFAULT_Q,
            b0: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            history: [History::default(); 2],
            enabled: false,
            envelope: WetEnvelope::new(sample_rate),
        };
        filter.update_coefficients();
        filter
    }

    /// Centre frequency in Hz, kept below Nyquist
    pub fn set_center(&mut self, hz: f32) {
        self.center = hz.clamp(20.0, self.sample_rate * 0.45);
        self.update_coefficients();
    }

    pub fn center(&self) -> f32 {
        self.center
    }

    /// Resonance (0.1 - 20.0)
    pub fn set_q(&mut self, q: f32) {
        self.q = q.clamp(0.1, 20.0);
        self.update_coefficients();
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    fn update_coefficients(&mut self) {
        let center = self.center.min(self.sample_rate * 0.45);
        let (sin_w, cos_w) = (2.0 * PI * center / self.sample_rate).sin_cos();
        let alpha = sin_w / (2.0 * self.q);
        let a0 = 1.0 + alpha;

        // b1 is zero for the band-pass
        self.b0 = alpha / a0;
        self.b2 = -alpha / a0;
        self.a1 = -2.0 * cos_w / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    #[inline]
    fn filter(&mut self, input: f32, channel: usize) -> f32 {
        let h = &mut self.history[channel];
        let output = self.b0 * input + self.b2 * h.x2 - self.a1 * h.y1 - self.a2 * h.y2;
        h.x2 = h.x1;
        h.x1 = input;
        h.y2 = h.y1;
        h.y1 = output;
        output
    }
}

impl Effect for BandPass {
    fn process(&mut self, samples: &mut [f32]) {
        if self.envelope.is_silent() {
            return;
        }

        for frame in samples.chunks_exact_mut(2) {
            let wet = self.envelope.next();
            let l = self.filter(frame[0], 0);
            let r = self.filter(frame[1], 1);
            frame[0] = frame[0] * (1.0 - wet) + l * wet;
            frame[1] = frame[1] * (1.0 - wet) + r * wet;
        }
    }

    fn reset(&mut self) {
        self.history = [History::default(); 2];
        self.envelope.settle();
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.envelope.set_enabled(enabled);
    }

    fn name(&self) -> &'static str {
        "Filter"
    }
}
