//! Reverb - Freeverb-style parallel combs into series allpasses
//!
//! The tail length is given as a decay time; comb feedback is derived so the
//! average comb loop drops by 60dB over that time.

use super::{soft_clip, Effect, WetEnvelope};

/// Comb delays in samples at 44.1kHz
const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass delays in samples at 44.1kHz
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];

/// Extra delay on the right channel, in samples at 44.1kHz
const STEREO_SPREAD: usize = 23;

const DEFAULT_WET: f32 = 0.5;
const DEFAULT_DECAY_SECS: f32 = 2.0;
const DAMPING: f32 = 0.5;

/// Lowpass-feedback comb
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    store: f32,
}

impl Comb {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32) -> f32 {
        let output = self.buffer[self.index];
        self.store = output * (1.0 - DAMPING) + self.store * DAMPING;
        self.buffer[self.index] = input + self.store * feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.store = 0.0;
        self.index = 0;
    }
}

/// Schroeder allpass with a fixed 0.5 coefficient
struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        self.buffer[self.index] = input + buffered * 0.5;
        self.index = (self.index + 1) % self.buffer.len();
        buffered - input
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }
}

/// One channel of the tank
struct Tank {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
}

impl Tank {
    fn new(scale: f32, spread: usize) -> Self {
        Self {
            combs: COMB_TUNINGS
                .iter()
                .map(|&t| Comb::new((t as f32 * scale) as usize + spread))
                .collect(),
            allpasses: ALLPASS_TUNINGS
                .iter()
                .map(|&t| Allpass::new((t as f32 * scale) as usize + spread))
                .collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.process(input, feedback);
        }
        out *= 1.0 / COMB_TUNINGS.len() as f32;
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(Comb::clear);
        self.allpasses.iter_mut().for_each(Allpass::clear);
    }
}

pub struct Reverb {
    left: Tank,
    right: Tank,
    wet: f32,
    decay: f32,
    feedback: f32,
    enabled: bool,
    envelope: WetEnvelope,
}

impl Reverb {
    pub fn new(sample_rate: u32) -> Self {
        let sr = sample_rate.max(1) as f32;
        let scale = sr / 44100.0;
        let spread = (STEREO_SPREAD as f32 * scale) as usize;
        let mut reverb = Self {
            left: Tank::new(scale, 0),
            right: Tank::new(scale, spread),
            wet: DEFAULT_WET,
            decay: DEFAULT_DECAY_SECS,
            feedback: 0.0,
            enabled: false,
            envelope: WetEnvelope::new(sample_rate),
        };
        reverb.set_decay(DEFAULT_DECAY_SECS);
        reverb
    }

    /// Tail length in seconds (0.1 - 10)
    pub fn set_decay(&mut self, seconds: f32) {
        self.decay = seconds.clamp(0.1, 10.0);
        let mean_tuning = COMB_TUNINGS.iter().sum::<usize>() as f32 / COMB_TUNINGS.len() as f32;
        let loop_secs = mean_tuning / 44100.0;
        // -60dB after `decay` seconds of loops
        self.feedback = 10f32.powf(-3.0 * loop_secs / self.decay).clamp(0.0, 0.98);
        tracing::trace!(decay = self.decay, feedback = self.feedback, "reverb decay set");
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }
}

impl Effect for Reverb {
    fn process(&mut self, samples: &mut [f32]) {
        if self.envelope.is_silent() {
            return;
        }

        for frame in samples.chunks_exact_mut(2) {
            let mix = self.wet * self.envelope.next();
            let input = (frame[0] + frame[1]) * 0.25;
            let tail_l = self.left.process(input, self.feedback);
            let tail_r = self.right.process(input, self.feedback);
            frame[0] = soft_clip(frame[0] * (1.0 - mix) + tail_l * mix);
            frame[1] = soft_clip(frame[1] * (1.0 - mix) + tail_r * mix);
        }
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
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
        "Reverb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(frames: usize) -> Vec<f32> {
        let mut samples = vec![0.0; frames * 2];
        samples[0] = 0.8;
        samples[1] = 0.8;
        samples
    }

    #[test]
    fn test_disabled_is_transparent() {
        let mut reverb = Reverb::new(48000);
        let mut samples = impulse(256);
        reverb.process(&mut samples);
        assert_eq!(samples, impulse(256));
    }

    #[test]
    fn test_longer_decay_means_more_feedback() {
        let mut reverb = Reverb::new(48000);
        let default_feedback = reverb.feedback;
        reverb.set_decay(5.0);
        assert!(reverb.feedback > default_feedback);
        reverb.set_decay(100.0);
        assert_eq!(reverb.decay(), 10.0);
        assert!(reverb.feedback < 1.0);
    }

    #[test]
    fn test_impulse_leaves_a_tail() {
        let mut reverb = Reverb::new(44100);
        reverb.set_enabled(true);
        reverb.envelope.settle();

        let mut samples = impulse(8192);
        reverb.process(&mut samples);

        // Nothing returns before the shortest comb
        assert!(samples[2..2 * 1000].iter().all(|s| s.abs() < 1e-6));
        let tail = samples[2 * 2000..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(tail > 1e-4);
        assert!(samples.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
    }

    #[test]
    fn test_reset_clears_tail() {
        let mut reverb = Reverb::new(44100);
        reverb.set_enabled(true);
        reverb.envelope.settle();
        let mut samples = impulse(4096);
        reverb.process(&mut samples);

        reverb.reset();
        let mut silence = vec![0.0; 4096];
        reverb.process(&mut silence);
        assert!(silence.iter().all(|s| *s == 0.0));
    }
}
