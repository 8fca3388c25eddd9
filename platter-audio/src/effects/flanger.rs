//! Flanger - a short delay swept by a sine LFO
//!
//! The delay time swings `depth` either side of `base` at `rate` Hz. Mixing
//! the swept copy with the dry signal gives the moving comb-filter swoosh.

use super::{soft_clip, Effect, WetEnvelope};
use std::f32::consts::PI;

const DEFAULT_BASE_SECS: f32 = 0.005;
const DEFAULT_DEPTH_SECS: f32 = 0.002;
const DEFAULT_RATE_HZ: f32 = 0.25;
const DEFAULT_WET: f32 = 0.5;

pub struct Flanger {
    sample_rate: f32,
    base: f32,
    depth: f32,
    rate: f32,
    wet: f32,
    lfo_phase: f32,
    /// Interleaved stereo ring sized for base + depth
    buffer: Vec<f32>,
    frames: usize,
    write_pos: usize,
    enabled: bool,
    envelope: WetEnvelope,
}

impl Flanger {
    pub fn new(sample_rate: u32) -> Self {
        let sr = sample_rate.max(1) as f32;
        let frames = ((DEFAULT_BASE_SECS + DEFAULT_DEPTH_SECS) * sr) as usize + 4;
        Self {
            sample_rate: sr,
            base: DEFAULT_BASE_SECS,
            depth: DEFAULT_DEPTH_SECS,
            rate: DEFAULT_RATE_HZ,
            wet: DEFAULT_WET,
            lfo_phase: 0.0,
            buffer: vec![0.0; frames * 2],
            frames,
            write_pos: 0,
            enabled: false,
            envelope: WetEnvelope::new(sample_rate),
        }
    }

    /// LFO rate in Hz (0.05 - 5.0)
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.clamp(0.05, 5.0);
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Sweep depth in seconds, limited to the base delay
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, self.base);
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// Delay in frames for the current LFO phase
    #[inline]
    fn swept_delay(&self) -> f32 {
        let secs = self.base + self.depth * (2.0 * PI * self.lfo_phase).sin();
        (secs * self.sample_rate).clamp(1.0, (self.frames - 2) as f32)
    }

    #[inline]
    fn read(&self, delay: f32, channel: usize) -> f32 {
        let whole = delay as usize;
        let frac = delay - whole as f32;
        let newer = (self.write_pos + self.frames - whole) % self.frames;
        let older = (newer + self.frames - 1) % self.frames;
        self.buffer[newer * 2 + channel] * (1.0 - frac) + self.buffer[older * 2 + channel] * frac
    }
}

impl Effect for Flanger {
    fn process(&mut self, samples: &mut [f32]) {
        if self.envelope.is_silent() {
            return;
        }

        let phase_inc = self.rate / self.sample_rate;
        for frame in samples.chunks_exact_mut(2) {
            let mix = self.wet * self.envelope.next();
            let delay = self.swept_delay();

            let idx = self.write_pos * 2;
            self.buffer[idx] = frame[0];
            self.buffer[idx + 1] = frame[1];

            let swept_l = self.read(delay, 0);
            let swept_r = self.read(delay, 1);
            frame[0] = soft_clip(frame[0] * (1.0 - mix) + swept_l * mix);
            frame[1] = soft_clip(frame[1] * (1.0 - mix) + swept_r * mix);

            self.write_pos = (self.write_pos + 1) % self.frames;
            self.lfo_phase = (self.lfo_phase + phase_inc).fract();
        }
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.lfo_phase = 0.0;
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
        "Flanger"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 48000;

    fn sine(frames: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s = (2.0 * PI * 440.0 * i as f32 / SR as f32).sin() * 0.5;
                [s, s]
            })
            .collect()
    }

    #[test]
    fn test_defaults_and_clamping() {
        let mut flanger = Flanger::new(SR);
        assert!(!flanger.is_enabled());
        assert_eq!(flanger.rate(), 0.25);
        assert_eq!(flanger.depth(), 0.002);

        flanger.set_rate(10.0);
        assert_eq!(flanger.rate(), 5.0);
        flanger.set_depth(1.0);
        assert_eq!(flanger.depth(), 0.005);
    }

    #[test]
    fn test_sweep_stays_inside_buffer() {
        let mut flanger = Flanger::new(SR);
        for step in 0..100 {
            flanger.lfo_phase = step as f32 / 100.0;
            let delay = flanger.swept_delay();
            assert!(delay >= 0.003 * SR as f32 - 1.0);
            assert!(delay <= (flanger.frames - 2) as f32);
        }
    }

    #[test]
    fn test_enabled_colours_the_signal() {
        let mut flanger = Flanger::new(SR);
        flanger.set_enabled(true);
        flanger.envelope.settle();

        let input = sine(4800);
        let mut samples = input.clone();
        flanger.process(&mut samples);

        let diff = samples
            .iter()
            .zip(&input)
            .skip(2000)
            .fold(0.0f32, |m, (a, b)| m.max((a - b).abs()));
        assert!(diff > 0.01);
        assert!(samples.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
    }

    #[test]
    fn test_disabled_is_transparent() {
        let mut flanger = Flanger::new(SR);
        let mut samples = sine(512);
        flanger.process(&mut samples);
        assert_eq!(samples, sine(512));
    }
}
