//! Feedback echo
//!
//! Stereo delay line read with linear interpolation. The feedback path is
//! highpassed at 80Hz and soft-saturated so repeats thin out instead of
//! piling up low end.

use super::{Effect, WetEnvelope};
use std::f32::consts::PI;

/// Longest supported delay time
const MAX_DELAY_SECS: f32 = 2.0;
const FEEDBACK_HIGHPASS_HZ: f32 = 80.0;

const DEFAULT_TIME_SECS: f32 = 0.5;
const DEFAULT_FEEDBACK: f32 = 0.4;
const DEFAULT_WET: f32 = 0.5;

pub struct Delay {
    sample_rate: f32,
    /// Interleaved stereo ring
    buffer: Vec<f32>,
    frames: usize,
    write_pos: usize,
    delay_frames: f32,
    feedback: f32,
    wet: f32,
    hp_coeff: f32,
    hp_state: [f32; 2],
    enabled: bool,
    envelope: WetEnvelope,
}

impl Delay {
    pub fn new(sample_rate: u32) -> Self {
        let sr = sample_rate.max(1) as f32;
        let frames = ((sr * MAX_DELAY_SECS) as usize).max(4);
        let mut delay = Self {
            sample_rate: sr,
            buffer: vec![0.0; frames * 2],
            frames,
            write_pos: 0,
            delay_frames: 0.0,
            feedback: DEFAULT_FEEDBACK,
            wet: DEFAULT_WET,
            hp_coeff: (-2.0 * PI * FEEDBACK_HIGHPASS_HZ / sr).exp(),
            hp_state: [0.0; 2],
            enabled: false,
            envelope: WetEnvelope::new(sample_rate),
        };
        delay.set_time(DEFAULT_TIME_SECS);
        delay
    }

    /// Delay time in seconds, up to two seconds
    pub fn set_time(&mut self, seconds: f32) {
        let max = (self.frames - 2) as f32;
        self.delay_frames = (seconds * self.sample_rate).clamp(1.0, max);
    }

    pub fn time(&self) -> f32 {
        self.delay_frames / self.sample_rate
    }

    /// Feedback amount (0.0 - 0.95)
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.95);
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    #[inline]
    fn read(&self) -> (f32, f32) {
        let whole = self.delay_frames as usize;
        let frac = self.delay_frames - whole as f32;
        let newer = (self.write_pos + self.frames - whole) % self.frames;
        let older = (newer + self.frames - 1) % self.frames;

        let (n, o) = (newer * 2, older * 2);
        (
            self.buffer[n] * (1.0 - frac) + self.buffer[o] * frac,
            self.buffer[n + 1] * (1.0 - frac) + self.buffer[o + 1] * frac,
        )
    }

    /// Fast tanh approximation
    #[inline]
    fn saturate(x: f32) -> f32 {
        x / (1.0 + x.abs())
    }
}

impl Effect for Delay {
    fn process(&mut self, samples: &mut [f32]) {
        if self.envelope.is_silent() {
            return;
        }

        for frame in samples.chunks_exact_mut(2) {
            let mix = self.wet * self.envelope.next();
            let (echo_l, echo_r) = self.read();
            let idx = self.write_pos * 2;

            if self.enabled {
                for (ch, echo) in [(0, echo_l), (1, echo_r)] {
                    let input = frame[ch] + echo * self.feedback;
                    let highpassed = input - self.hp_state[ch];
                    self.hp_state[ch] = input * (1.0 - self.hp_coeff) + self.hp_state[ch] * self.hp_coeff;
                    self.buffer[idx + ch] = Self::saturate(highpassed);
                }
            } else {
                // Switched off: stop feeding input and let the repeats decay
                self.buffer[idx] = echo_l * self.feedback;
                self.buffer[idx + 1] = echo_r * self.feedback;
            }

            frame[0] = frame[0] * (1.0 - mix) + echo_l * mix;
            frame[1] = frame[1] * (1.0 - mix) + echo_r * mix;
            self.write_pos = (self.write_pos + 1) % self.frames;
        }
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.hp_state = [0.0; 2];
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
        "Delay"
    }
}
