//! Single-use playback source bound to a deck buffer
//!
//! A source plays forward or backward from its start offset at a signed
//! rate and cannot be rewound. Seeking, stopping and every scratch sample
//! replace the deck's source with a fresh one; the generation id lets the
//! deck ignore end-of-track reports from sources it already replaced.

use crate::buffer::AudioBuffer;
use std::sync::Arc;

pub struct PlaybackSource {
    buffer: Arc<AudioBuffer>,
    /// Read head in buffer frames
    position: f64,
    /// Signed playback rate (0.0 = frozen)
    rate: f64,
    /// Buffer frames per output frame at rate 1.0
    step: f64,
    generation: u64,
    ended: bool,
}

impl PlaybackSource {
    /// Start a source `offset` seconds into the buffer
    pub fn start(
        buffer: Arc<AudioBuffer>,
        offset: f64,
        rate: f64,
        output_rate: u32,
        generation: u64,
    ) -> Self {
        let position = offset.max(0.0) * buffer.sample_rate() as f64;
        let step = buffer.sample_rate() as f64 / output_rate.max(1) as f64;
        Self {
            buffer,
            position,
            rate,
            step,
            generation,
            ended: false,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Retune in place; takes effect from the next rendered frame
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Read head in seconds
    pub fn position_secs(&self) -> f64 {
        self.position / self.buffer.sample_rate() as f64
    }

    /// Render one stereo frame and advance
    #[inline]
    pub fn next_frame(&mut self) -> (f32, f32) {
        if self.ended {
            return (0.0, 0.0);
        }
        if self.rate == 0.0 {
            return (0.0, 0.0);
        }

        let frames = self.buffer.frames() as f64;
        if self.position < 0.0 || self.position >= frames {
            self.ended = true;
            return (0.0, 0.0);
        }

        let frame = self.buffer.frame_at(self.position);
        self.position += self.rate * self.step;
        frame
    }
}
