//! Microphone channel - input ring buffer, gain and level meter
//!
//! The cpal input callback owns a [`MicInputWriter`]; the render path owns
//! the matching [`MicInputReader`] inside [`MicChannel`]. Samples that do not
//! fit are dropped rather than blocking either side.

use platter_analysis::{AnalyserTap, MIC_FFT_SIZE};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use thiserror::Error;

/// Ring buffer capacity in frames
const INPUT_RING_BUFFER_FRAMES: usize = 8192;

/// Microphone errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MicError {
    #[error("no microphone input is available")]
    NoInput,
}

/// Producer half, moved into the input stream closure
pub struct MicInputWriter {
    producer: ringbuf::HeapProd<f32>,
    channels: usize,
}

impl MicInputWriter {
    /// Write interleaved device samples, downmixed to mono
    pub fn write(&mut self, data: &[f32]) {
        let channels = self.channels.max(1);
        for frame in data.chunks(channels) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            // Drop samples if buffer is full (better than blocking)
            let _ = self.producer.try_push(mono);
        }
    }
}

/// Consumer half, read by the render path
pub struct MicInputReader {
    consumer: ringbuf::HeapCons<f32>,
}

impl MicInputReader {
    /// Pop one mono sample, 0.0 on underrun
    #[inline]
    fn read_sample(&mut self) -> f32 {
        self.consumer.try_pop().unwrap_or(0.0)
    }

    /// Discard everything buffered
    fn drain(&mut self) {
        let pending = self.consumer.occupied_len();
        self.consumer.skip(pending);
    }
}

/// Create the writer/reader pair for a device with `channels` input channels
pub fn create_mic_ring_buffer(channels: usize) -> (MicInputWriter, MicInputReader) {
    let rb = HeapRb::<f32>::new(INPUT_RING_BUFFER_FRAMES);
    let (producer, consumer) = rb.split();
    (
        MicInputWriter { producer, channels },
        MicInputReader { consumer },
    )
}

/// Mic strip on the master bus
pub struct MicChannel {
    reader: Option<MicInputReader>,
    enabled: bool,
    /// Linear gain (0.0 - 1.0)
    gain: f32,
    analyser: AnalyserTap,
    level: f32,
}

impl MicChannel {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            reader: None,
            enabled: false,
            gain: 1.0,
            analyser: AnalyserTap::new(sample_rate, MIC_FFT_SIZE),
            level: 0.0,
        }
    }

    /// Attach the consumer side of an input stream
    pub fn attach(&mut self, reader: MicInputReader) {
        self.reader = Some(reader);
    }

    pub fn is_attached(&self) -> bool {
        self.reader.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable; enabling without input leaves state unchanged
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), MicError> {
        if enabled && self.reader.is_none() {
            return Err(MicError::NoInput);
        }
        if !enabled {
            self.level = 0.0;
            self.analyser.reset();
        }
        self.enabled = enabled;
        tracing::info!(enabled, "microphone");
        Ok(())
    }

    /// Gain in UI units (0 - 100)
    pub fn set_gain(&mut self, value: f32) {
        self.gain = value.clamp(0.0, 100.0) / 100.0;
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Last measured level (0.0 - 1.0)
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Render the mic into interleaved stereo `output` (overwrites)
    ///
    /// A disabled but attached channel still drains its input so stale audio
    /// is not played back when it is switched on.
    pub fn render(&mut self, output: &mut [f32]) {
        let Some(reader) = self.reader.as_mut() else {
            output.fill(0.0);
            return;
        };
        if !self.enabled {
            reader.drain();
            output.fill(0.0);
            return;
        }

        for frame in output.chunks_exact_mut(2) {
            let sample = reader.read_sample() * self.gain;
            frame[0] = sample;
            frame[1] = sample;
        }
        self.analyser.push_stereo(output);
    }

    /// Refresh the level meter from the analyser
    pub fn update_level(&mut self) -> f32 {
        self.level = if self.enabled {
            self.analyser.level()
        } else {
            0.0
        };
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_without_input_fails() {
        let mut mic = MicChannel::new(48000);
        assert_eq!(mic.set_enabled(true), Err(MicError::NoInput));
        assert!(!mic.is_enabled());
        assert_eq!(mic.set_enabled(false), Ok(()));
    }

    #[test]
    fn test_gain_units() {
        let mut mic = MicChannel::new(48000);
        mic.set_gain(50.0);
        assert_eq!(mic.gain(), 0.5);
        mic.set_gain(250.0);
        assert_eq!(mic.gain(), 1.0);
    }

    #[test]
    fn test_render_passes_input_through_gain() {
        let (mut writer, reader) = create_mic_ring_buffer(2);
        let mut mic = MicChannel::new(48000);
        mic.attach(reader);
        mic.set_enabled(true).unwrap();
        mic.set_gain(50.0);

        // Stereo input, downmixed to mono
        writer.write(&[0.4, 0.8, 0.2, 0.2]);
        let mut out = vec![1.0; 6];
        mic.render(&mut out);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!((out[1] - 0.3).abs() < 1e-6);
        assert!((out[2] - 0.1).abs() < 1e-6);
        // Underrun reads as silence
        assert_eq!(out[4], 0.0);
    }

    #[test]
    fn test_disabled_channel_drains_input() {
        let (mut writer, reader) = create_mic_ring_buffer(1);
        let mut mic = MicChannel::new(48000);
        mic.attach(reader);

        writer.write(&[0.9; 16]);
        let mut out = vec![0.0; 4];
        mic.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));

        mic.set_enabled(true).unwrap();
        mic.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_level_tracks_input() {
        let (mut writer, reader) = create_mic_ring_buffer(1);
        let mut mic = MicChannel::new(8000);
        mic.attach(reader);
        mic.set_enabled(true).unwrap();

        let tone: Vec<f32> = (0..512)
            .map(|i| (i as f32 * 0.3).sin() * 0.8)
            .collect();
        writer.write(&tone);
        let mut out = vec![0.0; 1024];
        mic.render(&mut out);
        assert!(mic.update_level() > 0.0);

        mic.set_enabled(false).unwrap();
        assert_eq!(mic.update_level(), 0.0);
    }
}
