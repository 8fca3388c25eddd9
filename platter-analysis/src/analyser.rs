//! Analyser tap - read-only frequency/time-domain snapshots of a signal chain
//!
//! Sits after a deck's gain stage (or on the microphone channel) and keeps
//! the most recent `fft_size` mono samples. Frequency data follows the usual
//! browser analyser conventions: Blackman window, magnitude smoothing over
//! time, and a dB window mapped onto 0..=255.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// FFT size used for deck analysers
pub const DECK_FFT_SIZE: usize = 2048;
/// FFT size used for the microphone level meter
pub const MIC_FFT_SIZE: usize = 256;
/// Number of log-spaced bands in a spectrum snapshot
pub const SPECTRUM_BANDS: usize = 32;

/// Banded spectrum for display
#[derive(Clone, Copy, Debug, Default)]
pub struct SpectrumData {
    /// Magnitude per band (0.0 - 1.0)
    pub bands: [f32; SPECTRUM_BANDS],
    /// Peak sample level (0.0 - 1.0)
    pub peak: f32,
}

/// Everything a visualizer needs from one analyser read
#[derive(Clone, Debug, Default)]
pub struct AnalyserSnapshot {
    /// Average of the byte frequency data, normalized to 0.0 - 1.0
    pub level: f32,
    /// Peak absolute sample value in the window
    pub peak: f32,
    /// Decimated time-domain trace (-1.0 - 1.0), oldest first
    pub time_domain: Vec<f32>,
    pub spectrum: SpectrumData,
}

/// Ring-buffered analyser with lazily computed FFT
pub struct AnalyserTap {
    sample_rate: u32,
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    history: Vec<f32>,
    write_pos: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    /// Smoothed linear magnitudes, one per bin below Nyquist
    smoothed: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
    band_bins: [(usize, usize); SPECTRUM_BANDS],
}

impl AnalyserTap {
    /// Create an analyser; `fft_size` is rounded up to a power of two (min 32)
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        let fft_size = fft_size.max(32).next_power_of_two();
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        // Blackman window
        let n = fft_size as f32;
        let window = (0..fft_size)
            .map(|i| {
                let x = i as f32 / n;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();

        Self {
            sample_rate,
            fft_size,
            fft,
            window,
            history: vec![0.0; fft_size],
            write_pos: 0,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
            smoothed: vec![0.0; fft_size / 2],
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            band_bins: Self::band_bins(sample_rate, fft_size),
        }
    }

    /// Log-spaced bin ranges from 20Hz up to 20kHz (or Nyquist)
    fn band_bins(sample_rate: u32, fft_size: usize) -> [(usize, usize); SPECTRUM_BANDS] {
        let bin_width = sample_rate as f32 / fft_size as f32;
        let max_bin = fft_size / 2;
        let log_min = 20.0f32.ln();
        let log_max = 20000.0f32.min(sample_rate as f32 / 2.0).max(40.0).ln();

        let mut bins = [(0usize, 1usize); SPECTRUM_BANDS];
        for (i, range) in bins.iter_mut().enumerate() {
            let lo = (log_min + (log_max - log_min) * i as f32 / SPECTRUM_BANDS as f32).exp();
            let hi = (log_min + (log_max - log_min) * (i + 1) as f32 / SPECTRUM_BANDS as f32).exp();
            let start = ((lo / bin_width) as usize).min(max_bin - 1);
            let end = ((hi / bin_width) as usize).clamp(start + 1, max_bin);
            *range = (start, end);
        }
        bins
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frequency bins (half the FFT size)
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Feed mono samples
    pub fn push(&mut self, samples: &[f32]) {
        for &s in samples {
            self.history[self.write_pos] = s;
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    /// Feed interleaved stereo samples (downmixed to mono)
    pub fn push_stereo(&mut self, interleaved: &[f32]) {
        for frame in interleaved.chunks_exact(2) {
            self.history[self.write_pos] = (frame[0] + frame[1]) * 0.5;
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    /// Clear history and smoothing state
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.smoothed.fill(0.0);
        self.write_pos = 0;
    }

    /// Time-domain window, oldest sample first
    pub fn time_domain(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.fft_size);
        out.extend_from_slice(&self.history[self.write_pos..]);
        out.extend_from_slice(&self.history[..self.write_pos]);
        out
    }

    /// Time-domain window as bytes, 128 = silence
    pub fn byte_time_domain_data(&self) -> Vec<u8> {
        self.time_domain()
            .into_iter()
            .map(|s| (128.0 * (1.0 + s)).clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Peak absolute sample in the current window
    pub fn peak(&self) -> f32 {
        self.history.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// Run the FFT and update smoothed magnitudes
    fn update_magnitudes(&mut self) {
        let start = self.write_pos;
        for i in 0..self.fft_size {
            let sample = self.history[(start + i) % self.fft_size];
            self.fft_buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        let scale = 1.0 / self.fft_size as f32;
        for (prev, bin) in self.smoothed.iter_mut().zip(self.fft_buffer.iter()) {
            let magnitude = bin.norm() * scale;
            *prev = self.smoothing * *prev + (1.0 - self.smoothing) * magnitude;
        }
    }

    #[inline]
    fn magnitude_to_byte(&self, magnitude: f32) -> u8 {
        if magnitude <= 0.0 {
            return 0;
        }
        let db = 20.0 * magnitude.log10();
        let scaled = 255.0 * (db - self.min_db) / (self.max_db - self.min_db);
        scaled.clamp(0.0, 255.0) as u8
    }

    /// Frequency data as bytes (one per bin)
    pub fn byte_frequency_data(&mut self) -> Vec<u8> {
        self.update_magnitudes();
        self.smoothed
            .iter()
            .map(|&m| self.magnitude_to_byte(m))
            .collect()
    }

    /// Average frequency byte normalized to 0.0 - 1.0 (VU level)
    pub fn level(&mut self) -> f32 {
        let data = self.byte_frequency_data();
        Self::average_level(&data)
    }

    fn average_level(data: &[u8]) -> f32 {
        if data.is_empty() {
            return 0.0;
        }
        let sum: u32 = data.iter().map(|&b| b as u32).sum();
        sum as f32 / data.len() as f32 / 255.0
    }

    /// Take one complete snapshot; `trace_points` bounds the time-domain trace
    pub fn snapshot(&mut self, trace_points: usize) -> AnalyserSnapshot {
        let bytes = self.byte_frequency_data();

        let mut bands = [0.0f32; SPECTRUM_BANDS];
        for (band, &(start, end)) in bands.iter_mut().zip(self.band_bins.iter()) {
            let slice = &bytes[start..end];
            let sum: u32 = slice.iter().map(|&b| b as u32).sum();
            *band = sum as f32 / slice.len() as f32 / 255.0;
        }

        let peak = self.peak().min(1.0);
        let time_domain = decimate(&self.time_domain(), trace_points);

        AnalyserSnapshot {
            level: Self::average_level(&bytes),
            peak,
            time_domain,
            spectrum: SpectrumData { bands, peak },
        }
    }
}

/// Reduce a trace to at most `points` values, keeping the signed extreme of each bucket
fn decimate(samples: &[f32], points: usize) -> Vec<f32> {
    if points == 0 || samples.is_empty() {
        return Vec::new();
    }
    if samples.len() <= points {
        return samples.to_vec();
    }
    let bucket = samples.len() as f32 / points as f32;
    (0..points)
        .map(|i| {
            let start = (i as f32 * bucket) as usize;
            let end = (((i + 1) as f32 * bucket) as usize).clamp(start + 1, samples.len());
            samples[start..end]
                .iter()
                .copied()
                .fold(0.0f32, |acc, s| if s.abs() > acc.abs() { s } else { acc })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * 0.8)
            .collect()
    }

    #[test]
    fn test_silence_reads_zero() {
        let mut tap = AnalyserTap::new(48000, DECK_FFT_SIZE);
        tap.push(&vec![0.0; 4096]);
        assert!(tap.byte_frequency_data().iter().all(|&b| b == 0));
        assert_eq!(tap.level(), 0.0);
        assert!(tap.byte_time_domain_data().iter().all(|&b| b == 128));
    }

    #[test]
    fn test_fft_size_rounds_up() {
        let tap = AnalyserTap::new(44100, 1000);
        assert_eq!(tap.fft_size(), 1024);
        assert_eq!(tap.frequency_bin_count(), 512);
    }

    #[test]
    fn test_sine_peaks_in_expected_bin() {
        let sample_rate = 48000;
        let mut tap = AnalyserTap::new(sample_rate, DECK_FFT_SIZE);
        tap.push(&sine(1500.0, sample_rate, DECK_FFT_SIZE));

        // Let the smoothing settle
        let mut data = Vec::new();
        for _ in 0..20 {
            data = tap.byte_frequency_data();
        }

        let (loudest, _) = data
            .iter()
            .enumerate()
            .max_by_key(|(_, &b)| b)
            .unwrap();
        let expected = (1500.0 / (sample_rate as f32 / DECK_FFT_SIZE as f32)).round() as usize;
        assert!((loudest as i64 - expected as i64).abs() <= 1);
    }

    #[test]
    fn test_time_domain_is_ordered() {
        let mut tap = AnalyserTap::new(8000, 32);
        let ramp: Vec<f32> = (0..40).map(|i| i as f32 / 100.0).collect();
        tap.push(&ramp);

        let window = tap.time_domain();
        assert_eq!(window.len(), 32);
        assert!((window[0] - 0.08).abs() < 1e-6);
        assert!((window[31] - 0.39).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_level_tracks_signal() {
        let mut quiet = AnalyserTap::new(48000, MIC_FFT_SIZE);
        let mut loud = AnalyserTap::new(48000, MIC_FFT_SIZE);
        let signal = sine(440.0, 48000, MIC_FFT_SIZE);
        quiet.push(&signal.iter().map(|s| s * 0.01).collect::<Vec<_>>());
        loud.push(&signal);

        let q = quiet.snapshot(64);
        let l = loud.snapshot(64);
        assert!(l.level > q.level);
        assert!(l.peak > 0.7);
        assert_eq!(l.time_domain.len(), 64);
    }

    #[test]
    fn test_decimate_keeps_extremes() {
        let samples = [0.1, -0.9, 0.2, 0.3];
        assert_eq!(decimate(&samples, 2), vec![-0.9, 0.3]);
        assert_eq!(decimate(&samples, 8), samples.to_vec());
    }
}
