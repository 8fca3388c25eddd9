//! Deck EQ - low shelf, mid bell and high shelf
//!
//! RBJ Audio EQ Cookbook biquads in series, stereo state per band.
//! Gains are in dB and limited to the knob range of ±15dB.

use std::f32::consts::PI;
use std::str::FromStr;

/// Gain range of each EQ knob in dB
pub const EQ_RANGE_DB: f32 = 15.0;

pub const DEFAULT_LOW_FREQ: f32 = 320.0;
pub const DEFAULT_MID_FREQ: f32 = 1000.0;
pub const DEFAULT_HIGH_FREQ: f32 = 3200.0;
const MID_Q: f32 = 1.0;

/// EQ band selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqBand {
    Low,
    Mid,
    High,
}

impl FromStr for EqBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "bass" => Ok(Self::Low),
            "mid" => Ok(Self::Mid),
            "high" | "treble" => Ok(Self::High),
            other => Err(format!("unknown EQ band '{}'", other)),
        }
    }
}

/// Corner frequencies for the three bands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqFrequencies {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

impl Default for EqFrequencies {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_FREQ,
            mid: DEFAULT_MID_FREQ,
            high: DEFAULT_HIGH_FREQ,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BiquadCoeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoeffs {
    const UNITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn low_shelf(sample_rate: f32, freq: f32, gain_db: f32) -> Self {
        if gain_db.abs() < 0.01 {
            return Self::UNITY;
        }
        let a = 10.0f32.powf(gain_db / 40.0);
        let (sin_w, cos_w) = omega(sample_rate, freq).sin_cos();
        let alpha = sin_w / 2.0 * 2.0f32.sqrt();
        let k = 2.0 * a.sqrt() * alpha;

        let a0 = (a + 1.0) + (a - 1.0) * cos_w + k;
        Self {
            b0: a * ((a + 1.0) - (a - 1.0) * cos_w + k) / a0,
            b1: 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w) / a0,
            b2: a * ((a + 1.0) - (a - 1.0) * cos_w - k) / a0,
            a1: -2.0 * ((a - 1.0) + (a + 1.0) * cos_w) / a0,
            a2: ((a + 1.0) + (a - 1.0) * cos_w - k) / a0,
        }
    }

    fn high_shelf(sample_rate: f32, freq: f32, gain_db: f32) -> Self {
        if gain_db.abs() < 0.01 {
            return Self::UNITY;
        }
        let a = 10.0f32.powf(gain_db / 40.0);
        let (sin_w, cos_w) = omega(sample_rate, freq).sin_cos();
        let alpha = sin_w / 2.0 * 2.0f32.sqrt();
        let k = 2.0 * a.sqrt() * alpha;

        let a0 = (a + 1.0) - (a - 1.0) * cos_w + k;
        Self {
            b0: a * ((a + 1.0) + (a - 1.0) * cos_w + k) / a0,
            b1: -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w) / a0,
            b2: a * ((a + 1.0) + (a - 1.0) * cos_w - k) / a0,
            a1: 2.0 * ((a - 1.0) - (a + 1.0) * cos_w) / a0,
            a2: ((a + 1.0) - (a - 1.0) * cos_w - k) / a0,
        }
    }

    fn peaking(sample_rate: f32, freq: f32, gain_db: f32, q: f32) -> Self {
        if gain_db.abs() < 0.01 {
            return Self::UNITY;
        }
        let a = 10.0f32.powf(gain_db / 40.0);
        let (sin_w, cos_w) = omega(sample_rate, freq).sin_cos();
        let alpha = sin_w / (2.0 * q);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: -2.0 * cos_w / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: -2.0 * cos_w / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }
}

#[inline]
fn omega(sample_rate: f32, freq: f32) -> f32 {
    // Keep the corner below Nyquist
    2.0 * PI * freq.clamp(10.0, sample_rate * 0.49) / sample_rate
}

/// Direct form I state for one channel
#[derive(Default, Clone, Copy)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f32, c: &BiquadCoeffs) -> f32 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

#[derive(Clone, Copy)]
struct Stage {
    coeffs: BiquadCoeffs,
    left: BiquadState,
    right: BiquadState,
}

impl Stage {
    fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            left: BiquadState::default(),
            right: BiquadState::default(),
        }
    }

    #[inline]
    fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        (
            self.left.process(l, &self.coeffs),
            self.right.process(r, &self.coeffs),
        )
    }
}

/// Three-band deck EQ
pub struct DeckEq {
    sample_rate: f32,
    freqs: EqFrequencies,
    low_db: f32,
    mid_db: f32,
    high_db: f32,
    low: Stage,
    mid: Stage,
    high: Stage,
}

impl DeckEq {
    pub fn new(sample_rate: u32, freqs: EqFrequencies) -> Self {
        let sample_rate = sample_rate.max(1) as f32;
        Self {
            sample_rate,
            freqs,
            low_db: 0.0,
            mid_db: 0.0,
            high_db: 0.0,
            low: Stage::new(BiquadCoeffs::UNITY),
            mid: Stage::new(BiquadCoeffs::UNITY),
            high: Stage::new(BiquadCoeffs::UNITY),
        }
    }

    /// Set band gain in dB, clamped to ±15dB; returns the stored value
    pub fn set_gain(&mut self, band: EqBand, gain_db: f32) -> f32 {
        let gain_db = gain_db.clamp(-EQ_RANGE_DB, EQ_RANGE_DB);
        match band {
            EqBand::Low => {
                self.low_db = gain_db;
                self.low.coeffs =
                    BiquadCoeffs::low_shelf(self.sample_rate, self.freqs.low, gain_db);
            }
            EqBand::Mid => {
                self.mid_db = gain_db;
                self.mid.coeffs =
                    BiquadCoeffs::peaking(self.sample_rate, self.freqs.mid, gain_db, MID_Q);
            }
            EqBand::High => {
                self.high_db = gain_db;
                self.high.coeffs =
                    BiquadCoeffs::high_shelf(self.sample_rate, self.freqs.high, gain_db);
            }
        }
        gain_db
    }

    pub fn gain(&self, band: EqBand) -> f32 {
        match band {
            EqBand::Low => self.low_db,
            EqBand::Mid => self.mid_db,
            EqBand::High => self.high_db,
        }
    }

    /// Clear filter memory (after a source replacement)
    pub fn reset(&mut self) {
        for stage in [&mut self.low, &mut self.mid, &mut self.high] {
            stage.left = BiquadState::default();
            stage.right = BiquadState::default();
        }
    }

    #[inline]
    pub fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        let (l, r) = self.low.process(l, r);
        let (l, r) = self.mid.process(l, r);
        self.high.process(l, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms_through(eq: &mut DeckEq, freq: f32, sample_rate: u32) -> f32 {
        let n = sample_rate as usize / 2;
        let mut sum = 0.0;
        for i in 0..n {
            let x = (2.0 * PI * freq * i as f32 / sample_rate as f32).sin();
            let (l, _) = eq.process(x, x);
            // Skip the transient
            if i > n / 2 {
                sum += l * l;
            }
        }
        (sum / (n - n / 2 - 1) as f32).sqrt()
    }

    #[test]
    fn test_flat_eq_is_transparent() {
        let mut eq = DeckEq::new(48000, EqFrequencies::default());
        assert_eq!(eq.process(0.25, -0.5), (0.25, -0.5));
    }

    #[test]
    fn test_gain_is_clamped() {
        let mut eq = DeckEq::new(48000, EqFrequencies::default());
        assert_eq!(eq.set_gain(EqBand::Low, 40.0), 15.0);
        assert_eq!(eq.set_gain(EqBand::High, -40.0), -15.0);
        assert_eq!(eq.gain(EqBand::Low), 15.0);
        assert_eq!(eq.gain(EqBand::Mid), 0.0);
    }

    #[test]
    fn test_low_cut_attenuates_bass_only() {
        let sample_rate = 48000;
        let mut flat = DeckEq::new(sample_rate, EqFrequencies::default());
        let mut cut = DeckEq::new(sample_rate, EqFrequencies::default());
        cut.set_gain(EqBand::Low, -15.0);

        let bass_flat = rms_through(&mut flat, 60.0, sample_rate);
        let bass_cut = rms_through(&mut cut, 60.0, sample_rate);
        assert!(bass_cut < bass_flat * 0.3);

        let mut flat = DeckEq::new(sample_rate, EqFrequencies::default());
        let mut cut = DeckEq::new(sample_rate, EqFrequencies::default());
        cut.set_gain(EqBand::Low, -15.0);
        let treble_flat = rms_through(&mut flat, 10000.0, sample_rate);
        let treble_cut = rms_through(&mut cut, 10000.0, sample_rate);
        assert!((treble_cut / treble_flat - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_band_parsing() {
        assert_eq!("LOW".parse::<EqBand>(), Ok(EqBand::Low));
        assert_eq!("treble".parse::<EqBand>(), Ok(EqBand::High));
        assert!("sub".parse::<EqBand>().is_err());
    }
}
