//! Mixer implementation - crossfader law and master bus

use std::f32::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

/// Crossfader curve type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossfaderCurve {
    /// Constant power (cos/sin), no dip at centre
    #[default]
    EqualPower,
    /// Linear crossfade
    Linear,
    /// Sharp cut (DJ battle style)
    Cut,
}

impl CrossfaderCurve {
    /// Law weights (left, right) for a position in [0, 1]
    pub fn weights(self, position: f32) -> (f32, f32) {
        let p = position.clamp(0.0, 1.0);
        match self {
            CrossfaderCurve::EqualPower => ((p * FRAC_PI_2).cos(), (p * FRAC_PI_2).sin()),
            CrossfaderCurve::Linear => (1.0 - p, p),
            CrossfaderCurve::Cut => {
                let left = if p < 0.95 { 1.0 } else { (1.0 - p) * 20.0 };
                let right = if p > 0.05 { 1.0 } else { p * 20.0 };
                (left, right)
            }
        }
    }

    /// Cycle to the next curve
    pub fn next(self) -> Self {
        match self {
            CrossfaderCurve::EqualPower => CrossfaderCurve::Linear,
            CrossfaderCurve::Linear => CrossfaderCurve::Cut,
            CrossfaderCurve::Cut => CrossfaderCurve::EqualPower,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CrossfaderCurve::EqualPower => "equal_power",
            CrossfaderCurve::Linear => "linear",
            CrossfaderCurve::Cut => "cut",
        }
    }
}

impl fmt::Display for CrossfaderCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrossfaderCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "equal_power" | "equal-power" | "constant_power" | "power" => Ok(Self::EqualPower),
            "linear" => Ok(Self::Linear),
            "cut" | "battle" => Ok(Self::Cut),
            other => Err(format!("unknown crossfader curve '{}'", other)),
        }
    }
}

/// Volume and power of one channel feeding the crossfader
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelLevel {
    pub volume: f32,
    pub powered_on: bool,
}

/// Effective (left, right) deck gains: volume times law, zero when off
pub fn deck_gains(
    curve: CrossfaderCurve,
    position: f32,
    left: ChannelLevel,
    right: ChannelLevel,
) -> (f32, f32) {
    let (wl, wr) = curve.weights(position);
    let gl = if left.powered_on { left.volume * wl } else { 0.0 };
    let gr = if right.powered_on { right.volume * wr } else { 0.0 };
    (gl, gr)
}

/// Mixer for combining deck outputs
pub struct Mixer {
    /// Crossfader position (0.0 = full left, 0.5 = centre, 1.0 = full right)
    crossfader: f32,
    smoothed_crossfader: f32,
    curve: CrossfaderCurve,
    master_volume: f32,
    smoothed_master_volume: f32,
}

impl Mixer {
    /// Smoothing coefficient for crossfader (~5ms at 48kHz)
    const CROSSFADER_SMOOTH_COEFF: f32 = 0.995;
    /// Smoothing coefficient for master volume (~5ms at 48kHz)
    const MASTER_VOLUME_SMOOTH_COEFF: f32 = 0.995;
}

impl Default for Mixer {
    fn default() -> Self {
        Self {
            crossfader: 0.5,
            smoothed_crossfader: 0.5,
            curve: CrossfaderCurve::default(),
            master_volume: 1.0,
            smoothed_master_volume: 1.0,
        }
    }
}

impl Mixer {
    pub fn new(curve: CrossfaderCurve) -> Self {
        Self {
            curve,
            ..Self::default()
        }
    }

    pub fn set_crossfader(&mut self, position: f32) {
        self.crossfader = position.clamp(0.0, 1.0);
    }

    pub fn move_crossfader(&mut self, delta: f32) {
        self.set_crossfader(self.crossfader + delta);
    }

    pub fn crossfader(&self) -> f32 {
        self.crossfader
    }

    pub fn center_crossfader(&mut self) {
        self.crossfader = 0.5;
    }

    pub fn set_curve(&mut self, curve: CrossfaderCurve) {
        self.curve = curve;
    }

    pub fn curve(&self) -> CrossfaderCurve {
        self.curve
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Mix two post-fader deck buffers plus an optional extra bus (mic)
    ///
    /// Deck buffers already carry channel volume; the crossfader law is
    /// applied here with per-frame smoothing, and a deck that is powered
    /// off contributes nothing.
    pub fn mix(
        &mut self,
        left: &[f32],
        right: &[f32],
        powered: [bool; 2],
        extra: Option<&[f32]>,
        output: &mut [f32],
    ) {
        let len = output.len().min(left.len()).min(right.len());
        let on_l = if powered[0] { 1.0 } else { 0.0 };
        let on_r = if powered[1] { 1.0 } else { 0.0 };

        for i in (0..len).step_by(2) {
            self.smoothed_crossfader = Self::CROSSFADER_SMOOTH_COEFF * self.smoothed_crossfader
                + (1.0 - Self::CROSSFADER_SMOOTH_COEFF) * self.crossfader;
            self.smoothed_master_volume = Self::MASTER_VOLUME_SMOOTH_COEFF
                * self.smoothed_master_volume
                + (1.0 - Self::MASTER_VOLUME_SMOOTH_COEFF) * self.master_volume;

            let (wl, wr) = self.curve.weights(self.smoothed_crossfader);
            let gain_l = wl * on_l;
            let gain_r = wr * on_r;

            for ch in i..(i + 2).min(len) {
                let mut sample = left[ch] * gain_l + right[ch] * gain_r;
                if let Some(bus) = extra {
                    sample += bus.get(ch).copied().unwrap_or(0.0);
                }
                output[ch] = soft_clip(sample * self.smoothed_master_volume);
            }
        }

        output[len..].fill(0.0);
    }
}

/// Soft clip threshold
const SOFT_CLIP_THRESHOLD: f32 = 0.75;
/// Soft clip ceiling
const SOFT_CLIP_CEILING: f32 = 0.89;

/// Gentle soft clipper for the mix bus; transparent below threshold
#[inline(always)]
fn soft_clip(x: f32) -> f32 {
    let abs_x = x.abs();
    if abs_x <= SOFT_CLIP_THRESHOLD {
        return x;
    }

    let sign = x.signum();
    let knee_width = SOFT_CLIP_CEILING - SOFT_CLIP_THRESHOLD;
    let ratio = (abs_x - SOFT_CLIP_THRESHOLD) / knee_width;
    let compressed = SOFT_CLIP_THRESHOLD + knee_width * (1.0 - (-ratio * 3.0).exp());
    sign * compressed.min(SOFT_CLIP_CEILING)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ON: ChannelLevel = ChannelLevel {
        volume: 1.0,
        powered_on: true,
    };

    fn level(volume: f32) -> ChannelLevel {
        ChannelLevel {
            volume,
            powered_on: true,
        }
    }

    #[test]
    fn test_endpoints() {
        for curve in [
            CrossfaderCurve::EqualPower,
            CrossfaderCurve::Linear,
            CrossfaderCurve::Cut,
        ] {
            let (l, r) = deck_gains(curve, 0.0, level(0.7), level(0.6));
            assert!((l - 0.7).abs() < 1e-6, "{curve}");
            assert!(r.abs() < 1e-6, "{curve}");

            let (l, r) = deck_gains(curve, 1.0, level(0.7), level(0.6));
            assert!(l.abs() < 1e-6, "{curve}");
            assert!((r - 0.6).abs() < 1e-6, "{curve}");
        }
    }

    #[test]
    fn test_equal_power_centre() {
        let (l, r) = deck_gains(CrossfaderCurve::EqualPower, 0.5, level(0.8), level(0.8));
        assert!((l - 0.8 * 0.70710677).abs() < 1e-5);
        assert!((r - 0.8 * 0.70710677).abs() < 1e-5);
    }

    #[test]
    fn test_equal_power_keeps_constant_power() {
        for step in 0..=20 {
            let p = step as f32 / 20.0;
            let (l, r) = CrossfaderCurve::EqualPower.weights(p);
            assert!((l * l + r * r - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_linear_law() {
        let (l, r) = deck_gains(CrossfaderCurve::Linear, 0.25, ON, level(0.5));
        assert!((l - 0.75).abs() < 1e-6);
        assert!((r - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_powered_off_deck_has_zero_gain() {
        let off = ChannelLevel {
            volume: 1.0,
            powered_on: false,
        };
        assert_eq!(deck_gains(CrossfaderCurve::Linear, 0.0, off, ON).0, 0.0);
    }

    #[test]
    fn test_mix_silences_unpowered_deck() {
        let mut mixer = Mixer::new(CrossfaderCurve::Linear);
        mixer.set_crossfader(0.0);
        // Let smoothing settle
        let left = vec![0.5; 4096];
        let right = vec![0.5; 4096];
        let mut out = vec![0.0; 4096];
        mixer.mix(&left, &right, [false, true], None, &mut out);
        assert!(out[4094].abs() < 0.01);

        mixer.mix(&left, &right, [true, false], None, &mut out);
        assert!((out[4094] - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_mix_adds_extra_bus() {
        let mut mixer = Mixer::default();
        let silent = vec![0.0; 8];
        let mic = vec![0.25; 8];
        let mut out = vec![0.0; 8];
        mixer.mix(&silent, &silent, [true, true], Some(&mic), &mut out);
        assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_soft_clip() {
        assert_eq!(soft_clip(0.5), 0.5);
        assert!(soft_clip(4.0) <= SOFT_CLIP_CEILING);
        assert!(soft_clip(-4.0) >= -SOFT_CLIP_CEILING);
    }

    #[test]
    fn test_curve_parsing() {
        assert_eq!("linear".parse::<CrossfaderCurve>(), Ok(CrossfaderCurve::Linear));
        assert_eq!("Equal-Power".parse::<CrossfaderCurve>(), Ok(CrossfaderCurve::EqualPower));
        assert!("log".parse::<CrossfaderCurve>().is_err());
        assert_eq!(CrossfaderCurve::Cut.to_string(), "cut");
    }

    #[test]
    fn test_curve_cycle_wraps() {
        let mut curve = CrossfaderCurve::default();
        for _ in 0..3 {
            curve = curve.next();
        }
        assert_eq!(curve, CrossfaderCurve::EqualPower);
        assert_eq!(CrossfaderCurve::EqualPower.next(), CrossfaderCurve::Linear);
    }
}
