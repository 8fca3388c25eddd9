//! Per-deck effects - toggled processors after the deck EQ
//!
//! Every deck owns one processor of each kind. Enabled processors run in
//! series in [`EffectKind::CHAIN`] order over interleaved stereo. Toggling
//! fades the wet signal instead of cutting it, so switching is click-free.

mod delay;
mod filter;
mod flanger;
mod reverb;

pub use delay::Delay;
pub use filter::BandPass;
pub use flanger::Flanger;
pub use reverb::Reverb;

use std::fmt;
use std::str::FromStr;

/// Trait for all audio effects
pub trait Effect: Send {
    /// Process interleaved stereo samples in place
    fn process(&mut self, samples: &mut [f32]);

    /// Clear delay lines and filter state
    fn reset(&mut self);

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    fn name(&self) -> &'static str;
}

/// Effect selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Reverb,
    Delay,
    Filter,
    Flanger,
}

impl EffectKind {
    pub const ALL: [EffectKind; 4] = [
        EffectKind::Reverb,
        EffectKind::Delay,
        EffectKind::Filter,
        EffectKind::Flanger,
    ];

    /// Processing order within a deck
    pub const CHAIN: [EffectKind; 4] = [
        EffectKind::Filter,
        EffectKind::Flanger,
        EffectKind::Delay,
        EffectKind::Reverb,
    ];

    /// Short badge text for the deck panel
    pub fn label(self) -> &'static str {
        match self {
            EffectKind::Reverb => "REV",
            EffectKind::Delay => "DLY",
            EffectKind::Filter => "FLT",
            EffectKind::Flanger => "FLG",
        }
    }

    /// Next kind in `ALL`, wrapping
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectKind::Reverb => "reverb",
            EffectKind::Delay => "delay",
            EffectKind::Filter => "filter",
            EffectKind::Flanger => "flanger",
        };
        f.write_str(name)
    }
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reverb" | "rev" => Ok(EffectKind::Reverb),
            "delay" | "echo" | "dly" => Ok(EffectKind::Delay),
            "filter" | "flt" => Ok(EffectKind::Filter),
            "flanger" | "flg" => Ok(EffectKind::Flanger),
            other => Err(format!("unknown effect '{}'", other)),
        }
    }
}

/// Which effects are switched on, for the UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectFlags {
    pub reverb: bool,
    pub delay: bool,
    pub filter: bool,
    pub flanger: bool,
}

impl EffectFlags {
    pub fn is_on(&self, kind: EffectKind) -> bool {
        match kind {
            EffectKind::Reverb => self.reverb,
            EffectKind::Delay => self.delay,
            EffectKind::Filter => self.filter,
            EffectKind::Flanger => self.flanger,
        }
    }

    pub fn any(&self) -> bool {
        self.reverb || self.delay || self.filter || self.flanger
    }
}

/// Length of the wet fade on toggle
const WET_FADE_SECS: f32 = 0.01;

/// One-pole fade between the dry and processed signal
#[derive(Debug, Clone, Copy)]
pub(crate) struct WetEnvelope {
    coeff: f32,
    target: f32,
    current: f32,
}

impl WetEnvelope {
    pub(crate) fn new(sample_rate: u32) -> Self {
        Self {
            coeff: (-1.0 / (WET_FADE_SECS * sample_rate.max(1) as f32)).exp(),
            target: 0.0,
            current: 0.0,
        }
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.target = if enabled { 1.0 } else { 0.0 };
    }

    /// Off and fully faded out
    pub(crate) fn is_silent(&self) -> bool {
        self.target == 0.0 && self.current < 0.0001
    }

    /// Advance one frame and return the wet amount
    #[inline]
    pub(crate) fn next(&mut self) -> f32 {
        self.current = self.coeff * self.current + (1.0 - self.coeff) * self.target;
        self.current
    }

    /// Jump straight to the target
    pub(crate) fn settle(&mut self) {
        self.current = self.target;
    }
}

/// Soft clipper applied after feedback paths
#[inline]
pub(crate) fn soft_clip(x: f32) -> f32 {
    if x > 1.0 {
        1.0 - 1.0 / (1.0 + (x - 1.0) * 2.0)
    } else if x < -1.0 {
        -1.0 + 1.0 / (1.0 + (-x - 1.0) * 2.0)
    } else {
        x
    }
}

/// The effect rack of one deck
pub struct DeckEffects {
    reverb: Reverb,
    delay: Delay,
    filter: BandPass,
    flanger: Flanger,
}

impl DeckEffects {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            reverb: Reverb::new(sample_rate),
            delay: Delay::new(sample_rate),
            filter: BandPass::new(sample_rate),
            flanger: Flanger::new(sample_rate),
        }
    }

    fn effect(&self, kind: EffectKind) -> &dyn Effect {
        match kind {
            EffectKind::Reverb => &self.reverb,
            EffectKind::Delay => &self.delay,
            EffectKind::Filter => &self.filter,
            EffectKind::Flanger => &self.flanger,
        }
    }

    fn effect_mut(&mut self, kind: EffectKind) -> &mut dyn Effect {
        match kind {
            EffectKind::Reverb => &mut self.reverb,
            EffectKind::Delay => &mut self.delay,
            EffectKind::Filter => &mut self.filter,
            EffectKind::Flanger => &mut self.flanger,
        }
    }

    pub fn is_enabled(&self, kind: EffectKind) -> bool {
        self.effect(kind).is_enabled()
    }

    pub fn set_enabled(&mut self, kind: EffectKind, enabled: bool) {
        self.effect_mut(kind).set_enabled(enabled);
    }

    /// Flip one effect; returns the new state
    pub fn toggle(&mut self, kind: EffectKind) -> bool {
        let enabled = !self.is_enabled(kind);
        self.set_enabled(kind, enabled);
        enabled
    }

    pub fn flags(&self) -> EffectFlags {
        EffectFlags {
            reverb: self.reverb.is_enabled(),
            delay: self.delay.is_enabled(),
            filter: self.filter.is_enabled(),
            flanger: self.flanger.is_enabled(),
        }
    }

    pub fn process(&mut self, samples: &mut [f32]) {
        for kind in EffectKind::CHAIN {
            self.effect_mut(kind).process(samples);
        }
    }

    /// Clear every tail; switches stay as they are
    pub fn reset(&mut self) {
        for kind in EffectKind::ALL {
            self.effect_mut(kind).reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Reverb".parse::<EffectKind>(), Ok(EffectKind::Reverb));
        assert_eq!("echo".parse::<EffectKind>(), Ok(EffectKind::Delay));
        assert_eq!("flg".parse::<EffectKind>(), Ok(EffectKind::Flanger));
        assert!("chorus".parse::<EffectKind>().is_err());
        for kind in EffectKind::ALL {
            assert_eq!(kind.to_string().parse::<EffectKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_next_cycles_through_all() {
        let mut kind = EffectKind::Reverb;
        for _ in 0..EffectKind::ALL.len() {
            kind = kind.next();
        }
        assert_eq!(kind, EffectKind::Reverb);
        assert_eq!(EffectKind::Flanger.next(), EffectKind::Reverb);
    }

    #[test]
    fn test_toggle_flips_flags() {
        let mut fx = DeckEffects::new(48000);
        assert!(!fx.flags().any());

        assert!(fx.toggle(EffectKind::Delay));
        assert!(fx.flags().is_on(EffectKind::Delay));
        assert!(!fx.flags().is_on(EffectKind::Reverb));

        assert!(!fx.toggle(EffectKind::Delay));
        assert!(!fx.flags().any());
    }

    #[test]
    fn test_idle_rack_is_transparent() {
        let mut fx = DeckEffects::new(48000);
        let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let mut samples = input.clone();
        fx.process(&mut samples);
        assert_eq!(samples, input);
    }

    #[test]
    fn test_wet_envelope_fades_both_ways() {
        let mut env = WetEnvelope::new(1000);
        assert!(env.is_silent());
        env.set_enabled(true);
        for _ in 0..100 {
            env.next();
        }
        assert!(env.next() > 0.99);

        env.set_enabled(false);
        assert!(!env.is_silent());
        for _ in 0..200 {
            env.next();
        }
        assert!(env.is_silent());
    }

    #[test]
    fn test_soft_clip_bounds() {
        assert_eq!(soft_clip(0.5), 0.5);
        assert!(soft_clip(4.0) < 1.0);
        assert!(soft_clip(-4.0) > -1.0);
    }
}
