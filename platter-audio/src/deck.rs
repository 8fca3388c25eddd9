//! Deck implementation - buffer playback through EQ, effects, gain and analyser
//!
//! Position bookkeeping is done in audio-clock seconds. `start_offset` is the
//! authoritative position while stopped; while playing the position is
//! `start_offset` plus the elapsed clock time scaled by the playback rate.
//! Every operation that depends on time takes the current clock value.

use crate::buffer::AudioBuffer;
use crate::effects::{DeckEffects, EffectFlags, EffectKind};
use crate::eq::{DeckEq, EqBand, EqFrequencies};
use crate::scratch::{ScratchConfig, ScratchSession};
use crate::source::PlaybackSource;
use platter_analysis::{AnalyserSnapshot, AnalyserTap, WaveformOverview, DECK_FFT_SIZE};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default pitch fader range in percent
pub const PITCH_RANGE: f32 = 12.0;
/// Length of the cue preview
pub const CUE_PREVIEW_SECS: f64 = 0.5;
/// Points in the time-domain trace handed to the UI
pub const TRACE_POINTS: usize = 128;

/// Which of the two decks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckId {
    Left,
    Right,
}

impl DeckId {
    pub const ALL: [DeckId; 2] = [DeckId::Left, DeckId::Right];

    pub fn index(self) -> usize {
        match self {
            DeckId::Left => 0,
            DeckId::Right => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(DeckId::Left),
            1 => Some(DeckId::Right),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            DeckId::Left => DeckId::Right,
            DeckId::Right => DeckId::Left,
        }
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckId::Left => write!(f, "A"),
            DeckId::Right => write!(f, "B"),
        }
    }
}

impl FromStr for DeckId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "a" | "left" | "l" => Ok(DeckId::Left),
            "1" | "b" | "right" | "r" => Ok(DeckId::Right),
            other => Err(format!("unknown deck '{}'", other)),
        }
    }
}

/// Complete deck state for UI rendering
#[derive(Debug, Clone)]
pub struct DeckState {
    pub id: DeckId,
    pub track_name: Option<String>,
    pub is_loaded: bool,
    pub is_playing: bool,
    pub is_powered_on: bool,
    pub is_scratching: bool,
    pub position: f64, // seconds
    pub duration: f64, // seconds
    pub volume: f32,
    pub pitch: f32, // percent
    pub rate: f64,  // effective rate of the live source
    pub eq_low: f32,
    pub eq_mid: f32,
    pub eq_high: f32,
    pub effects: EffectFlags,
    pub cue_point: Option<f64>,
    pub overview: Option<Arc<WaveformOverview>>,
    /// `None` when the deck is off or empty
    pub analyser: Option<AnalyserSnapshot>,
}

impl DeckState {
    pub fn empty(id: DeckId) -> Self {
        Self {
            id,
            track_name: None,
            is_loaded: false,
            is_playing: false,
            is_powered_on: false,
            is_scratching: false,
            position: 0.0,
            duration: 0.0,
            volume: 1.0,
            pitch: 0.0,
            rate: 0.0,
            eq_low: 0.0,
            eq_mid: 0.0,
            eq_high: 0.0,
            effects: EffectFlags::default(),
            cue_point: None,
            overview: None,
            analyser: None,
        }
    }

    /// Playback progress (0.0 - 1.0)
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Per-deck tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeckConfig {
    pub eq_freqs: EqFrequencies,
    pub scratch: ScratchConfig,
    /// Pitch fader range in percent (either direction)
    pub pitch_range: f32,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            eq_freqs: EqFrequencies::default(),
            scratch: ScratchConfig::default(),
            pitch_range: PITCH_RANGE,
        }
    }
}

/// A single turntable deck
pub struct Deck {
    id: DeckId,
    output_rate: u32,
    pub(crate) buffer: Option<Arc<AudioBuffer>>,
    /// The one live source, if any
    pub(crate) source: Option<PlaybackSource>,
    next_generation: u64,
    /// End reported by the renderer, checked against the live generation on poll
    pending_end: Option<u64>,
    pub(crate) is_playing: bool,
    is_powered_on: bool,
    volume: f32,
    smoothed_volume: f32,
    pitch: f32,
    pitch_range: f32,
    eq: DeckEq,
    effects: DeckEffects,
    pub(crate) start_offset: f64,
    pub(crate) start_time: f64,
    /// Elapsed buffer time banked from earlier rates of this segment
    pub(crate) retuned_elapsed: f64,
    cue_point: Option<f64>,
    preview_deadline: Option<f64>,
    pub(crate) scratch: ScratchSession,
    pub(crate) scratch_config: ScratchConfig,
    analyser: AnalyserTap,
}

impl Deck {
    /// Smoothing coefficient for volume changes (~5ms at 48kHz)
    const VOLUME_SMOOTH_COEFF: f32 = 0.995;

    pub fn new(id: DeckId, output_rate: u32) -> Self {
        Self::with_config(id, output_rate, DeckConfig::default())
    }

    pub fn with_config(id: DeckId, output_rate: u32, config: DeckConfig) -> Self {
        Self {
            id,
            output_rate,
            buffer: None,
            source: None,
            next_generation: 0,
            pending_end: None,
            is_playing: false,
            is_powered_on: false,
            volume: 1.0,
            smoothed_volume: 1.0,
            pitch: 0.0,
            pitch_range: config.pitch_range.clamp(1.0, 100.0),
            eq: DeckEq::new(output_rate, config.eq_freqs),
            effects: DeckEffects::new(output_rate),
            start_offset: 0.0,
            start_time: 0.0,
            retuned_elapsed: 0.0,
            cue_point: None,
            preview_deadline: None,
            scratch: ScratchSession::default(),
            scratch_config: config.scratch,
            analyser: AnalyserTap::new(output_rate, DECK_FFT_SIZE),
        }
    }

    pub fn id(&self) -> DeckId {
        self.id
    }

    /// Load a decoded track; stops playback and resets position and cue
    pub fn load(&mut self, buffer: Arc<AudioBuffer>) {
        self.drop_source();
        self.scratch = ScratchSession::default();
        self.is_playing = false;
        self.preview_deadline = None;
        self.start_offset = 0.0;
        self.retuned_elapsed = 0.0;
        self.cue_point = None;
        self.effects.reset();
        self.analyser.reset();
        tracing::info!(
            deck = %self.id,
            name = buffer.name().unwrap_or("untitled"),
            duration = buffer.duration(),
            "track loaded"
        );
        self.buffer = Some(buffer);
    }

    pub fn is_loaded(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_powered_on(&self) -> bool {
        self.is_powered_on
    }

    pub fn power_on(&mut self) {
        self.is_powered_on = true;
    }

    /// Cut power: stops playback and cancels scratch and preview
    pub fn power_off(&mut self, now: f64) {
        self.stop(now);
        self.scratch = ScratchSession::default();
        self.drop_source();
        self.is_playing = false;
        self.preview_deadline = None;
        self.is_powered_on = false;
        self.effects.reset();
        self.analyser.reset();
    }

    pub fn duration(&self) -> f64 {
        self.buffer.as_ref().map_or(0.0, |b| b.duration())
    }

    /// Normal playback rate from the pitch fader
    pub fn rate(&self) -> f64 {
        1.0 + self.pitch as f64 / 100.0
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn pitch_range(&self) -> f32 {
        self.pitch_range
    }

    pub fn eq_gain(&self, band: EqBand) -> f32 {
        self.eq.gain(band)
    }

    pub fn cue_point(&self) -> Option<f64> {
        self.cue_point
    }

    pub fn start_offset(&self) -> f64 {
        self.start_offset
    }

    /// Buffer seconds elapsed in the current playback segment
    fn elapsed(&self, now: f64) -> f64 {
        self.retuned_elapsed + (now - self.start_time).max(0.0) * self.rate()
    }

    /// Current position in seconds
    pub fn position(&self, now: f64) -> f64 {
        if self.scratch.is_scratching || !self.is_playing {
            return self.start_offset;
        }
        (self.start_offset + self.elapsed(now)).min(self.duration())
    }

    /// Start playback from `start_offset`
    pub fn play(&mut self, now: f64) {
        if !self.is_powered_on {
            tracing::debug!(deck = %self.id, "play ignored: deck is powered off");
            return;
        }
        let Some(buffer) = self.buffer.clone() else {
            tracing::debug!(deck = %self.id, "play ignored: no track loaded");
            return;
        };
        if self.scratch.is_scratching {
            // Resume once the hand comes off the record
            self.scratch.was_playing = true;
            return;
        }
        if self.is_playing {
            self.stop(now);
        }

        self.preview_deadline = None;
        self.replace_source(buffer, self.start_offset, self.rate());
        self.start_time = now;
        self.retuned_elapsed = 0.0;
        self.is_playing = true;
    }

    /// Stop playback and bank the elapsed time into `start_offset`
    pub fn stop(&mut self, now: f64) {
        self.preview_deadline = None;
        if self.scratch.is_scratching {
            // Cancels a play deferred until the hand comes off
            self.scratch.was_playing = false;
        }
        if !self.is_playing {
            return;
        }

        if self.scratch.is_scratching {
            // Offset is already current while scratching
            self.scratch = ScratchSession::default();
        } else {
            let offset = self.start_offset + self.elapsed(now);
            self.start_offset = if offset >= self.duration() { 0.0 } else { offset };
        }

        self.drop_source();
        self.retuned_elapsed = 0.0;
        self.is_playing = false;
    }

    pub fn set_volume(&mut self, volume: f32) {
        if !self.is_powered_on {
            tracing::debug!(deck = %self.id, "volume ignored: deck is powered off");
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Set pitch in percent; retunes a playing source in place
    pub fn set_pitch(&mut self, pitch: f32, now: f64) {
        if !self.is_powered_on {
            tracing::debug!(deck = %self.id, "pitch ignored: deck is powered off");
            return;
        }
        let pitch = pitch.clamp(-self.pitch_range, self.pitch_range);
        if self.is_playing && !self.scratch.is_scratching {
            self.retuned_elapsed = self.elapsed(now);
            self.start_time = now;
            self.pitch = pitch;
            let rate = self.rate();
            if let Some(source) = self.source.as_mut() {
                source.set_rate(rate);
            }
        } else {
            self.pitch = pitch;
        }
    }

    pub fn set_eq(&mut self, band: EqBand, gain_db: f32) {
        if !self.is_powered_on {
            tracing::debug!(deck = %self.id, ?band, "EQ ignored: deck is powered off");
            return;
        }
        self.eq.set_gain(band, gain_db);
    }

    pub fn effects(&self) -> EffectFlags {
        self.effects.flags()
    }

    /// Switch one effect on or off
    pub fn toggle_effect(&mut self, kind: EffectKind) {
        if !self.is_powered_on {
            tracing::debug!(deck = %self.id, %kind, "effect ignored: deck is powered off");
            return;
        }
        let enabled = self.effects.toggle(kind);
        tracing::info!(deck = %self.id, %kind, enabled, "effect toggled");
    }

    /// Cue button: set, or preview from, the cue point
    pub fn set_cue_point(&mut self, now: f64) {
        if self.is_playing {
            let position = self.position(now);
            self.cue_point = Some(position);
            tracing::debug!(deck = %self.id, position, "cue set while playing");
            return;
        }
        if self.scratch.is_scratching {
            tracing::debug!(deck = %self.id, "cue ignored while scratching");
            return;
        }

        match self.cue_point {
            Some(cue) => {
                self.start_offset = self.clamp_offset(cue);
                self.play(now);
                if self.is_playing {
                    self.preview_deadline = Some(now + CUE_PREVIEW_SECS);
                }
            }
            None => {
                self.cue_point = Some(self.start_offset);
                tracing::debug!(deck = %self.id, position = self.start_offset, "cue set");
            }
        }
    }

    /// Valid offsets lie in [0, duration)
    pub(crate) fn clamp_offset(&self, offset: f64) -> f64 {
        let max = (self.duration() - self.scratch_config.end_epsilon).max(0.0);
        offset.clamp(0.0, max)
    }

    /// Replace the live source with a fresh one
    pub(crate) fn replace_source(&mut self, buffer: Arc<AudioBuffer>, offset: f64, rate: f64) {
        self.drop_source();
        self.next_generation += 1;
        self.source = Some(PlaybackSource::start(
            buffer,
            offset,
            rate,
            self.output_rate,
            self.next_generation,
        ));
    }

    pub(crate) fn drop_source(&mut self) {
        if self.source.take().is_some() {
            self.eq.reset();
        }
    }

    /// Run timers and end-of-track handling; returns true when the track ran out
    pub fn poll(&mut self, now: f64) -> bool {
        if let Some(deadline) = self.preview_deadline {
            if now >= deadline {
                self.stop(deadline);
            }
        }

        self.poll_scratch(now);

        let Some(ended) = self.pending_end.take() else {
            return false;
        };
        let live = self.source.as_ref().map(|s| s.generation());
        if self.scratch.is_scratching || live != Some(ended) || !self.is_playing {
            tracing::trace!(deck = %self.id, generation = ended, "stale end of source ignored");
            return false;
        }

        self.drop_source();
        self.is_playing = false;
        self.start_offset = 0.0;
        self.retuned_elapsed = 0.0;
        self.preview_deadline = None;
        tracing::info!(deck = %self.id, "track finished");
        true
    }

    /// Render interleaved stereo into `output` (overwrites)
    pub fn render(&mut self, output: &mut [f32]) {
        if !self.is_powered_on {
            output.fill(0.0);
            return;
        }

        match self.source.as_mut() {
            Some(source) => {
                for frame in output.chunks_exact_mut(2) {
                    let (l, r) = source.next_frame();
                    let (l, r) = self.eq.process(l, r);
                    frame[0] = l;
                    frame[1] = r;
                }
                if source.has_ended() && self.pending_end.is_none() {
                    self.pending_end = Some(source.generation());
                }
            }
            None => output.fill(0.0),
        }

        // Runs without a source too, so tails ring out after stop
        self.effects.process(output);

        for frame in output.chunks_exact_mut(2) {
            self.smoothed_volume = Self::VOLUME_SMOOTH_COEFF * self.smoothed_volume
                + (1.0 - Self::VOLUME_SMOOTH_COEFF) * self.volume;
            frame[0] *= self.smoothed_volume;
            frame[1] *= self.smoothed_volume;
        }

        self.analyser.push_stereo(output);
    }

    /// Snapshot for the UI; samples the analyser
    pub fn snapshot(&mut self, now: f64) -> DeckState {
        let analyser = (self.is_powered_on && self.buffer.is_some())
            .then(|| self.analyser.snapshot(TRACE_POINTS));

        DeckState {
            id: self.id,
            track_name: self
                .buffer
                .as_ref()
                .and_then(|b| b.name().map(str::to_owned)),
            is_loaded: self.buffer.is_some(),
            is_playing: self.is_playing,
            is_powered_on: self.is_powered_on,
            is_scratching: self.scratch.is_scratching,
            position: self.position(now),
            duration: self.duration(),
            volume: self.volume,
            pitch: self.pitch,
            rate: self.source.as_ref().map_or(0.0, |s| s.rate()),
            eq_low: self.eq.gain(EqBand::Low),
            eq_mid: self.eq.gain(EqBand::Mid),
            eq_high: self.eq.gain(EqBand::High),
            effects: self.effects.flags(),
            cue_point: self.cue_point,
            overview: self.buffer.as_ref().map(|b| b.overview()),
            analyser,
        }
    }
}
