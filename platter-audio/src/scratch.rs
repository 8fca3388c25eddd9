//! Scratch emulation - drag velocity to transient rate/offset perturbation
//!
//! Per-deck state machine `Idle -> Scratching -> Idle`. Each velocity sample
//! nudges `start_offset` and replaces the live source with one playing at a
//! rate derived from the nudge. When no sample arrives within the quiescence
//! window the session ends and normal playback resumes from the scratched
//! offset, at the pitch fader rate, if the deck was playing before.

use crate::deck::Deck;

/// Tunables for velocity interpretation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScratchConfig {
    /// Seconds of offset per unit of velocity
    pub scale: f64,
    /// Idle time that ends a session (seconds)
    pub quiescence: f64,
    /// Cap on the rate boost above 1.0
    pub max_boost: f64,
    /// Offset nudges below this pause audio instead of crawling
    pub dead_zone: f64,
    /// Distance kept from the end of the buffer
    pub end_epsilon: f64,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            scale: 0.01,
            quiescence: 0.1,
            max_boost: 3.0,
            dead_zone: 0.001,
            end_epsilon: 0.001,
        }
    }
}

impl ScratchConfig {
    /// Playback rate for an offset nudge
    pub fn rate_for(&self, adjusted: f64) -> f64 {
        if adjusted.abs() > self.dead_zone {
            adjusted.signum() * (1.0 + (adjusted.abs() * 10.0).min(self.max_boost))
        } else {
            0.0
        }
    }
}

/// Scratch session state for one deck
#[derive(Debug, Clone, Default)]
pub struct ScratchSession {
    pub is_scratching: bool,
    /// Last raw velocity sample
    pub velocity: f64,
    pub last_time: f64,
    /// Seconds between the last two samples
    pub last_dt: f64,
    /// Resume normal playback when the session ends
    pub was_playing: bool,
    /// Rate of the source that was frozen when the session began
    pub saved_rate: f64,
    /// Quiescence deadline in audio-clock seconds
    pub deadline: Option<f64>,
}

impl Deck {
    pub fn is_scratching(&self) -> bool {
        self.scratch.is_scratching
    }

    pub fn scratch_session(&self) -> &ScratchSession {
        &self.scratch
    }

    /// Feed one velocity sample
    pub fn scratch(&mut self, velocity: f64, now: f64) {
        if !self.is_powered_on() {
            tracing::debug!(deck = %self.id(), "scratch ignored: deck is powered off");
            return;
        }
        let Some(buffer) = self.buffer.clone() else {
            tracing::debug!(deck = %self.id(), "scratch ignored: no track loaded");
            return;
        };

        if !self.scratch.is_scratching {
            self.begin_scratch(now);
        }

        self.scratch.last_dt = now - self.scratch.last_time;
        self.scratch.last_time = now;
        self.scratch.velocity = velocity;

        let adjusted = velocity * self.scratch_config.scale;
        self.start_offset = self.clamp_offset(self.start_offset + adjusted);

        let rate = self.scratch_config.rate_for(adjusted);
        self.replace_source(buffer, self.start_offset, rate);
        self.start_time = now;
        self.retuned_elapsed = 0.0;
        self.scratch.deadline = Some(now + self.scratch_config.quiescence);
    }

    fn begin_scratch(&mut self, now: f64) {
        let was_playing = self.is_playing;
        let saved_rate = self.source.as_ref().map_or(0.0, |s| s.rate());
        if was_playing {
            // Bank the position before freezing the record
            self.start_offset = self.clamp_offset(self.position(now));
            self.retuned_elapsed = 0.0;
            if let Some(source) = self.source.as_mut() {
                source.set_rate(0.0);
            }
        }
        self.scratch = ScratchSession {
            is_scratching: true,
            velocity: 0.0,
            last_time: now,
            last_dt: 0.0,
            was_playing,
            saved_rate,
            deadline: None,
        };
        tracing::debug!(deck = %self.id(), was_playing, offset = self.start_offset, "scratch started");
    }

    /// End the session now, resuming playback if the deck was playing
    pub fn end_scratch(&mut self, now: f64) {
        if !self.scratch.is_scratching {
            return;
        }
        let was_playing = self.scratch.was_playing;
        self.scratch = ScratchSession::default();

        match (was_playing, self.buffer.clone()) {
            (true, Some(buffer)) => {
                let rate = self.rate();
                self.replace_source(buffer, self.start_offset, rate);
                self.start_time = now;
                self.retuned_elapsed = 0.0;
                self.is_playing = true;
            }
            _ => {
                self.drop_source();
                self.is_playing = false;
            }
        }
        tracing::debug!(deck = %self.id(), resumed = was_playing, offset = self.start_offset, "scratch ended");
    }

    /// End the session once its quiescence deadline has passed
    pub(crate) fn poll_scratch(&mut self, now: f64) {
        if let Some(deadline) = self.scratch.deadline {
            if self.scratch.is_scratching && now >= deadline {
                self.end_scratch(now);
            }
        }
    }
}
