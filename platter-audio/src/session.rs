//! Mixer session - owns both decks, the master bus and the sample clock
//!
//! All deck mutation goes through one `MixerSession`. The audio callback
//! calls [`MixerSession::process`]; the command thread calls
//! [`MixerSession::handle_command`] and periodically takes a snapshot.

use crate::broadcast::{BroadcastSettings, BroadcastState, Broadcaster};
use crate::deck::{Deck, DeckConfig, DeckId, DeckState};
use crate::engine::{AudioCommand, AudioEvent};
use crate::eq::EqBand;
use crate::mic::{MicChannel, MicInputReader};
use crate::mixer::{deck_gains, ChannelLevel, CrossfaderCurve, Mixer};
use crate::recorder::{Recorder, RecorderConfig, RecorderDrain, RecorderError};
use std::path::PathBuf;

/// Pre-allocated render buffer size (interleaved samples)
const MAX_BUFFER_SIZE: usize = 8192;

/// Everything a session needs to know at construction
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sample_rate: u32,
    pub crossfader_curve: CrossfaderCurve,
    pub deck: DeckConfig,
    pub recorder: RecorderConfig,
    pub recording_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            crossfader_curve: CrossfaderCurve::default(),
            deck: DeckConfig::default(),
            recorder: RecorderConfig::default(),
            recording_dir: PathBuf::from("."),
        }
    }
}

/// Audio clock: rendered frames over sample rate
#[derive(Debug, Clone, Copy)]
pub struct SampleClock {
    frames: u64,
    sample_rate: u32,
}

impl SampleClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: 0,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Seconds since the session started
    pub fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn advance(&mut self, frames: usize) {
        self.frames += frames as u64;
    }
}

/// Recording status for the UI
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingStatus {
    pub path: PathBuf,
    pub elapsed: f64,
}

/// Complete session state for UI rendering
#[derive(Debug, Clone)]
pub struct SessionState {
    pub decks: [DeckState; 2],
    pub crossfader: f32,
    pub curve: CrossfaderCurve,
    /// Effective (left, right) gains including volume and power
    pub gains: (f32, f32),
    pub master_volume: f32,
    pub mic_attached: bool,
    pub mic_enabled: bool,
    pub mic_gain: f32,
    pub mic_level: f32,
    pub recording: Option<RecordingStatus>,
    pub broadcast: BroadcastState,
    pub clock: f64,
}

impl SessionState {
    pub fn deck(&self, id: DeckId) -> &DeckState {
        &self.decks[id.index()]
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            decks: [DeckState::empty(DeckId::Left), DeckState::empty(DeckId::Right)],
            crossfader: 0.5,
            curve: CrossfaderCurve::default(),
            gains: (0.0, 0.0),
            master_volume: 1.0,
            mic_attached: false,
            mic_enabled: false,
            mic_gain: 1.0,
            mic_level: 0.0,
            recording: None,
            broadcast: BroadcastState::Offline,
            clock: 0.0,
        }
    }
}

pub struct MixerSession {
    config: SessionConfig,
    clock: SampleClock,
    decks: [Deck; 2],
    mixer: Mixer,
    mic: MicChannel,
    recorder: Recorder,
    broadcaster: Broadcaster,
    events: Vec<AudioEvent>,
    left_buffer: Vec<f32>,
    right_buffer: Vec<f32>,
    mic_buffer: Vec<f32>,
}

impl MixerSession {
    pub fn new(config: SessionConfig) -> Self {
        let rate = config.sample_rate;
        let deck = |id| Deck::with_config(id, rate, config.deck);
        Self {
            clock: SampleClock::new(rate),
            decks: [deck(DeckId::Left), deck(DeckId::Right)],
            mixer: Mixer::new(config.crossfader_curve),
            mic: MicChannel::new(rate),
            recorder: Recorder::new(rate),
            broadcaster: Broadcaster::new(),
            events: Vec::with_capacity(16),
            left_buffer: vec![0.0; MAX_BUFFER_SIZE],
            right_buffer: vec![0.0; MAX_BUFFER_SIZE],
            mic_buffer: vec![0.0; MAX_BUFFER_SIZE],
            config,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn deck(&self, id: DeckId) -> &Deck {
        &self.decks[id.index()]
    }

    pub fn deck_mut(&mut self, id: DeckId) -> &mut Deck {
        &mut self.decks[id.index()]
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    /// Hand the mic input consumer to the session
    pub fn attach_mic(&mut self, reader: MicInputReader) {
        self.mic.attach(reader);
    }

    /// Effective crossfader gains for both decks
    pub fn deck_gains(&self) -> (f32, f32) {
        let level = |deck: &Deck| ChannelLevel {
            volume: deck.volume(),
            powered_on: deck.is_powered_on(),
        };
        deck_gains(
            self.mixer.curve(),
            self.mixer.crossfader(),
            level(&self.decks[0]),
            level(&self.decks[1]),
        )
    }

    /// Apply one command at the current clock time
    pub fn handle_command(&mut self, cmd: AudioCommand) {
        let now = self.clock.now();
        match cmd {
            AudioCommand::Load(id, buffer) => {
                self.deck_mut(id).load(buffer);
                self.events.push(AudioEvent::TrackLoaded(id));
            }
            AudioCommand::Power(id, on) => self.set_power(id, on, now),
            AudioCommand::TogglePower(id) => {
                let on = !self.deck(id).is_powered_on();
                self.set_power(id, on, now);
            }
            AudioCommand::Play(id) => self.deck_mut(id).play(now),
            AudioCommand::Stop(id) => self.deck_mut(id).stop(now),
            AudioCommand::Toggle(id) => {
                let deck = self.deck_mut(id);
                if deck.is_playing() {
                    deck.stop(now);
                } else {
                    deck.play(now);
                }
            }
            AudioCommand::SetVolume(id, v) => self.deck_mut(id).set_volume(v),
            AudioCommand::AdjustVolume(id, delta) => {
                let deck = self.deck_mut(id);
                deck.set_volume(deck.volume() + delta);
            }
            AudioCommand::SetPitch(id, p) => self.deck_mut(id).set_pitch(p, now),
            AudioCommand::AdjustPitch(id, delta) => {
                let deck = self.deck_mut(id);
                deck.set_pitch(deck.pitch() + delta, now);
            }
            AudioCommand::SetEq(id, band, db) => self.deck_mut(id).set_eq(band, db),
            AudioCommand::AdjustEq(id, band, delta) => {
                let deck = self.deck_mut(id);
                deck.set_eq(band, deck.eq_gain(band) + delta);
            }
            AudioCommand::ResetEq(id) => {
                let deck = self.deck_mut(id);
                for band in [EqBand::Low, EqBand::Mid, EqBand::High] {
                    deck.set_eq(band, 0.0);
                }
            }
            AudioCommand::ToggleEffect(id, kind) => self.deck_mut(id).toggle_effect(kind),
            AudioCommand::Cue(id) => self.deck_mut(id).set_cue_point(now),
            AudioCommand::Scratch(id, velocity) => self.deck_mut(id).scratch(velocity, now),
            AudioCommand::EndScratch(id) => self.deck_mut(id).end_scratch(now),
            AudioCommand::SetCrossfader(p) => self.mixer.set_crossfader(p),
            AudioCommand::MoveCrossfader(delta) => self.mixer.move_crossfader(delta),
            AudioCommand::CenterCrossfader => self.mixer.center_crossfader(),
            AudioCommand::SetCrossfaderCurve(curve) => self.mixer.set_curve(curve),
            AudioCommand::SetMasterVolume(v) => self.mixer.set_master_volume(v),
            AudioCommand::AdjustMasterVolume(delta) => {
                let v = self.mixer.master_volume() + delta;
                self.mixer.set_master_volume(v);
            }
            AudioCommand::SetMicEnabled(on) => self.set_mic(on),
            AudioCommand::ToggleMic => {
                let on = !self.mic.is_enabled();
                self.set_mic(on);
            }
            AudioCommand::SetMicGain(value) => self.mic.set_gain(value),
            AudioCommand::StartRecording => self.start_recording(self.config.recorder),
            AudioCommand::StartRecordingWith(config) => self.start_recording(config),
            AudioCommand::StopRecording => self.stop_recording(),
            AudioCommand::ToggleRecording => {
                if self.recorder.is_recording() {
                    self.stop_recording();
                } else {
                    self.start_recording(self.config.recorder);
                }
            }
            AudioCommand::StartBroadcast(settings) => self.start_broadcast(settings),
            AudioCommand::StopBroadcast => match self.broadcaster.stop() {
                Ok(()) => self.events.push(AudioEvent::BroadcastStopped),
                Err(e) => tracing::debug!(error = %e, "stop broadcast ignored"),
            },
            AudioCommand::Shutdown => {
                if self.recorder.is_recording() {
                    self.stop_recording();
                }
            }
        }
    }

    fn set_power(&mut self, id: DeckId, on: bool, now: f64) {
        let deck = self.deck_mut(id);
        if on {
            deck.power_on();
        } else {
            deck.power_off(now);
        }
        tracing::info!(deck = %id, on, "deck power");
    }

    fn set_mic(&mut self, on: bool) {
        match self.mic.set_enabled(on) {
            Ok(()) => self.events.push(AudioEvent::MicChanged(on)),
            Err(e) => {
                tracing::warn!(error = %e, "microphone unavailable");
                self.events.push(AudioEvent::Error(e.to_string()));
            }
        }
    }

    fn start_recording(&mut self, config: RecorderConfig) {
        match self.recorder.start(&self.config.recording_dir, config) {
            Ok(path) => self.events.push(AudioEvent::RecordingStarted(path)),
            Err(e) => {
                tracing::warn!(error = %e, "recording not started");
                self.events.push(AudioEvent::Error(e.to_string()));
            }
        }
    }

    fn stop_recording(&mut self) {
        match self.recorder.stop() {
            Ok(summary) => self.events.push(AudioEvent::RecordingSaved(summary)),
            Err(e) => {
                tracing::warn!(error = %e, "recording not stopped");
                self.events.push(AudioEvent::Error(e.to_string()));
            }
        }
    }

    /// Handle for writing the capture ring to disk
    pub fn recorder_drain(&self) -> RecorderDrain {
        self.recorder.drain_handle()
    }

    /// Abandon the take after a disk error
    pub fn recording_failed(&mut self, err: &RecorderError) {
        tracing::error!(error = %err, "recording write failed");
        self.events.push(AudioEvent::Error(format!("recording failed: {}", err)));
        self.stop_recording();
    }

    fn start_broadcast(&mut self, settings: BroadcastSettings) {
        match self.broadcaster.start(settings) {
            Ok(url) => {
                self.events.push(AudioEvent::BroadcastStarted(url));
                if self.mic.is_attached() && !self.mic.is_enabled() {
                    self.set_mic(true);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "broadcast not started");
                self.events.push(AudioEvent::Error(e.to_string()));
            }
        }
    }

    /// Render interleaved stereo into `output` and advance the clock
    pub fn process(&mut self, output: &mut [f32]) {
        let len = output.len();

        // Should only happen for unusually large device buffers
        if len > self.left_buffer.len() {
            self.left_buffer.resize(len, 0.0);
            self.right_buffer.resize(len, 0.0);
            self.mic_buffer.resize(len, 0.0);
        }

        let left = &mut self.left_buffer[..len];
        let right = &mut self.right_buffer[..len];
        let mic = &mut self.mic_buffer[..len];

        self.decks[0].render(left);
        self.decks[1].render(right);
        self.mic.render(mic);

        let powered = [self.decks[0].is_powered_on(), self.decks[1].is_powered_on()];
        let extra = self.mic.is_enabled().then_some(&*mic);
        self.mixer.mix(left, right, powered, extra, output);

        self.recorder.write(output);

        self.clock.advance(len / 2);
        self.tick();
    }

    /// Run deck timers at the current clock time
    pub fn tick(&mut self) {
        let now = self.clock.now();
        for id in DeckId::ALL {
            if self.deck_mut(id).poll(now) {
                self.events.push(AudioEvent::TrackEnded(id));
            }
        }
    }

    /// Take queued events
    pub fn drain_events(&mut self) -> Vec<AudioEvent> {
        std::mem::take(&mut self.events)
    }

    /// Full state for the UI
    pub fn snapshot(&mut self) -> SessionState {
        let now = self.clock.now();
        let gains = self.deck_gains();
        let [left, right] = &mut self.decks;
        SessionState {
            decks: [left.snapshot(now), right.snapshot(now)],
            crossfader: self.mixer.crossfader(),
            curve: self.mixer.curve(),
            gains,
            master_volume: self.mixer.master_volume(),
            mic_attached: self.mic.is_attached(),
            mic_enabled: self.mic.is_enabled(),
            mic_gain: self.mic.gain(),
            mic_level: self.mic.update_level(),
            recording: self.recorder.path().map(|p| RecordingStatus {
                path: p.to_path_buf(),
                elapsed: self.recorder.elapsed(),
            }),
            broadcast: self.broadcaster.state().clone(),
            clock: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::AudioBuffer;
    use crate::effects::EffectKind;
    use crate::mic::create_mic_ring_buffer;
    use std::sync::Arc;

    const SR: u32 = 1000;

    fn session() -> MixerSession {
        MixerSession::new(SessionConfig {
            sample_rate: SR,
            ..SessionConfig::default()
        })
    }

    fn tone(seconds: usize) -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::new(vec![0.5; seconds * SR as usize * 2], SR, Some("tone".into())))
    }

    /// Render `seconds` of audio in blocks of at most 32 frames
    fn run(session: &mut MixerSession, seconds: f64) -> Vec<f32> {
        let mut remaining = (seconds * SR as f64).round() as usize;
        let mut last = Vec::new();
        while remaining > 0 {
            let frames = remaining.min(32);
            last = vec![0.0; frames * 2];
            session.process(&mut last);
            remaining -= frames;
        }
        last
    }

    #[test]
    fn test_clock_follows_rendered_frames() {
        let mut s = session();
        run(&mut s, 1.0);
        assert!((s.now() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_play_stop_scenario() {
        let mut s = session();
        s.handle_command(AudioCommand::Load(DeckId::Left, tone(10)));
        s.handle_command(AudioCommand::Power(DeckId::Left, true));
        s.handle_command(AudioCommand::Play(DeckId::Left));
        run(&mut s, 3.0);
        s.handle_command(AudioCommand::Stop(DeckId::Left));
        assert!((s.deck(DeckId::Left).start_offset() - 3.0).abs() < 1e-9);

        s.handle_command(AudioCommand::Play(DeckId::Left));
        run(&mut s, 2.0);
        s.handle_command(AudioCommand::Stop(DeckId::Left));
        assert!((s.deck(DeckId::Left).start_offset() - 5.0).abs() < 1e-9);

        let events = s.drain_events();
        assert!(matches!(events[0], AudioEvent::TrackLoaded(DeckId::Left)));
    }

    #[test]
    fn test_scratch_scenario_resumes_at_pitch_rate() {
        let mut s = session();
        s.handle_command(AudioCommand::Load(DeckId::Right, tone(10)));
        s.handle_command(AudioCommand::Power(DeckId::Right, true));
        s.handle_command(AudioCommand::Play(DeckId::Right));
        run(&mut s, 1.0);

        for _ in 0..3 {
            s.handle_command(AudioCommand::Scratch(DeckId::Right, 50.0));
            run(&mut s, 0.016);
        }
        assert!(s.deck(DeckId::Right).is_scratching());
        run(&mut s, 0.15);

        let state = s.snapshot();
        let deck = state.deck(DeckId::Right);
        assert!(!deck.is_scratching);
        assert!(deck.is_playing);
        assert!((deck.rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_track_end_event() {
        let mut s = session();
        s.handle_command(AudioCommand::Load(DeckId::Left, tone(1)));
        s.handle_command(AudioCommand::Power(DeckId::Left, true));
        s.handle_command(AudioCommand::Play(DeckId::Left));
        run(&mut s, 1.2);
        let events = s.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, AudioEvent::TrackEnded(DeckId::Left))));
        assert!(!s.deck(DeckId::Left).is_playing());
        assert_eq!(s.deck(DeckId::Left).start_offset(), 0.0);
    }

    #[test]
    fn test_unpowered_deck_is_silent_in_mix() {
        let mut s = session();
        s.handle_command(AudioCommand::Load(DeckId::Left, tone(5)));
        s.handle_command(AudioCommand::SetCrossfader(0.0));
        s.handle_command(AudioCommand::Play(DeckId::Left));
        let out = run(&mut s, 0.5);
        assert!(out.iter().all(|&x| x == 0.0));
        assert_eq!(s.deck_gains(), (0.0, 0.0));
    }

    #[test]
    fn test_crossfader_gains_in_snapshot() {
        let mut s = session();
        for id in DeckId::ALL {
            s.handle_command(AudioCommand::Power(id, true));
            s.handle_command(AudioCommand::SetVolume(id, 0.8));
        }
        let (l, r) = s.snapshot().gains;
        assert!((l - 0.8 * 0.70710677).abs() < 1e-5);
        assert!((r - 0.8 * 0.70710677).abs() < 1e-5);
    }

    #[test]
    fn test_effect_toggles_are_per_deck() {
        let mut s = session();
        for id in DeckId::ALL {
            s.handle_command(AudioCommand::Power(id, true));
        }
        s.handle_command(AudioCommand::ToggleEffect(DeckId::Left, EffectKind::Flanger));
        s.handle_command(AudioCommand::ToggleEffect(DeckId::Right, EffectKind::Filter));

        let state = s.snapshot();
        let left = state.deck(DeckId::Left).effects;
        let right = state.deck(DeckId::Right).effects;
        assert!(left.flanger && !left.filter);
        assert!(right.filter && !right.flanger);

        s.handle_command(AudioCommand::ToggleEffect(DeckId::Left, EffectKind::Flanger));
        assert!(!s.snapshot().deck(DeckId::Left).effects.any());
    }

    #[test]
    fn test_mic_enable_without_input_reports_error() {
        let mut s = session();
        s.handle_command(AudioCommand::ToggleMic);
        assert!(!s.snapshot().mic_enabled);
        assert!(matches!(s.drain_events()[0], AudioEvent::Error(_)));
    }

    #[test]
    fn test_broadcast_enables_attached_mic() {
        let mut s = session();
        let (_writer, reader) = create_mic_ring_buffer(1);
        s.attach_mic(reader);
        s.handle_command(AudioCommand::StartBroadcast(BroadcastSettings {
            server: "radio.example.com".into(),
            ..BroadcastSettings::default()
        }));
        let state = s.snapshot();
        assert!(state.mic_enabled);
        assert!(matches!(state.broadcast, BroadcastState::OnAir { .. }));

        s.handle_command(AudioCommand::StopBroadcast);
        assert_eq!(s.snapshot().broadcast, BroadcastState::Offline);
    }

    #[test]
    fn test_invalid_broadcast_reports_error() {
        let mut s = session();
        s.handle_command(AudioCommand::StartBroadcast(BroadcastSettings::default()));
        assert_eq!(s.snapshot().broadcast, BroadcastState::Offline);
        assert!(matches!(s.drain_events()[0], AudioEvent::Error(_)));
    }

    #[test]
    fn test_recording_captures_master_bus() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = MixerSession::new(SessionConfig {
            sample_rate: SR,
            recording_dir: dir.path().to_path_buf(),
            ..SessionConfig::default()
        });
        s.handle_command(AudioCommand::ToggleRecording);
        run(&mut s, 0.5);
        assert!(s.snapshot().recording.is_some());
        s.handle_command(AudioCommand::ToggleRecording);

        let events = s.drain_events();
        let saved = events.iter().find_map(|e| match e {
            AudioEvent::RecordingSaved(summary) => Some(summary.clone()),
            _ => None,
        });
        let summary = saved.unwrap();
        assert!((summary.duration_secs - 0.5).abs() < 1e-9);
        assert!(summary.path.exists());
    }
}
