//! Audio engine - command/event vocabulary and the thread handle

use crate::broadcast::BroadcastSettings;
use crate::buffer::AudioBuffer;
use crate::deck::DeckId;
use crate::effects::EffectKind;
use crate::eq::EqBand;
use crate::mixer::CrossfaderCurve;
use crate::recorder::{RecorderConfig, RecordingSummary};
use crate::session::{MixerSession, SessionState};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Commands sent to the audio engine
#[derive(Debug, Clone)]
pub enum AudioCommand {
    // Deck commands
    // Arc avoids copying decoded audio through the channel
    Load(DeckId, Arc<AudioBuffer>),
    Power(DeckId, bool),
    TogglePower(DeckId),
    Play(DeckId),
    Stop(DeckId),
    Toggle(DeckId),
    SetVolume(DeckId, f32),
    AdjustVolume(DeckId, f32),
    SetPitch(DeckId, f32), // percent
    AdjustPitch(DeckId, f32),
    SetEq(DeckId, EqBand, f32), // dB
    AdjustEq(DeckId, EqBand, f32),
    ResetEq(DeckId),
    ToggleEffect(DeckId, EffectKind),
    Cue(DeckId),
    Scratch(DeckId, f64), // velocity sample
    EndScratch(DeckId),

    // Mixer commands
    SetCrossfader(f32),
    MoveCrossfader(f32),
    CenterCrossfader,
    SetCrossfaderCurve(CrossfaderCurve),
    SetMasterVolume(f32),
    AdjustMasterVolume(f32),

    // Microphone
    SetMicEnabled(bool),
    ToggleMic,
    SetMicGain(f32), // 0 - 100

    // Recording and broadcast
    StartRecording,
    StartRecordingWith(RecorderConfig),
    StopRecording,
    ToggleRecording,
    StartBroadcast(BroadcastSettings),
    StopBroadcast,

    // System
    Shutdown,
}

/// Events sent from the audio engine
#[derive(Debug, Clone)]
pub enum AudioEvent {
    /// State update for UI rendering
    StateUpdate(Box<SessionState>),
    TrackLoaded(DeckId),
    /// Source ran off the end of the track
    TrackEnded(DeckId),
    MicChanged(bool),
    RecordingStarted(PathBuf),
    RecordingSaved(RecordingSummary),
    BroadcastStarted(String),
    BroadcastStopped,
    /// Error occurred
    Error(String),
}

/// Session shared between the output callback and the command thread
pub type SharedSession = Arc<Mutex<MixerSession>>;

pub fn shared_session(session: MixerSession) -> SharedSession {
    Arc::new(Mutex::new(session))
}

/// Handle to communicate with the audio engine
pub struct AudioEngine {
    /// Send commands to audio thread
    pub command_tx: Sender<AudioCommand>,
    /// Receive events from audio thread
    pub event_rx: Receiver<AudioEvent>,
    shutdown: Arc<AtomicBool>,
}

impl AudioEngine {
    /// Create channels for engine communication
    pub fn create_channels() -> (
        Sender<AudioCommand>,
        Receiver<AudioCommand>,
        Sender<AudioEvent>,
        Receiver<AudioEvent>,
    ) {
        let (cmd_tx, cmd_rx) = bounded(1024);
        let (evt_tx, evt_rx) = bounded(1024);
        (cmd_tx, cmd_rx, evt_tx, evt_rx)
    }

    pub fn new(command_tx: Sender<AudioCommand>, event_rx: Receiver<AudioEvent>) -> Self {
        Self {
            command_tx,
            event_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Send a command to the audio engine
    pub fn send(&self, cmd: AudioCommand) {
        if self.command_tx.try_send(cmd).is_err() {
            tracing::warn!("audio command queue full, command dropped");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.command_tx.try_send(AudioCommand::Shutdown);
    }
}

/// Apply queued commands to the shared session and forward its events
///
/// Returns false once `Shutdown` has been handled.
pub fn pump_commands(
    session: &SharedSession,
    cmd_rx: &Receiver<AudioCommand>,
    evt_tx: &Sender<AudioEvent>,
) -> bool {
    let mut running = true;
    while let Ok(cmd) = cmd_rx.try_recv() {
        let shutdown = matches!(cmd, AudioCommand::Shutdown);
        session.lock().handle_command(cmd);
        if shutdown {
            running = false;
            break;
        }
    }

    // Disk writes happen here, never under the session lock
    let drain = session.lock().recorder_drain();
    if let Err(e) = drain.flush() {
        session.lock().recording_failed(&e);
    }

    let events = {
        let mut session = session.lock();
        session.tick();
        session.drain_events()
    };
    for event in events {
        let _ = evt_tx.try_send(event);
    }
    running
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;

    #[test]
    fn test_pump_forwards_events_and_stops() {
        let (cmd_tx, cmd_rx, evt_tx, evt_rx) = AudioEngine::create_channels();
        let engine = AudioEngine::new(cmd_tx, evt_rx);
        let session = shared_session(MixerSession::new(SessionConfig::default()));

        engine.send(AudioCommand::ToggleMic);
        assert!(pump_commands(&session, &cmd_rx, &evt_tx));
        assert!(matches!(engine.event_rx.try_recv(), Ok(AudioEvent::Error(_))));

        engine.shutdown();
        assert!(engine.is_shutdown());
        assert!(!pump_commands(&session, &cmd_rx, &evt_tx));
    }

    #[test]
    fn test_pump_writes_captured_audio() {
        let dir = tempfile::tempdir().unwrap();
        let (cmd_tx, cmd_rx, evt_tx, evt_rx) = AudioEngine::create_channels();
        let engine = AudioEngine::new(cmd_tx, evt_rx);
        let session = shared_session(MixerSession::new(SessionConfig {
            sample_rate: 1000,
            recording_dir: dir.path().to_path_buf(),
            ..SessionConfig::default()
        }));

        engine.send(AudioCommand::StartRecording);
        pump_commands(&session, &cmd_rx, &evt_tx);
        assert!(matches!(engine.event_rx.try_recv(), Ok(AudioEvent::RecordingStarted(_))));

        let drain = session.lock().recorder_drain();
        session.lock().process(&mut vec![0.0; 2 * 100]);
        assert_eq!(drain.pending(), 200);

        pump_commands(&session, &cmd_rx, &evt_tx);
        assert_eq!(drain.pending(), 0);

        engine.send(AudioCommand::StopRecording);
        pump_commands(&session, &cmd_rx, &evt_tx);
        match engine.event_rx.try_recv() {
            Ok(AudioEvent::RecordingSaved(summary)) => {
                assert!((summary.duration_secs - 0.1).abs() < 1e-9);
                let reader = hound::WavReader::open(&summary.path).unwrap();
                assert_eq!(reader.len(), 200);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_commands_apply_in_order() {
        let (cmd_tx, cmd_rx, evt_tx, evt_rx) = AudioEngine::create_channels();
        let engine = AudioEngine::new(cmd_tx, evt_rx);
        let session = shared_session(MixerSession::new(SessionConfig::default()));

        engine.send(AudioCommand::SetCrossfader(0.2));
        engine.send(AudioCommand::MoveCrossfader(0.3));
        pump_commands(&session, &cmd_rx, &evt_tx);
        assert!((session.lock().mixer().crossfader() - 0.5).abs() < 1e-6);
    }
}
