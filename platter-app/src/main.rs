//! Platter - two decks, a crossfader and a scratch emulator in the terminal
//!
//! The audio thread owns the cpal streams and the mixer session; the main
//! thread runs the UI loop and talks to it over the engine channels. An
//! optional TCP listener accepts remote JSON commands.

use std::fs::{self, OpenOptions};
use std::io::{self, stdout, BufReader};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    Terminal,
};
use tracing_subscriber::EnvFilter;

use platter_audio::{
    create_mic_ring_buffer, pump_commands, shared_session, AudioCommand, AudioEngine, AudioEvent,
    BroadcastState, DeckId, MicInputReader, MixerSession, RecorderConfig,
};
use platter_input::{serve_lines, Command, InputHandler, Mode, RemoteAction, RemoteReply, RemoteRequest};
use platter_library::{audio_files_in, Settings, TrackLoader};
use platter_tui::{
    App, BrowserWidget, CrossfaderWidget, DeckWidget, HelpWidget, MasterVuMeterWidget,
    StatusBarWidget, Theme, VisualizerWidget,
};

/// Frame rate for UI updates
const FPS: u64 = 30;

/// Rate assumed for decoding until the output device reports its own
const FALLBACK_SAMPLE_RATE: u32 = 48000;

fn main() -> anyhow::Result<()> {
    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {:#}", e);
    }

    let settings = Settings::load();
    let config_path = Settings::config_path();
    tracing::info!(path = %config_path.display(), "settings loaded");

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Create audio channels
    let (cmd_tx, cmd_rx, evt_tx, evt_rx) = AudioEngine::create_channels();

    // Shutdown flag
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_audio = shutdown.clone();

    // Decoding follows whatever rate the output device settles on
    let sample_rate = Arc::new(AtomicU32::new(
        settings.sample_rate.unwrap_or(FALLBACK_SAMPLE_RATE),
    ));
    let sample_rate_audio = sample_rate.clone();

    let audio_settings = settings.clone();
    let audio_handle = thread::spawn(move || {
        run_audio_thread(audio_settings, cmd_rx, evt_tx, shutdown_audio, sample_rate_audio);
    });

    if settings.remote_port != 0 {
        spawn_remote_listener(settings.remote_port, cmd_tx.clone(), sample_rate.clone());
    }

    // Create engine handle for main thread
    let engine = AudioEngine::new(cmd_tx, evt_rx);

    // Run main event loop
    let result = run_app(&mut terminal, engine, shutdown.clone(), settings, sample_rate);

    // Cleanup
    shutdown.store(true, Ordering::SeqCst);
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Wait for audio thread
    let _ = audio_handle.join();
    tracing::info!("shutdown complete");

    result
}

/// Log to `<data_dir>/platter/platter.log`; the terminal belongs to the UI
fn init_logging() -> anyhow::Result<()> {
    let path = log_path();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    let filter = EnvFilter::try_from_env("PLATTER_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn log_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("platter")
        .join("platter.log")
}

fn run_audio_thread(
    settings: Settings,
    cmd_rx: Receiver<AudioCommand>,
    evt_tx: Sender<AudioEvent>,
    shutdown: Arc<AtomicBool>,
    sample_rate_out: Arc<AtomicU32>,
) {
    // Get audio host and device
    let host = cpal::default_host();
    let device = match host.default_output_device() {
        Some(d) => d,
        None => {
            tracing::error!("no audio output device");
            let _ = evt_tx.send(AudioEvent::Error("No audio output device found".into()));
            return;
        }
    };

    let supported = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = evt_tx.send(AudioEvent::Error(format!(
                "Failed to get audio config: {}",
                e
            )));
            return;
        }
    };

    let channels = supported.channels() as usize;
    let mut config: cpal::StreamConfig = supported.into();
    if let Some(rate) = settings.sample_rate {
        config.sample_rate = cpal::SampleRate(rate);
    }
    if let Some(frames) = settings.buffer_size {
        config.buffer_size = cpal::BufferSize::Fixed(frames);
    }
    let sample_rate = config.sample_rate.0;
    sample_rate_out.store(sample_rate, Ordering::Relaxed);
    tracing::info!(sample_rate, channels, "audio output configured");

    let session = shared_session(MixerSession::new(settings.to_session_config(sample_rate)));
    let session_for_callback = session.clone();

    // Pre-allocate conversion buffer (avoid allocation in audio callback)
    // 8192 stereo frames covers typical device buffers
    let mut stereo_buffer = vec![0.0f32; 16384];

    // Build audio stream
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            // Use try_lock to avoid blocking the real-time audio thread
            // On contention (rare), output silence rather than blocking
            let Some(mut session) = session_for_callback.try_lock() else {
                data.fill(0.0);
                return;
            };
            if channels == 2 {
                session.process(data);
                return;
            }

            let frames = data.len() / channels.max(1);
            if stereo_buffer.len() < frames * 2 {
                stereo_buffer.resize(frames * 2, 0.0);
            }
            let stereo = &mut stereo_buffer[..frames * 2];
            session.process(stereo);
            write_device_frames(stereo, data, channels);
        },
        |err| {
            tracing::error!(error = %err, "audio stream error");
        },
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = evt_tx.send(AudioEvent::Error(format!(
                "Failed to create audio stream: {}",
                e
            )));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = evt_tx.send(AudioEvent::Error(format!("Failed to start audio: {}", e)));
        return;
    }

    // Microphone is optional; without it ToggleMic reports an error
    let _mic_stream = match open_mic_stream(&host) {
        Ok((stream, reader)) => {
            session.lock().attach_mic(reader);
            Some(stream)
        }
        Err(e) => {
            tracing::warn!(error = %e, "microphone unavailable");
            None
        }
    };

    // State update interval
    let mut last_state_update = Instant::now();
    let state_update_interval = Duration::from_millis(33); // ~30fps

    // Command processing loop
    while !shutdown.load(Ordering::Relaxed) {
        if !pump_commands(&session, &cmd_rx, &evt_tx) {
            break;
        }

        // Send state updates periodically
        if last_state_update.elapsed() >= state_update_interval {
            let state = session.lock().snapshot();
            let _ = evt_tx.try_send(AudioEvent::StateUpdate(Box::new(state)));
            last_state_update = Instant::now();
        }

        thread::sleep(Duration::from_millis(5));
    }

    // Finalize any open recording before the streams drop
    session.lock().handle_command(AudioCommand::Shutdown);
    tracing::info!("audio thread stopped");
}

/// Spread interleaved stereo over a device with a different channel count
///
/// Mono gets the average; extra channels beyond the first two stay silent.
fn write_device_frames(stereo: &[f32], data: &mut [f32], channels: usize) {
    if channels == 0 {
        return;
    }
    for (frame, lr) in data.chunks_mut(channels).zip(stereo.chunks(2)) {
        if channels == 1 {
            frame[0] = (lr[0] + lr[1]) * 0.5;
        } else {
            frame[0] = lr[0];
            frame[1] = lr[1];
            frame[2..].fill(0.0);
        }
    }
}

/// Open the default input device and feed it into a mic ring buffer
fn open_mic_stream(host: &cpal::Host) -> anyhow::Result<(cpal::Stream, MicInputReader)> {
    let device = host
        .default_input_device()
        .context("no input device")?;
    let config = device.default_input_config()?;
    let channels = config.channels() as usize;
    let (mut writer, reader) = create_mic_ring_buffer(channels);

    let stream = device.build_input_stream(
        &config.into(),
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            writer.write(data);
        },
        |err| {
            tracing::error!(error = %err, "mic stream error");
        },
        None,
    )?;
    stream.play()?;
    tracing::info!(channels, "microphone input open");
    Ok((stream, reader))
}

/// Accept remote command connections on localhost, one thread per client
fn spawn_remote_listener(port: u16, commands: Sender<AudioCommand>, sample_rate: Arc<AtomicU32>) {
    let listener = match TcpListener::bind(("127.0.0.1", port)) {
        Ok(l) => l,
        Err(e) => {
            tracing::warn!(port, error = %e, "remote control disabled");
            return;
        }
    };
    tracing::info!(port, "remote control listening");

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let commands = commands.clone();
                    let sample_rate = sample_rate.clone();
                    thread::spawn(move || serve_remote_client(stream, commands, sample_rate));
                }
                Err(e) => tracing::debug!(error = %e, "remote accept failed"),
            }
        }
    });
}

fn serve_remote_client(stream: TcpStream, commands: Sender<AudioCommand>, sample_rate: Arc<AtomicU32>) {
    let peer = stream.peer_addr().ok();
    tracing::info!(?peer, "remote client connected");

    let reader = match stream.try_clone() {
        Ok(s) => BufReader::new(s),
        Err(e) => {
            tracing::warn!(error = %e, "remote client dropped");
            return;
        }
    };
    let result = serve_lines(reader, stream, |request| {
        let loader = TrackLoader::with_sample_rate(sample_rate.load(Ordering::Relaxed));
        dispatch_remote(request, &commands, &loader)
    });
    if let Err(e) = result {
        tracing::debug!(?peer, error = %e, "remote connection closed");
    }
    tracing::info!(?peer, "remote client disconnected");
}

/// Apply one remote request; decoding happens on the connection thread
fn dispatch_remote(
    request: RemoteRequest,
    commands: &Sender<AudioCommand>,
    loader: &TrackLoader,
) -> RemoteReply {
    let reply = request.success();
    let cmd = match request.action {
        RemoteAction::LoadTrack { deck, path } => match loader.load(&path) {
            Ok(track) => AudioCommand::Load(deck, track.into_shared()),
            Err(e) => return RemoteReply::error(format!("Failed to load: {}", e)),
        },
        RemoteAction::Audio(cmd) => cmd,
    };
    match commands.try_send(cmd) {
        Ok(()) => reply,
        Err(_) => RemoteReply::error("Audio engine unavailable"),
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    engine: AudioEngine,
    shutdown: Arc<AtomicBool>,
    mut settings: Settings,
    sample_rate: Arc<AtomicU32>,
) -> anyhow::Result<()> {
    let mut app = App::new();
    let mut input_handler = InputHandler::new();

    if let Some(theme) = Theme::by_name(&settings.theme) {
        app.state.theme = theme;
    }

    // Reopen the last browsed folder
    if let Some(folder) = settings.last_track_folder.clone() {
        browse_folder(&mut app, &mut settings, folder);
    }

    let frame_duration = Duration::from_millis(1000 / FPS);
    let started = Instant::now();
    let mut last_frame = Instant::now();

    app.state
        .set_message("Platter | Press ? for help, o for files, :load a <path> to load a track");

    loop {
        // Check for shutdown
        if shutdown.load(Ordering::Relaxed) || app.should_quit {
            engine.shutdown();
            break;
        }

        // Process audio events
        while let Ok(event) = engine.event_rx.try_recv() {
            app.state.handle_audio_event(event);
        }

        // Visualizer clock and peak holds
        app.state.update_frame(started.elapsed().as_secs_f64());

        // Render
        terminal.draw(|frame| {
            render_ui(frame, &mut app);
        })?;

        // Handle input
        let timeout = frame_duration.saturating_sub(last_frame.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let Some(cmd) = input_handler.handle_key(key) {
                    let loader = TrackLoader::with_sample_rate(sample_rate.load(Ordering::Relaxed));
                    let elapsed = started.elapsed().as_secs_f64();
                    handle_command(&mut app, &engine, &loader, &mut settings, cmd, elapsed);
                }

                // Update mode in app state
                app.state.set_mode(input_handler.mode());
                app.state.command_buffer = input_handler.command_buffer().to_string();
                input_handler.set_focused_deck(app.state.focused);
            }
        }

        // Maintain frame rate
        let elapsed = last_frame.elapsed();
        if elapsed < frame_duration {
            thread::sleep(frame_duration - elapsed);
        }
        last_frame = Instant::now();
    }

    Ok(())
}

fn handle_command(
    app: &mut App,
    engine: &AudioEngine,
    loader: &TrackLoader,
    settings: &mut Settings,
    cmd: Command,
    now: f64,
) {
    if let Some(audio) = cmd.audio_command() {
        engine.send(audio);
        return;
    }

    match cmd {
        // Commands that depend on the current session
        Command::CycleCurve => {
            let curve = app.state.session.curve.next();
            engine.send(AudioCommand::SetCrossfaderCurve(curve));
            app.state.set_message(format!("Crossfader curve: {}", curve));
        }
        Command::ToggleBroadcast => match app.state.session.broadcast {
            BroadcastState::Offline => {
                engine.send(AudioCommand::StartBroadcast(settings.broadcast_settings()))
            }
            BroadcastState::OnAir { .. } => engine.send(AudioCommand::StopBroadcast),
        },
        Command::StartBroadcast(broadcast) => engine.send(AudioCommand::StartBroadcast(broadcast)),
        Command::StartRecording(format) => {
            engine.send(AudioCommand::StartRecordingWith(RecorderConfig {
                format,
                quality: settings.recording_quality,
            }));
        }

        // Track loading
        Command::LoadTrack(deck, path) => load_track(app, engine, loader, deck, &path),
        Command::BrowseFolder(folder) => browse_folder(app, settings, folder),
        Command::BrowserSelectNext => app.state.browser.select_next(),
        Command::BrowserSelectPrev => app.state.browser.select_prev(),
        Command::BrowserSelectFirst => app.state.browser.select_first(),
        Command::BrowserSelectLast => app.state.browser.select_last(),
        Command::BrowserLoadToDeck(deck) => match app.state.browser.selected() {
            Some(path) => {
                let path = path.to_path_buf();
                load_track(app, engine, loader, deck, &path);
            }
            None => app.state.set_warning("No file selected"),
        },

        // UI
        Command::ToggleHelp => app.state.toggle_help(),
        Command::HelpScrollUp => app.state.help_scroll_up(),
        Command::HelpScrollDown => app.state.help_scroll_down(),
        Command::ToggleVisualizer => app.state.toggle_visualizer(now),
        Command::SetTheme(name) => {
            app.state.set_theme(&name);
            if Theme::by_name(&name).is_some() {
                settings.theme = name;
                save_settings(app, settings);
            }
        }
        Command::CycleFocus => app.state.cycle_focus(),

        // Mode changes
        Command::EnterCommandMode => app.state.set_mode(Mode::Command),
        Command::EnterNormalMode => app.state.set_mode(Mode::Normal),
        Command::EnterBrowserMode => {
            app.state.show_browser = true;
            app.state.set_mode(Mode::Browser);
        }

        // Application
        Command::Quit => app.quit(),
        Command::Cancel => {
            if app.state.show_help {
                app.state.toggle_help();
            } else {
                app.state.clear_message();
            }
        }
        Command::ExecuteCommand(input) => {
            app.state.set_error(format!("Unknown command: {}", input.trim()));
        }

        // Everything else maps straight to the engine above
        other => tracing::debug!(?other, "command without handler"),
    }
}

fn load_track(app: &mut App, engine: &AudioEngine, loader: &TrackLoader, deck: DeckId, path: &Path) {
    app.state
        .set_message(format!("Loading {}...", path.display()));

    match loader.load(path) {
        Ok(track) => {
            let name = track.metadata.display_name();
            tracing::info!(%deck, path = %path.display(), "track decoded");
            // Wrap in Arc to avoid copying large sample data through channel
            engine.send(AudioCommand::Load(deck, track.into_shared()));
            app.state
                .set_message(format!("Loading to deck {}: {}", deck, name));
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "track load failed");
            app.state.set_error(format!("Failed to load: {}", e));
        }
    }
}

/// List a folder in the browser and remember it for next time
fn browse_folder(app: &mut App, settings: &mut Settings, folder: PathBuf) {
    match audio_files_in(&folder) {
        Ok(entries) => {
            let count = entries.len();
            app.state.browser.set_entries(folder.clone(), entries);
            app.state.show_browser = true;
            app.state
                .set_message(format!("{} audio files in {}", count, folder.display()));
            if settings.last_track_folder.as_ref() != Some(&folder) {
                settings.last_track_folder = Some(folder);
                save_settings(app, settings);
            }
        }
        Err(e) => {
            app.state
                .set_error(format!("Cannot open {}: {}", folder.display(), e));
        }
    }
}

fn save_settings(app: &mut App, settings: &Settings) {
    if let Err(e) = settings.save() {
        tracing::warn!(error = %e, "settings not saved");
        app.state.set_warning(format!("Settings not saved: {}", e));
    }
}

fn render_ui(frame: &mut ratatui::Frame, app: &mut App) {
    let area = frame.area();
    let state = &mut app.state;
    let theme = &state.theme;

    // Clear with background
    let block = ratatui::widgets::Block::default().style(theme.normal());
    frame.render_widget(block, area);

    let show_browser = state.show_browser;
    let chunks = if show_browser {
        Layout::vertical([
            Constraint::Length(1),  // Title
            Constraint::Length(7),  // Decks
            Constraint::Length(10), // Visualizers + VU
            Constraint::Length(4),  // Crossfader
            Constraint::Min(5),     // File browser
            Constraint::Length(1),  // Status bar
        ])
        .split(area)
    } else {
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(7),
            Constraint::Min(10),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(area)
    };
    let status_idx = chunks.len() - 1;

    render_title(frame, chunks[0], theme);

    // Decks side by side
    let deck_chunks = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    for deck in DeckId::ALL {
        let idx = deck.index();
        let title = format!("DECK {}", deck);
        let widget = DeckWidget::new(&state.session.decks[idx], theme, &title)
            .focused(state.focused == deck)
            .peak_hold(state.deck_peaks[idx].value());
        frame.render_widget(widget, deck_chunks[idx]);
    }

    // Visualizer A | VU | Visualizer B
    let middle = Layout::horizontal([
        Constraint::Min(20),
        Constraint::Length(21),
        Constraint::Min(20),
    ])
    .split(chunks[2]);
    let mode = state.visualizer.mode();
    for (deck, slot) in [(DeckId::Left, middle[0]), (DeckId::Right, middle[2])] {
        let widget = VisualizerWidget::new(state.frames[deck.index()].as_ref(), deck, theme).mode(mode);
        frame.render_widget(widget, slot);
    }

    let level = |deck: DeckId| state.frames[deck.index()].as_ref().map_or(0.0, |f| f.level);
    let mic_level = if state.session.mic_enabled {
        state.session.mic_level
    } else {
        0.0
    };
    let vu_meter = MasterVuMeterWidget::new(theme)
        .levels(level(DeckId::Left), level(DeckId::Right))
        .peak_holds(state.deck_peaks[0].value(), state.deck_peaks[1].value())
        .mic(mic_level, state.mic_peak.value(), state.session.mic_enabled)
        .master_volume(state.session.master_volume);
    frame.render_widget(vu_meter, middle[1]);

    let (gain_a, gain_b) = state.session.gains;
    let crossfader = CrossfaderWidget::new(state.session.crossfader, theme)
        .curve(state.session.curve)
        .gains(gain_a, gain_b);
    frame.render_widget(crossfader, chunks[3]);

    if show_browser {
        let browser = BrowserWidget::new(&mut state.browser, &state.theme)
            .focused(state.mode == Mode::Browser);
        frame.render_widget(browser, chunks[4]);
    }

    let theme = &state.theme;

    // Status bar
    let status = StatusBarWidget::new(state.mode, &state.command_buffer, theme)
        .message(state.message.as_deref(), state.message_type)
        .mic(state.session.mic_enabled)
        .recording(state.session.recording.as_ref().map(|r| r.elapsed))
        .broadcast(&state.session.broadcast);
    frame.render_widget(status, chunks[status_idx]);

    // Help overlay (scrollable)
    if state.show_help {
        let help_area = centered_rect(72, 40, area);
        let help = HelpWidget::new(theme).scroll(state.help_scroll);
        frame.render_widget(help, help_area);
    }
}

fn render_title(frame: &mut ratatui::Frame, area: Rect, theme: &Theme) {
    use ratatui::text::{Line, Span};
    use ratatui::widgets::Paragraph;

    let title_text = " PLATTER ";
    let padding = (area.width as usize).saturating_sub(title_text.len()) / 2;
    let padded = format!(
        "{:═<pad$}{}{:═<rest$}",
        "",
        title_text,
        "",
        pad = padding,
        rest = (area.width as usize).saturating_sub(padding + title_text.len())
    );

    let line = Line::from(Span::styled(padded, theme.title()));
    frame.render_widget(Paragraph::new(line), area);
}

/// Create a centered rectangle
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use platter_input::parse_request;

    #[test]
    fn test_centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 50, 20);
        assert_eq!(centered_rect(72, 40, area), Rect::new(0, 0, 50, 20));
        assert_eq!(centered_rect(10, 4, area), Rect::new(20, 8, 10, 4));
    }

    #[test]
    fn test_mono_and_surround_output() {
        let stereo = [0.2, 0.4, -0.5, 0.5];

        let mut mono = [0.0; 2];
        write_device_frames(&stereo, &mut mono, 1);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!(mono[1].abs() < 1e-6);

        let mut quad = [9.0; 8];
        write_device_frames(&stereo, &mut quad, 4);
        assert_eq!(quad, [0.2, 0.4, 0.0, 0.0, -0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_remote_dispatch_forwards_engine_commands() {
        let (cmd_tx, cmd_rx, _evt_tx, _evt_rx) = AudioEngine::create_channels();
        let loader = TrackLoader::new();

        let request = parse_request(r#"{"command":"crossfader","params":{"position":0.25}}"#).unwrap();
        let reply = dispatch_remote(request, &cmd_tx, &loader);
        assert!(!reply.to_json().contains("error"));
        assert!(matches!(cmd_rx.try_recv(), Ok(AudioCommand::SetCrossfader(p)) if p == 0.25));
    }

    #[test]
    fn test_remote_load_failure_is_reported() {
        let (cmd_tx, cmd_rx, _evt_tx, _evt_rx) = AudioEngine::create_channels();
        let loader = TrackLoader::new();

        let request = parse_request(
            r#"{"command":"load_track","params":{"deck":0,"path":"/nonexistent/track.mp3"}}"#,
        )
        .unwrap();
        let reply = dispatch_remote(request, &cmd_tx, &loader).to_json();
        assert!(reply.starts_with(r#"{"error":"Failed to load"#));
        assert!(cmd_rx.try_recv().is_err());
    }
}
