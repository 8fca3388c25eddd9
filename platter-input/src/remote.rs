//! Remote command codec - line-delimited JSON requests and replies
//!
//! Each request is one line `{"command": "...", "params": {...}}`. Each
//! reply is one line, either `{"status": "...", "deck": n}` or
//! `{"error": "..."}`.

use platter_audio::{AudioCommand, DeckId, EffectKind, EqBand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Default TCP port for the remote socket
pub const DEFAULT_REMOTE_PORT: u16 = 8765;

/// Remote request errors
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Unknown command")]
    UnknownCommand(String),
    #[error("Invalid params for {command}: {message}")]
    InvalidParams { command: String, message: String },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    command: String,
    #[serde(default)]
    params: Value,
}

/// Deck given either as an index (0/1) or a name ("A", "left", ...)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DeckParam {
    Index(usize),
    Name(String),
}

impl DeckParam {
    fn resolve(&self) -> Result<DeckId, String> {
        match self {
            DeckParam::Index(i) => DeckId::from_index(*i).ok_or_else(|| format!("no deck {}", i)),
            DeckParam::Name(name) => name.parse(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeckOnly {
    deck: DeckParam,
}

#[derive(Debug, Deserialize)]
struct LoadParams {
    deck: DeckParam,
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct PowerParams {
    deck: DeckParam,
    /// Absent toggles
    on: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ValueParams {
    deck: DeckParam,
    value: f32,
}

#[derive(Debug, Deserialize)]
struct EqParams {
    deck: DeckParam,
    band: String,
    value: f32,
}

#[derive(Debug, Deserialize)]
struct EffectParams {
    deck: DeckParam,
    effect: String,
}

#[derive(Debug, Deserialize)]
struct ScratchParams {
    deck: DeckParam,
    velocity: f64,
}

#[derive(Debug, Deserialize)]
struct CrossfaderParams {
    position: f32,
}

/// What a request asks the application to do
#[derive(Debug, Clone)]
pub enum RemoteAction {
    /// Decode a file and load it; handled outside the engine
    LoadTrack { deck: DeckId, path: PathBuf },
    Audio(AudioCommand),
}

/// A parsed request with the reply to send once it succeeds
#[derive(Debug, Clone)]
pub struct RemoteRequest {
    pub action: RemoteAction,
    status: &'static str,
    deck: Option<DeckId>,
}

impl RemoteRequest {
    /// Reply for a successfully applied request
    pub fn success(&self) -> RemoteReply {
        RemoteReply::Status {
            status: self.status.to_string(),
            deck: self.deck.map(DeckId::index),
        }
    }
}

/// One reply line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RemoteReply {
    Status {
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        deck: Option<usize>,
    },
    Error {
        error: String,
    },
}

impl RemoteReply {
    pub fn error(message: impl Into<String>) -> Self {
        RemoteReply::Error {
            error: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"error":"reply serialization failed"}"#.to_string())
    }
}

impl From<&RemoteError> for RemoteReply {
    fn from(err: &RemoteError) -> Self {
        RemoteReply::error(err.to_string())
    }
}

fn params<T: for<'de> Deserialize<'de>>(command: &str, value: Value) -> Result<T, RemoteError> {
    // Missing params behave like an empty object
    let value = if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    };
    serde_json::from_value(value).map_err(|e| RemoteError::InvalidParams {
        command: command.to_string(),
        message: e.to_string(),
    })
}

fn deck(command: &str, param: &DeckParam) -> Result<DeckId, RemoteError> {
    param.resolve().map_err(|message| RemoteError::InvalidParams {
        command: command.to_string(),
        message,
    })
}

/// Parse one request line
pub fn parse_request(line: &str) -> Result<RemoteRequest, RemoteError> {
    let Envelope { command, params: raw } = serde_json::from_str(line)?;
    let name = command.as_str();

    let request = |action, status, deck| RemoteRequest {
        action,
        status,
        deck,
    };

    let parsed = match name {
        "load_track" => {
            let p: LoadParams = params(name, raw)?;
            let d = deck(name, &p.deck)?;
            request(
                RemoteAction::LoadTrack {
                    deck: d,
                    path: p.path,
                },
                "Track loaded",
                Some(d),
            )
        }
        "play" => {
            let d = deck(name, &params::<DeckOnly>(name, raw)?.deck)?;
            request(RemoteAction::Audio(AudioCommand::Play(d)), "Playing", Some(d))
        }
        "pause" | "stop" => {
            let d = deck(name, &params::<DeckOnly>(name, raw)?.deck)?;
            let status = if name == "pause" { "Paused" } else { "Stopped" };
            request(RemoteAction::Audio(AudioCommand::Stop(d)), status, Some(d))
        }
        "power" => {
            let p: PowerParams = params(name, raw)?;
            let d = deck(name, &p.deck)?;
            let (cmd, status) = match p.on {
                Some(true) => (AudioCommand::Power(d, true), "Powered on"),
                Some(false) => (AudioCommand::Power(d, false), "Powered off"),
                None => (AudioCommand::TogglePower(d), "Power toggled"),
            };
            request(RemoteAction::Audio(cmd), status, Some(d))
        }
        "set_volume" => {
            let p: ValueParams = params(name, raw)?;
            let d = deck(name, &p.deck)?;
            request(
                RemoteAction::Audio(AudioCommand::SetVolume(d, p.value)),
                "Volume set",
                Some(d),
            )
        }
        "set_pitch" => {
            let p: ValueParams = params(name, raw)?;
            let d = deck(name, &p.deck)?;
            request(
                RemoteAction::Audio(AudioCommand::SetPitch(d, p.value)),
                "Pitch set",
                Some(d),
            )
        }
        "set_eq" => {
            let p: EqParams = params(name, raw)?;
            let d = deck(name, &p.deck)?;
            let band: EqBand = p.band.parse().map_err(|_| RemoteError::InvalidParams {
                command: name.to_string(),
                message: format!("unknown band '{}'", p.band),
            })?;
            request(
                RemoteAction::Audio(AudioCommand::SetEq(d, band, p.value)),
                "EQ set",
                Some(d),
            )
        }
        "toggle_effect" => {
            let p: EffectParams = params(name, raw)?;
            let d = deck(name, &p.deck)?;
            let kind: EffectKind = p.effect.parse().map_err(|message| RemoteError::InvalidParams {
                command: name.to_string(),
                message,
            })?;
            request(
                RemoteAction::Audio(AudioCommand::ToggleEffect(d, kind)),
                "Effect toggled",
                Some(d),
            )
        }
        "set_cue" => {
            let d = deck(name, &params::<DeckOnly>(name, raw)?.deck)?;
            request(RemoteAction::Audio(AudioCommand::Cue(d)), "Cue set", Some(d))
        }
        "scratch" => {
            let p: ScratchParams = params(name, raw)?;
            let d = deck(name, &p.deck)?;
            request(
                RemoteAction::Audio(AudioCommand::Scratch(d, p.velocity)),
                "Scratching",
                Some(d),
            )
        }
        "crossfader" => {
            let p: CrossfaderParams = params(name, raw)?;
            request(
                RemoteAction::Audio(AudioCommand::SetCrossfader(p.position)),
                "Crossfader set",
                None,
            )
        }
        _ => return Err(RemoteError::UnknownCommand(name.to_string())),
    };
    Ok(parsed)
}

/// Serve one connection: read request lines, write one reply per line
///
/// `dispatch` applies a parsed request and returns its reply. Returns when
/// the reader hits end of stream.
pub fn serve_lines<R, W, F>(reader: R, mut writer: W, mut dispatch: F) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    F: FnMut(RemoteRequest) -> RemoteReply,
{
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match parse_request(line) {
            Ok(request) => dispatch(request),
            Err(e) => {
                tracing::debug!(error = %e, "rejected remote request");
                RemoteReply::from(&e)
            }
        };
        writeln!(writer, "{}", reply.to_json())?;
        writer.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_play_by_index_and_name() {
        let req = parse_request(r#"{"command":"play","params":{"deck":1}}"#).unwrap();
        assert!(matches!(
            req.action,
            RemoteAction::Audio(AudioCommand::Play(DeckId::Right))
        ));
        assert_eq!(req.success().to_json(), r#"{"status":"Playing","deck":1}"#);

        let req = parse_request(r#"{"command":"pause","params":{"deck":"A"}}"#).unwrap();
        assert!(matches!(
            req.action,
            RemoteAction::Audio(AudioCommand::Stop(DeckId::Left))
        ));
        assert_eq!(req.success().to_json(), r#"{"status":"Paused","deck":0}"#);
    }

    #[test]
    fn test_load_track() {
        let req =
            parse_request(r#"{"command":"load_track","params":{"deck":0,"path":"/m/a.mp3"}}"#)
                .unwrap();
        match req.action {
            RemoteAction::LoadTrack { deck, ref path } => {
                assert_eq!(deck, DeckId::Left);
                assert_eq!(path, &PathBuf::from("/m/a.mp3"));
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_value_commands() {
        let req = parse_request(r#"{"command":"set_eq","params":{"deck":0,"band":"bass","value":-6}}"#)
            .unwrap();
        assert!(matches!(
            req.action,
            RemoteAction::Audio(AudioCommand::SetEq(DeckId::Left, EqBand::Low, v)) if v == -6.0
        ));

        let req = parse_request(r#"{"command":"scratch","params":{"deck":"b","velocity":50}}"#)
            .unwrap();
        assert!(matches!(
            req.action,
            RemoteAction::Audio(AudioCommand::Scratch(DeckId::Right, v)) if v == 50.0
        ));

        let req = parse_request(r#"{"command":"crossfader","params":{"position":0.25}}"#).unwrap();
        assert_eq!(req.success().to_json(), r#"{"status":"Crossfader set"}"#);

        let req = parse_request(r#"{"command":"power","params":{"deck":0}}"#).unwrap();
        assert!(matches!(
            req.action,
            RemoteAction::Audio(AudioCommand::TogglePower(DeckId::Left))
        ));
    }

    #[test]
    fn test_toggle_effect() {
        let req =
            parse_request(r#"{"command":"toggle_effect","params":{"deck":1,"effect":"reverb"}}"#)
                .unwrap();
        assert!(matches!(
            req.action,
            RemoteAction::Audio(AudioCommand::ToggleEffect(DeckId::Right, EffectKind::Reverb))
        ));
        assert_eq!(req.success().to_json(), r#"{"status":"Effect toggled","deck":1}"#);

        assert!(matches!(
            parse_request(r#"{"command":"toggle_effect","params":{"deck":0,"effect":"phaser"}}"#),
            Err(RemoteError::InvalidParams { .. })
        ));
        assert!(matches!(
            parse_request(r#"{"command":"toggle_effect","params":{"deck":0}}"#),
            Err(RemoteError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_rejections() {
        let err = parse_request(r#"{"command":"eject","params":{}}"#).unwrap_err();
        assert_eq!(RemoteReply::from(&err).to_json(), r#"{"error":"Unknown command"}"#);

        assert!(matches!(
            parse_request("not json"),
            Err(RemoteError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_request(r#"{"command":"play","params":{"deck":2}}"#),
            Err(RemoteError::InvalidParams { .. })
        ));
        assert!(matches!(
            parse_request(r#"{"command":"play"}"#),
            Err(RemoteError::InvalidParams { .. })
        ));
        assert!(matches!(
            parse_request(r#"{"command":"set_eq","params":{"deck":0,"band":"sub","value":1}}"#),
            Err(RemoteError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_serve_lines() {
        let input = "{\"command\":\"play\",\"params\":{\"deck\":0}}\n\n{\"command\":\"nope\"}\n";
        let mut output = Vec::new();
        let mut seen = Vec::new();

        serve_lines(Cursor::new(input), &mut output, |req| {
            seen.push(req.action.clone());
            req.success()
        })
        .unwrap();

        assert_eq!(seen.len(), 1);
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"status":"Playing","deck":0}"#,
                r#"{"error":"Unknown command"}"#
            ]
        );
    }
}
