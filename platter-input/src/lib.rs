//! Vim-style modal keyboard input and the remote command codec for Platter

mod commands;
mod modal;
pub mod remote;

pub use commands::{Command, Direction, Mode, CROSSFADER_STEP, SCRATCH_VELOCITY};
pub use modal::{parse_command, InputHandler};
pub use remote::{
    parse_request, serve_lines, RemoteAction, RemoteError, RemoteReply, RemoteRequest,
    DEFAULT_REMOTE_PORT,
};
