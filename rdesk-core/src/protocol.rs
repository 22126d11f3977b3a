//! Serializable calls accepted by [`RemoteControlService::dispatch`].
//!
//! ```text
//! Controller ──[Request]──► transport ──► RemoteControlService::dispatch
//! Controller ◄─[Response]── transport ◄──┘
//! ```
//!
//! Every request except `Connect` carries the session token. Payloads
//! are `serde` types encoded with `bincode`; framing is the transport's
//! business.
//!
//! [`RemoteControlService::dispatch`]: crate::service::RemoteControlService::dispatch

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::session::Token;

// ── Request ──────────────────────────────────────────────────────

/// One remote-control call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Request {
    Connect { password: u16 },
    Disconnect { token: Token },
    GetScreenShot { token: Token },
    KeyPress { token: Token, key_code: i32 },
    KeyRelease { token: Token, key_code: i32 },
    MousePress { token: Token, button: i32 },
    MouseRelease { token: Token, button: i32 },
    MouseMove { token: Token, x: f32, y: f32, absolute: bool },
    MouseScroll { token: Token, direction: i16 },
    ChangeVolume { token: Token, delta: f32 },
    /// A file chunk; `chunk: None` ends the upload and flushes the file.
    SendFile {
        token: Token,
        file_name: String,
        chunk: Option<Vec<u8>>,
    },
    Ping { token: Token },
    Shutdown { token: Token },
    Restart { token: Token },
}

impl Request {
    /// Token carried by the request; `None` for `Connect`.
    pub fn token(&self) -> Option<Token> {
        match self {
            Request::Connect { .. } => None,
            Request::Disconnect { token }
            | Request::GetScreenShot { token }
            | Request::KeyPress { token, .. }
            | Request::KeyRelease { token, .. }
            | Request::MousePress { token, .. }
            | Request::MouseRelease { token, .. }
            | Request::MouseMove { token, .. }
            | Request::MouseScroll { token, .. }
            | Request::ChangeVolume { token, .. }
            | Request::SendFile { token, .. }
            | Request::Ping { token }
            | Request::Shutdown { token }
            | Request::Restart { token } => Some(*token),
        }
    }

    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Connect { .. } => "connect",
            Request::Disconnect { .. } => "disconnect",
            Request::GetScreenShot { .. } => "getScreenShot",
            Request::KeyPress { .. } => "keyPress",
            Request::KeyRelease { .. } => "keyRelease",
            Request::MousePress { .. } => "mousePress",
            Request::MouseRelease { .. } => "mouseRelease",
            Request::MouseMove { .. } => "mouseMove",
            Request::MouseScroll { .. } => "mouseScroll",
            Request::ChangeVolume { .. } => "changeVolume",
            Request::SendFile { .. } => "sendFile",
            Request::Ping { .. } => "ping",
            Request::Shutdown { .. } => "shutdown",
            Request::Restart { .. } => "restart",
        }
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RemoteError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RemoteError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

// ── Response ─────────────────────────────────────────────────────

/// Result of one call, shaped per operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Response {
    /// `Connect`: the new token, or the sentinel on failure.
    Token(Token),
    /// `Disconnect`, `SendFile`, `Ping`, `Shutdown`, `Restart`.
    Success(bool),
    /// `GetScreenShot`: JPEG bytes, or `None` when no new frame exists
    /// or the token was rejected.
    Screenshot(Option<Vec<u8>>),
    /// Input and volume calls report nothing.
    Done,
}

impl Response {
    /// Whether this response reports a successful call.
    pub fn is_success(&self) -> bool {
        match self {
            Response::Token(token) => !token.is_sentinel(),
            Response::Success(ok) => *ok,
            Response::Screenshot(frame) => frame.is_some(),
            Response::Done => true,
        }
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RemoteError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RemoteError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
