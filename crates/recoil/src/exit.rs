use std::fmt;
use std::io;

use recoil_frame::DecodeError;
use recoil_link::LinkError;
use recoil_session::SessionError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const LINK_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Io(source) => io_error(context, source),
        LinkError::Timeout => CliError::new(TIMEOUT, format!("{context}: {err}")),
        LinkError::Capture { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        LinkError::DeviceNotFound(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(LINK_ERROR, format!("{context}: {other}")),
    }
}

pub fn decode_error(context: &str, err: DecodeError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Link(err) => link_error(context, err),
        SessionError::Decode(err) => decode_error(context, err),
        SessionError::Io(err) => io_error(context, err),
        SessionError::InvalidConfig(_) | SessionError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}
