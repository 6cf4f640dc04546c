/// Errors that can occur while establishing or configuring a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Link-level error.
    #[error("link error: {0}")]
    Link(#[from] recoil_link::LinkError),

    /// A frame read from the device could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] recoil_frame::DecodeError),

    /// The session configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading configuration from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reload requests the state machine refused.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// Reload pressed during the cooldown; the press is dropped.
    #[error("still reloading")]
    AlreadyReloading,

    /// The reload timer could not be started.
    #[error("reload timer failed: {0}")]
    Timer(std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
