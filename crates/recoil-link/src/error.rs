use crate::gatt::Characteristic;

/// Errors that can occur on the wireless link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No notification arrived within the receive timeout.
    ///
    /// This is not a failure; callers poll again.
    #[error("timed out waiting for notification")]
    Timeout,

    /// The link to the peripheral was lost.
    #[error("link disconnected: {0}")]
    Disconnected(String),

    /// The requested device could not be found or connected.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The peripheral does not expose the characteristic for this operation.
    #[error("characteristic {0} does not support this operation")]
    UnsupportedCharacteristic(Characteristic),

    /// An I/O error occurred in the underlying link implementation.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A capture script could not be parsed.
    #[error("invalid capture at line {line}: {message}")]
    Capture { line: usize, message: String },
}

impl LinkError {
    /// True for the benign receive timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Timeout)
    }

    /// True when the error means the link is gone for good.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, LinkError::Disconnected(_))
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
