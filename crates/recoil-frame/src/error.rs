/// Errors that can occur while decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not exactly the fixed protocol length.
    #[error("wrong frame length ({actual} bytes, expected {expected})")]
    WrongLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, DecodeError>;

pub(crate) fn check_len(data: &[u8]) -> Result<&[u8; crate::FRAME_LEN]> {
    data.try_into().map_err(|_| DecodeError::WrongLength {
        expected: crate::FRAME_LEN,
        actual: data.len(),
    })
}
