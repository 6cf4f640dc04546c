//! Fixed-size frame codec for the tagger wire protocol.
//!
//! Every frame on the wire is exactly [`FRAME_LEN`] bytes:
//! - Telemetry notifications decode into [`TelemetryFrame`]
//! - The identity record decodes into [`TaggerIdentity`]
//! - Outbound [`Command`]s encode into zero-filled frames via [`CommandEncoder`]
//!
//! Decoding never partially applies: a frame of the wrong length is rejected whole.

pub mod command;
pub mod error;
pub mod identity;
pub mod telemetry;

pub use command::{encode_command, Command, CommandEncoder, FireMode, ShotMode};
pub use error::{DecodeError, Result};
pub use identity::{TaggerIdentity, TaggerType};
pub use telemetry::{decode_telemetry, TelemetryFrame};

/// Length of every frame exchanged with the tagger.
pub const FRAME_LEN: usize = 20;

/// Hex rendering of a frame for logs and diagnostics.
pub fn to_hex(frame: &[u8]) -> String {
    recoil_link::hex::encode(frame)
}
