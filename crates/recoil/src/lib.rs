//! Telemetry and control for Bluetooth LE laser-tag taggers.
//!
//! recoil decodes the 20-byte telemetry notifications a tagger streams,
//! turns button counters and hit slots into events, runs the reload
//! cooldown, and encodes the configuration commands written back.
//!
//! # Crate Structure
//!
//! - [`link`]: GATT characteristic table, link traits and the capture replay link
//! - [`frame`]: Telemetry and identity decoding, command encoding
//! - [`session`]: Session loop, reload state machine and connection supervisor (behind `session` feature)

/// Re-export link types.
pub mod link {
    pub use recoil_link::*;
}

/// Re-export frame types.
pub mod frame {
    pub use recoil_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use recoil_session::*;
}
