//! Hit event decoding.
//!
//! Byte 10 of the telemetry frame carries a 4-bit hit counter (low nibble)
//! and the reporting sensor (high nibble). The counter is zero while no hit
//! is active and repeats in every notification until the next hit, so only a
//! change to a new non-zero value is a new event.

use recoil_frame::TelemetryFrame;
use serde::Serialize;

/// A decoded hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IrEvent {
    pub event_counter: u8,
    pub sensor_source: u8,
    pub payload: u16,
    pub weapon_type: u16,
    pub gun_id: u8,
    pub shot_counter: u8,
    pub round_counter: u8,
    pub is_grenade: bool,
}

impl IrEvent {
    pub fn from_frame(frame: &TelemetryFrame) -> Self {
        let payload = frame.ir_payload();
        Self {
            event_counter: frame.ir_event_counter(),
            sensor_source: frame.ir_sensor_source(),
            payload,
            weapon_type: payload & 0x3C0,
            gun_id: ((payload & 0xFC00) >> 10) as u8,
            shot_counter: (payload & 0x7) as u8,
            round_counter: ((payload & 0x38) >> 3) as u8,
            is_grenade: (payload & 0x300) == 0x300,
        }
    }
}

/// De-duplicates hit notifications.
///
/// The device format leaves room for a second event slot, but only slot 0
/// is ever populated, so a single counter is tracked.
#[derive(Debug, Default)]
pub struct IrEventDecoder {
    last_counter: Option<u8>,
}

impl IrEventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_counter = None;
    }

    /// Last accepted event counter.
    pub fn last_counter(&self) -> Option<u8> {
        self.last_counter
    }

    pub fn observe(&mut self, frame: &TelemetryFrame) -> Option<IrEvent> {
        let counter = frame.ir_event_counter();
        if counter == 0 || self.last_counter == Some(counter) {
            return None;
        }
        self.last_counter = Some(counter);
        Some(IrEvent::from_frame(frame))
    }
}
