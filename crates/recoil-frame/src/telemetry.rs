use serde::Serialize;

use crate::error::{check_len, Result};
use crate::FRAME_LEN;

const PLAYER_ID: usize = 1;
const BUTTONS: usize = 2;
const FIRE_RELOAD_COUNT: usize = 3;
const BACK_COUNT: usize = 4;
const POWER_COUNT: usize = 5;
const BATTERY: usize = 7;
const IR_LOW: usize = 8;
const IR_HIGH: usize = 9;
const IR_META: usize = 10;
const AMMO: usize = 14;

/// A decoded telemetry notification.
///
/// Wire layout (0-indexed):
/// ```text
/// ┌────┬────────┬─────────┬──────────────────┬──────┬───────┬───┬─────────┬────────┬─────────┬──────────┬──────┐
/// │ 0  │ 1      │ 2       │ 3                │ 4    │ 5     │ 6 │ 7       │ 8      │ 9       │ 10       │ 14   │
/// │ -  │ player │ buttons │ reload:4 | fire:4│ back │ power │ - │ battery │ ir low │ ir high │ src | ctr│ ammo │
/// └────┴────────┴─────────┴──────────────────┴──────┴───────┴───┴─────────┴────────┴─────────┴──────────┴──────┘
/// ```
/// Counter fields are 4-bit wrapping press counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TelemetryFrame {
    pub player_id: u8,
    pub buttons_raw: u8,
    pub fire_count: u8,
    /// High nibble of byte 3, shifted down into `0..16`.
    pub reload_count: u8,
    pub back_count: u8,
    pub power_count: u8,
    pub battery_level: u8,
    pub ir_low: u8,
    pub ir_high: u8,
    pub ir_meta: u8,
    pub ammo_count: u8,
    #[serde(skip)]
    raw: [u8; FRAME_LEN],
}

impl TelemetryFrame {
    /// Hit event counter (low nibble of byte 10). Zero means no active event.
    pub fn ir_event_counter(&self) -> u8 {
        self.ir_meta & 0x0F
    }

    /// Sensor that registered the hit (high nibble of byte 10).
    pub fn ir_sensor_source(&self) -> u8 {
        self.ir_meta >> 4
    }

    /// 16-bit hit payload.
    pub fn ir_payload(&self) -> u16 {
        u16::from(self.ir_low) | (u16::from(self.ir_high) << 8)
    }

    /// The undecoded notification bytes.
    pub fn raw(&self) -> &[u8; FRAME_LEN] {
        &self.raw
    }
}

/// Decode a telemetry notification.
///
/// Only the length is validated; every 20-byte pattern is a valid frame.
pub fn decode_telemetry(data: &[u8]) -> Result<TelemetryFrame> {
    let raw = check_len(data)?;
    Ok(TelemetryFrame {
        player_id: raw[PLAYER_ID],
        buttons_raw: raw[BUTTONS],
        fire_count: raw[FIRE_RELOAD_COUNT] & 0x0F,
        reload_count: (raw[FIRE_RELOAD_COUNT] & 0xF0) >> 4,
        back_count: raw[BACK_COUNT] & 0x0F,
        power_count: raw[POWER_COUNT] & 0x0F,
        battery_level: raw[BATTERY],
        ir_low: raw[IR_LOW],
        ir_high: raw[IR_HIGH],
        ir_meta: raw[IR_META],
        ammo_count: raw[AMMO],
        raw: *raw,
    })
}
