use std::fmt;

use recoil_link::Characteristic;
use serde::{Deserialize, Serialize};

use crate::identity::TaggerType;
use crate::FRAME_LEN;

/// Opcodes in byte 2 of every outbound frame.
const OP_RECOIL_OR_RELOAD_START: u8 = 0x02;
const OP_RELOAD_FINISH: u8 = 0x04;
const OP_FIRE_CONFIG: u8 = 0x09;

/// Trigger behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireMode {
    #[default]
    Single,
    Burst,
    Auto,
}

impl FireMode {
    /// Next mode in the action-button cycle: single, burst, auto, single.
    pub fn next(self) -> Self {
        match self {
            FireMode::Single => FireMode::Burst,
            FireMode::Burst => FireMode::Auto,
            FireMode::Auto => FireMode::Single,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FireMode::Single => "Single",
            FireMode::Burst => "Burst",
            FireMode::Auto => "Auto",
        }
    }
}

impl fmt::Display for FireMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// IR emitter power and cone profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotMode {
    OutdoorNoCone,
    OutdoorWithCone,
    #[default]
    IndoorNoCone,
}

impl ShotMode {
    pub fn label(self) -> &'static str {
        match self {
            ShotMode::OutdoorNoCone => "Outdoor",
            ShotMode::OutdoorWithCone => "Outdoor (cone)",
            ShotMode::IndoorNoCone => "Indoor",
        }
    }
}

impl fmt::Display for ShotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An instruction for the tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    StartReload,
    FinishReload { ammo: u8 },
    SetRecoil { enabled: bool },
    SetFireConfig { mode: FireMode, shot: ShotMode },
}

impl Command {
    /// Characteristic this command is written to.
    pub fn target(&self) -> Characteristic {
        match self {
            Command::StartReload | Command::FinishReload { .. } => Characteristic::Command,
            Command::SetRecoil { .. } | Command::SetFireConfig { .. } => Characteristic::Config,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::StartReload => "start_reload",
            Command::FinishReload { .. } => "finish_reload",
            Command::SetRecoil { .. } => "set_recoil",
            Command::SetFireConfig { .. } => "set_fire_config",
        }
    }
}

/// Encodes commands for one connected tagger.
///
/// Fire configuration depends on the hardware family, so the encoder carries
/// the tagger type resolved at connect time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandEncoder {
    tagger_type: TaggerType,
}

impl CommandEncoder {
    pub fn new(tagger_type: TaggerType) -> Self {
        Self { tagger_type }
    }

    pub fn tagger_type(&self) -> TaggerType {
        self.tagger_type
    }

    pub fn encode(&self, command: &Command) -> [u8; FRAME_LEN] {
        encode_command(command, self.tagger_type)
    }
}

/// Encode a command into its 20-byte frame.
///
/// Layout (bytes not listed are zero):
/// ```text
/// StartReload     [0]=F0 [2]=02
/// FinishReload    [2]=04 [6]=ammo
/// SetRecoil       [0]=10 [2]=02 [3]=03 on / 02 off [4]=FF
/// SetFireConfig   [2]=09 [3..5]=mode [5..7]=cone [7]=FF [8]=FF [9]=80|78 [10]=02 [11]=34
/// ```
pub fn encode_command(command: &Command, tagger_type: TaggerType) -> [u8; FRAME_LEN] {
    let mut data = [0u8; FRAME_LEN];

    match *command {
        Command::StartReload => {
            data[0] = 0xF0;
            data[2] = OP_RECOIL_OR_RELOAD_START;
        }
        Command::FinishReload { ammo } => {
            data[2] = OP_RELOAD_FINISH;
            data[6] = ammo;
        }
        Command::SetRecoil { enabled } => {
            data[0] = 0x10;
            data[2] = OP_RECOIL_OR_RELOAD_START;
            data[3] = if enabled { 0x03 } else { 0x02 };
            data[4] = 0xFF;
        }
        Command::SetFireConfig { mode, shot } => {
            data[2] = OP_FIRE_CONFIG;
            data[7] = 0xFF;
            data[8] = 0xFF;
            data[9] = 0x80;
            data[10] = 0x02;
            data[11] = 0x34;

            let (b3, b4) = match mode {
                FireMode::Single => (0xFE, 0x00),
                FireMode::Burst => (0x03, 0x03),
                FireMode::Auto => (0xFE, 0x01),
            };
            data[3] = b3;
            data[4] = b4;
            // Rifle burst timing differs from every other combination.
            if mode == FireMode::Burst && tagger_type == TaggerType::Rifle {
                data[9] = 0x78;
            }

            let (b5, b6) = match shot {
                ShotMode::IndoorNoCone => (0x19, 0x00),
                ShotMode::OutdoorWithCone => (0xFF, 0xC8),
                ShotMode::OutdoorNoCone => (0xFF, 0x00),
            };
            data[5] = b5;
            data[6] = b6;
        }
    }

    data
}
