use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use recoil_frame::{FireMode, ShotMode, TaggerType};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod replay;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a telemetry or identity frame given as hex.
    Decode(DecodeArgs),
    /// Encode a command frame.
    Encode(EncodeArgs),
    /// Run a full session against a recorded capture.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex (separators and a 0x prefix are accepted).
    pub hex: String,
    /// Decode as the identity record instead of telemetry.
    #[arg(long)]
    pub identity: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EncodeKind {
    StartReload,
    FinishReload,
    Recoil,
    FireConfig,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TaggerArg {
    Pistol,
    Rifle,
}

impl From<TaggerArg> for TaggerType {
    fn from(value: TaggerArg) -> Self {
        match value {
            TaggerArg::Pistol => TaggerType::Pistol,
            TaggerArg::Rifle => TaggerType::Rifle,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FireModeArg {
    Single,
    Burst,
    Auto,
}

impl From<FireModeArg> for FireMode {
    fn from(value: FireModeArg) -> Self {
        match value {
            FireModeArg::Single => FireMode::Single,
            FireModeArg::Burst => FireMode::Burst,
            FireModeArg::Auto => FireMode::Auto,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ShotModeArg {
    OutdoorNoCone,
    OutdoorWithCone,
    IndoorNoCone,
}

impl From<ShotModeArg> for ShotMode {
    fn from(value: ShotModeArg) -> Self {
        match value {
            ShotModeArg::OutdoorNoCone => ShotMode::OutdoorNoCone,
            ShotModeArg::OutdoorWithCone => ShotMode::OutdoorWithCone,
            ShotModeArg::IndoorNoCone => ShotMode::IndoorNoCone,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command to encode.
    #[arg(value_enum)]
    pub kind: EncodeKind,
    /// Tagger the command is meant for.
    #[arg(long, value_enum, default_value = "pistol")]
    pub tagger: TaggerArg,
    /// Magazine size for finish-reload.
    #[arg(long, default_value_t = 30)]
    pub ammo: u8,
    /// Disable recoil (recoil command).
    #[arg(long)]
    pub off: bool,
    /// Fire mode (fire-config command).
    #[arg(long, value_enum, default_value = "single")]
    pub mode: FireModeArg,
    /// Shot mode (fire-config command).
    #[arg(long, value_enum, default_value = "indoor-no-cone")]
    pub shot: ShotModeArg,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Capture script to play back.
    pub capture: PathBuf,
    /// Session config file (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Override the reload cooldown (e.g. 3s, 500ms).
    #[arg(long, value_name = "DURATION")]
    pub reload_interval: Option<String>,
    /// Override the receive poll timeout (e.g. 1s, 50ms).
    #[arg(long, value_name = "DURATION")]
    pub receive_timeout: Option<String>,
    /// Replay the capture again after it ends, until interrupted.
    #[arg(long = "loop")]
    pub repeat: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}
