use recoil_frame::{to_hex, Command, CommandEncoder, TaggerType};
use serde::Serialize;

use crate::cmd::{EncodeArgs, EncodeKind};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput {
    #[serde(flatten)]
    command: Command,
    tagger_type: TaggerType,
    characteristic: &'static str,
    frame: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let command = command_from_args(&args);
    let tagger_type = TaggerType::from(args.tagger);
    let bytes = CommandEncoder::new(tagger_type).encode(&command);

    let out = EncodeOutput {
        command,
        tagger_type,
        characteristic: command.target().name(),
        frame: to_hex(&bytes),
    };
    let fields = [
        ("command", command.name().to_string()),
        ("tagger", tagger_type.model_name().to_string()),
        ("characteristic", out.characteristic.to_string()),
        ("frame", out.frame.clone()),
    ];
    print_record(&out, &fields, &bytes, format);
    Ok(SUCCESS)
}

fn command_from_args(args: &EncodeArgs) -> Command {
    match args.kind {
        EncodeKind::StartReload => Command::StartReload,
        EncodeKind::FinishReload => Command::FinishReload { ammo: args.ammo },
        EncodeKind::Recoil => Command::SetRecoil { enabled: !args.off },
        EncodeKind::FireConfig => Command::SetFireConfig {
            mode: args.mode.into(),
            shot: args.shot.into(),
        },
    }
}
