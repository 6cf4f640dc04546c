use recoil_frame::{decode_telemetry, TaggerIdentity, TelemetryFrame};
use recoil_link::hex;
use recoil_session::IrEvent;
use serde::Serialize;

use crate::cmd::DecodeArgs;
use crate::exit::{decode_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct TelemetryOutput {
    #[serde(flatten)]
    frame: TelemetryFrame,
    ir_event_counter: u8,
    ir_sensor_source: u8,
    ir_payload: u16,
    hit: Option<IrEvent>,
}

#[derive(Serialize)]
struct IdentityOutput {
    #[serde(flatten)]
    identity: TaggerIdentity,
    model_name: &'static str,
    known_model: bool,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = hex::decode(&args.hex)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex: {err}")))?;

    if args.identity {
        let identity =
            TaggerIdentity::decode(&bytes).map_err(|err| decode_error("identity", err))?;
        let out = IdentityOutput {
            identity,
            model_name: identity.tagger_type.model_name(),
            known_model: identity.is_known_model(),
        };
        let fields = [
            ("model", out.model_name.to_string()),
            ("model_code", identity.model_code.to_string()),
            ("known", out.known_model.to_string()),
        ];
        print_record(&out, &fields, &bytes, format);
        return Ok(SUCCESS);
    }

    let frame = decode_telemetry(&bytes).map_err(|err| decode_error("telemetry", err))?;
    let out = telemetry_output(frame);
    let mut fields = vec![
        ("player_id", frame.player_id.to_string()),
        ("buttons", format!("0x{:02x}", frame.buttons_raw)),
        ("fire_count", frame.fire_count.to_string()),
        ("reload_count", frame.reload_count.to_string()),
        ("back_count", frame.back_count.to_string()),
        ("power_count", frame.power_count.to_string()),
        ("battery", frame.battery_level.to_string()),
        ("ammo", frame.ammo_count.to_string()),
        ("ir_counter", out.ir_event_counter.to_string()),
        ("ir_sensor", out.ir_sensor_source.to_string()),
        ("ir_payload", format!("0x{:04x}", out.ir_payload)),
    ];
    if let Some(hit) = &out.hit {
        fields.push(("gun_id", hit.gun_id.to_string()));
        fields.push(("grenade", hit.is_grenade.to_string()));
    }
    print_record(&out, &fields, frame.raw(), format);
    Ok(SUCCESS)
}

fn telemetry_output(frame: TelemetryFrame) -> TelemetryOutput {
    let hit = (frame.ir_event_counter() != 0).then(|| IrEvent::from_frame(&frame));
    TelemetryOutput {
        frame,
        ir_event_counter: frame.ir_event_counter(),
        ir_sensor_source: frame.ir_sensor_source(),
        ir_payload: frame.ir_payload(),
        hit,
    }
}
