use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use recoil_session::SessionEvent;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print one field/value record in the requested format.
///
/// `raw` is written verbatim for [`OutputFormat::Raw`].
pub fn print_record<T: Serialize>(
    value: &T,
    fields: &[(&str, String)],
    raw: &[u8],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in fields {
                table.add_row(vec![name.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", pretty_line(fields)),
        OutputFormat::Raw => print_raw(raw),
    }
}

/// Print one session event as it arrives.
pub fn print_event(event: &SessionEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(event),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "DETAIL"])
                .add_row(vec![event.name().to_string(), event_detail(event)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let detail = event_detail(event);
            if detail.is_empty() {
                println!("{}", event.name());
            } else {
                println!("{} {}", event.name(), detail);
            }
        }
        // Raw mode is for a display consumer: only the human-facing text.
        OutputFormat::Raw => {
            if let SessionEvent::Message { text } = event {
                print_raw(format!("{text}\n").as_bytes());
            }
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn pretty_line(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn event_detail(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Connected { identity } => pretty_line(&[
            ("model", identity.tagger_type.model_name().to_string()),
            ("code", identity.model_code.to_string()),
        ]),
        SessionEvent::Disconnected { reason } => pretty_line(&[("reason", reason.clone())]),
        SessionEvent::Message { text } => text.clone(),
        SessionEvent::AmmoChanged { count } => pretty_line(&[("count", count.to_string())]),
        SessionEvent::IrEvent(hit) => pretty_line(&[
            ("gun_id", hit.gun_id.to_string()),
            ("sensor", hit.sensor_source.to_string()),
            ("shot", hit.shot_counter.to_string()),
            ("round", hit.round_counter.to_string()),
            ("grenade", hit.is_grenade.to_string()),
        ]),
        SessionEvent::FirePressed { ammo_empty } => {
            pretty_line(&[("ammo_empty", ammo_empty.to_string())])
        }
        SessionEvent::ReloadStarted => String::new(),
        SessionEvent::ReloadFinished { ammo } => pretty_line(&[("ammo", ammo.to_string())]),
        SessionEvent::RecoilToggled { enabled } => {
            pretty_line(&[("enabled", enabled.to_string())])
        }
        SessionEvent::FireModeChanged { mode, shot_mode } => pretty_line(&[
            ("mode", mode.to_string()),
            ("shot_mode", shot_mode.to_string()),
        ]),
    }
}
