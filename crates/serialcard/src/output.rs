use std::io::{IsTerminal, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serialcard_reader::{Atr, Presence};

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

#[derive(Serialize)]
struct ResponseOutput<'a> {
    device: String,
    command: String,
    response: String,
    length: usize,
    no_response: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_word: Option<String>,
    #[serde(skip)]
    raw: &'a [u8],
}

pub fn print_response(
    device: &Path,
    command: &[u8],
    response: &[u8],
    no_response: bool,
    format: OutputFormat,
) {
    let out = ResponseOutput {
        device: device.display().to_string(),
        command: hex::encode_upper(command),
        response: hex::encode_upper(response),
        length: response.len(),
        no_response,
        status_word: status_word(response),
        raw: response,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "SIZE", "SW", "RESPONSE"])
                .add_row(vec![
                    out.device.clone(),
                    out.length.to_string(),
                    out.status_word.clone().unwrap_or_else(|| "-".to_string()),
                    spaced_hex(out.raw),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if out.no_response {
                println!("device={} no response", out.device);
            } else {
                println!(
                    "device={} size={} response={}",
                    out.device,
                    out.length,
                    spaced_hex(out.raw)
                );
            }
        }
        OutputFormat::Raw => print_raw(out.raw),
    }
}

#[derive(Serialize)]
struct AtrOutput {
    device: String,
    atr: String,
    length: usize,
    historical_bytes: String,
}

pub fn print_atr(device: &Path, atr: &Atr, format: OutputFormat) {
    let out = AtrOutput {
        device: device.display().to_string(),
        atr: hex::encode_upper(atr.as_bytes()),
        length: atr.as_bytes().len(),
        historical_bytes: hex::encode_upper(atr.historical_bytes()),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "ATR", "HISTORICAL"])
                .add_row(vec![
                    out.device.clone(),
                    spaced_hex(atr.as_bytes()),
                    spaced_hex(atr.historical_bytes()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("device={} atr={}", out.device, spaced_hex(atr.as_bytes()));
        }
        OutputFormat::Raw => print_raw(atr.as_bytes()),
    }
}

#[derive(Serialize)]
struct PresenceOutput {
    device: String,
    present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence: Option<u64>,
    timestamp: String,
}

/// Print one presence result; `sequence` is set when polling.
pub fn print_presence(
    device: &Path,
    presence: Presence,
    sequence: Option<u64>,
    format: OutputFormat,
) {
    let out = PresenceOutput {
        device: device.display().to_string(),
        present: presence.is_present(),
        sequence,
        timestamp: now_unix_seconds(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "CARD", "TIME"])
                .add_row(vec![
                    out.device.clone(),
                    presence_text(presence).to_string(),
                    out.timestamp.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match sequence {
            Some(seq) => println!("[{seq}] device={} card={}", out.device, presence_text(presence)),
            None => println!("device={} card={}", out.device, presence_text(presence)),
        },
        OutputFormat::Raw => println!("{}", presence_text(presence)),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn presence_text(presence: Presence) -> &'static str {
    match presence {
        Presence::Present => "present",
        Presence::Absent => "absent",
    }
}

/// SW1 SW2 trailer of a response APDU.
fn status_word(response: &[u8]) -> Option<String> {
    match response {
        [.., sw1, sw2] => Some(format!("{sw1:02X}{sw2:02X}")),
        _ => None,
    }
}

fn spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
