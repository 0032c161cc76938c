use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use evinject_device::{Operation, ValuatorMask};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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
struct OperationOutput<'a> {
    seq: usize,
    device: &'a str,
    timestamp: String,
    #[serde(flatten)]
    operation: &'a Operation,
}

/// Print one forwarded operation.
pub fn print_operation(seq: usize, device: &str, operation: &Operation, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = OperationOutput {
                seq,
                device,
                timestamp: now_unix_seconds(),
                operation,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "DEVICE", "OP", "DETAILS"])
                .add_row(vec![
                    seq.to_string(),
                    device.to_string(),
                    operation.name().to_string(),
                    details(operation),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "#{seq} device={device} op={} {}",
                operation.name(),
                details(operation)
            );
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendReport<'a> {
    pub path: &'a str,
    pub records: usize,
    pub synced: bool,
}

/// Print the outcome of a `send` run.
pub fn print_send_report(report: &SendReport<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PATH", "RECORDS", "SYNCED"])
                .add_row(vec![
                    report.path.to_string(),
                    report.records.to_string(),
                    report.synced.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "sent {} record(s) to {} synced={}",
            report.records, report.path, report.synced
        ),
    }
}

fn details(operation: &Operation) -> String {
    match operation {
        Operation::Motion { mode, valuators } => {
            format!("mode={mode:?} {}", axes(valuators))
        }
        Operation::Proximity { is_in, valuators } => {
            format!("in={is_in} {}", axes(valuators))
        }
        Operation::Button {
            mode,
            button,
            is_down,
            valuators,
        } => format!(
            "mode={mode:?} button={button} down={is_down} {}",
            axes(valuators)
        ),
        Operation::Key { key_code, is_down } => format!("code={key_code} down={is_down}"),
        Operation::Touch {
            touch_id,
            phase,
            flags,
            valuators,
        } => format!(
            "id={touch_id} phase={phase} flags={flags:#x} {}",
            axes(valuators)
        ),
        Operation::GestureSwipe {
            num_touches,
            delta_x,
            delta_y,
            ..
        } => format!("touches={num_touches} dx={delta_x} dy={delta_y}"),
        Operation::GesturePinch {
            num_touches,
            delta_x,
            delta_y,
            scale,
            delta_angle,
            ..
        } => format!(
            "touches={num_touches} dx={delta_x} dy={delta_y} scale={scale} angle={delta_angle}"
        ),
    }
}

fn axes(valuators: &ValuatorMask) -> String {
    let parts: Vec<String> = valuators
        .iter()
        .map(|v| match v.unaccelerated {
            Some(raw) => format!("{}={}({raw})", v.axis, v.value),
            None => format!("{}={}", v.axis, v.value),
        })
        .collect();
    format!("axes=[{}]", parts.join(","))
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
