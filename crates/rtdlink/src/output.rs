use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rtdlink_board::{FieldValue, PatchReport};
use rtdlink_template::Template;
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
struct FieldOutput<'a> {
    peer: &'a str,
    name: &'a str,
    offset: usize,
    value: &'a str,
    checksum_valid: bool,
    timestamp: String,
}

/// Print the fields touched by one patch. A field cleared to spaces is
/// printed too unless `hide_blank` is set.
pub fn print_patch(report: &PatchReport, peer: &str, format: OutputFormat, hide_blank: bool) {
    let fields = visible_fields(report, hide_blank);
    if fields.is_empty() {
        return;
    }

    match format {
        OutputFormat::Json => {
            let timestamp = now_unix_seconds();
            for field in fields {
                let out = FieldOutput {
                    peer,
                    name: &field.name,
                    offset: field.offset,
                    value: &field.value,
                    checksum_valid: report.checksum.is_valid(),
                    timestamp: timestamp.clone(),
                };
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "OFFSET", "VALUE", "PEER"]);
            for field in fields {
                table.add_row(vec![
                    field.name.clone(),
                    field.offset.to_string(),
                    field.value.clone(),
                    peer.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for field in fields {
                println!("{}", pretty_field(field));
            }
        }
    }
}

fn visible_fields(report: &PatchReport, hide_blank: bool) -> Vec<&FieldValue> {
    report
        .fields
        .iter()
        .filter(|f| !(hide_blank && f.is_blank()))
        .collect()
}

#[derive(Serialize)]
struct TemplateOutput<'a> {
    fields: &'a [rtdlink_template::FieldDef],
    total_size: usize,
}

/// Print a template's field layout.
pub fn print_template(template: &Template, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = TemplateOutput {
                fields: template.fields(),
                total_size: template.total_size(),
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
                .set_header(vec!["#", "FIELD", "OFFSET", "WIDTH"]);
            for (index, field) in template.fields().iter().enumerate() {
                table.add_row(vec![
                    (index + 1).to_string(),
                    field.name.clone(),
                    field.offset.to_string(),
                    field.width.to_string(),
                ]);
            }
            println!("{table}");
            println!("total size: {} bytes", template.total_size());
        }
        OutputFormat::Pretty => {
            for field in template.fields() {
                println!("{}[{}] width={}", field.name, field.offset, field.width);
            }
            println!("total_size={}", template.total_size());
        }
    }
}

#[derive(Serialize)]
struct AckOutput<'a> {
    address: &'a str,
    offset: usize,
    text: &'a str,
    acknowledged: bool,
}

/// Print the result of a `send`.
pub fn print_send(address: &str, offset: usize, text: &str, acked: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = AckOutput {
                address,
                offset,
                text,
                acknowledged: acked,
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
                .set_header(vec!["ADDRESS", "OFFSET", "TEXT", "ACK"])
                .add_row(vec![
                    address.to_string(),
                    offset.to_string(),
                    text.to_string(),
                    acked.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("sent offset={offset} text='{text}' to {address} ack={acked}");
        }
    }
}

fn pretty_field(field: &FieldValue) -> String {
    format!("{}[{}]='{}'", field.name, field.offset, field.value)
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
