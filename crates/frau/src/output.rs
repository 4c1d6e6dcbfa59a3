use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

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

#[derive(Debug, Serialize)]
pub struct ResponseRecord {
    pub id: u64,
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct RequestReport {
    pub request_type: String,
    pub calls: usize,
    pub server_invocations: usize,
    pub responses: Vec<ResponseRecord>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryRecord {
    pub event_type: String,
    pub listener: usize,
    pub payload: Value,
}

#[derive(Debug, Serialize)]
pub struct ConnectReport {
    pub origin: String,
    pub storage_key: String,
    pub token: String,
    pub reported_height: Option<u64>,
}

pub fn print_request_report(report: &RequestReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["TYPE", "ID", "VALUE"]);
            for response in &report.responses {
                table.add_row(vec![
                    report.request_type.clone(),
                    response.id.to_string(),
                    response.value.to_string(),
                ]);
            }
            println!("{table}");
            println!("server invocations: {}", report.server_invocations);
        }
        OutputFormat::Pretty => {
            for response in &report.responses {
                println!(
                    "{} #{} -> {}",
                    report.request_type, response.id, response.value
                );
            }
            println!(
                "calls={} server_invocations={}",
                report.calls, report.server_invocations
            );
        }
    }
}

pub fn print_deliveries(deliveries: &[DeliveryRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for delivery in deliveries {
                print_json(delivery);
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["EVENT", "LISTENER", "PAYLOAD"]);
            for delivery in deliveries {
                table.add_row(vec![
                    delivery.event_type.clone(),
                    delivery.listener.to_string(),
                    delivery.payload.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for delivery in deliveries {
                println!(
                    "{} -> listener {}: {}",
                    delivery.event_type, delivery.listener, delivery.payload
                );
            }
        }
    }
}

pub fn print_connect_report(report: &ConnectReport, format: OutputFormat) {
    let height = report
        .reported_height
        .map_or_else(|| "-".to_string(), |height| height.to_string());
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ORIGIN", "STORAGE KEY", "TOKEN", "HEIGHT"]);
            table.add_row(vec![
                report.origin.clone(),
                report.storage_key.clone(),
                report.token.clone(),
                height,
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "connected origin={} {}={} height={}",
                report.origin, report.storage_key, report.token, height
            );
        }
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
