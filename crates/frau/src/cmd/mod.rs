use std::time::Duration;

use clap::{Args, Subcommand};
use frau_port::{Port, PortConfig};
use frau_transport::MessageContext;
use serde_json::Value;

use crate::exit::{port_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod connect;
pub mod event;
pub mod request;
pub mod version;

/// Origin of the in-process embedding context.
pub const HOST_ORIGIN: &str = "https://host.frau.local";
/// Origin of the in-process embedded context.
pub const FRAME_ORIGIN: &str = "https://frame.frau.local";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a request in one context and call it from the other.
    Request(RequestArgs),
    /// Emit an event from one context to listeners in the other.
    Event(EventArgs),
    /// Run the host/client handshake and print the stored token.
    Connect(ConnectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Request(args) => request::run(args, format),
        Command::Event(args) => event::run(args, format),
        Command::Connect(args) => connect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Request subtype to serve and call.
    #[arg(value_name = "TYPE")]
    pub request_type: String,
    /// JSON value the server answers with.
    #[arg(long)]
    pub value: String,
    /// Number of concurrent calls.
    #[arg(long, default_value = "1")]
    pub calls: usize,
    /// Delay before the server's value is ready (e.g. 50ms, 1s).
    #[arg(long)]
    pub delay: Option<String>,
    /// Maximum time to wait for all responses.
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct EventArgs {
    /// Event subtype to emit.
    #[arg(value_name = "TYPE")]
    pub event_type: String,
    /// JSON payload.
    #[arg(long, default_value = "null")]
    pub payload: String,
    /// Number of listeners registered on the receiving side.
    #[arg(long, default_value = "1")]
    pub listeners: usize,
    /// Maximum time to wait for every listener to run.
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// CSRF token the host hands out.
    #[arg(long, env = "FRAU_TOKEN")]
    pub token: String,
    /// Origin the host claims for its token.
    #[arg(long, default_value = HOST_ORIGIN)]
    pub origin: String,
    /// Content height the client reports.
    #[arg(long, default_value = "480")]
    pub height: u64,
    /// Maximum time to wait for the handshake.
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// A host port and a frame port connected through two in-process contexts.
pub struct LinkedPorts {
    pub host: Port,
    pub frame: Port,
    // Contexts must outlive the links that hold them weakly.
    _contexts: (MessageContext, MessageContext),
}

impl LinkedPorts {
    pub fn new(host_origin: &str) -> CliResult<Self> {
        let host_context = MessageContext::new(host_origin);
        let frame_context = MessageContext::new(FRAME_ORIGIN);
        let host_config =
            PortConfig::for_origin(FRAME_ORIGIN).map_err(|err| port_error("host config", err))?;
        let host = Port::new(host_context.link(&frame_context), host_config);
        let frame = Port::new(frame_context.link(&host_context), PortConfig::default());
        Ok(Self {
            host,
            frame,
            _contexts: (host_context, frame_context),
        })
    }
}

pub fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start runtime: {err}")))
}

pub fn parse_json(flag: &str, input: &str) -> CliResult<Value> {
    serde_json::from_str(input)
        .map_err(|err| CliError::new(USAGE, format!("{flag} is not valid JSON: {err}")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration(" 2 ").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_bad_durations() {
        for input in ["", "0s", "fast", "-1ms"] {
            let err = parse_duration(input).unwrap_err();
            assert_eq!(err.code, USAGE, "input {input:?}");
        }
    }

    #[test]
    fn rejects_invalid_json() {
        let err = parse_json("--value", "{nope").unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("--value is not valid JSON"));
        assert_eq!(parse_json("--value", "42").unwrap(), Value::from(42));
    }
}
