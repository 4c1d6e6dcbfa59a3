use std::time::Duration;

use frau_port::{Client, ClientConfig, Host, HostConfig, TokenStore};
use tokio::time::Instant;

use crate::cmd::{parse_duration, runtime, ConnectArgs, LinkedPorts};
use crate::exit::{port_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_connect_report, ConnectReport, OutputFormat};

pub fn run(args: ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    if args.token.is_empty() {
        return Err(CliError::new(USAGE, "--token must not be empty"));
    }
    let timeout = parse_duration(&args.timeout)?;

    let report = runtime()?.block_on(handshake(&args.origin, &args.token, args.height, timeout))?;
    print_connect_report(&report, format);
    Ok(SUCCESS)
}

/// Connect a client in the frame to a host holding `token`.
async fn handshake(
    origin: &str,
    token: &str,
    height: u64,
    timeout: Duration,
) -> CliResult<ConnectReport> {
    let ports = LinkedPorts::new(origin)?;
    let host = Host::new(ports.host.clone(), HostConfig::new(origin, token));
    host.open().map_err(|err| port_error("open host", err))?;

    let client = Client::new(
        ports.frame.clone(),
        ClientConfig::default()
            .with_height_interval(Duration::from_millis(10))
            .with_connect_timeout(timeout),
        move || height,
    );
    let received = client
        .connect()
        .await
        .map_err(|err| port_error("connect failed", err))?;

    let reported_height = if height == 0 {
        None
    } else {
        let deadline = Instant::now() + timeout;
        while host.height() != Some(height) {
            if Instant::now() >= deadline {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("host did not receive height within {timeout:?}"),
                ));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        host.height()
    };

    let stored = client.tokens().get(&received.origin).unwrap_or_default();
    client.close();
    host.close();

    Ok(ConnectReport {
        storage_key: TokenStore::storage_key(&received.origin),
        origin: received.origin,
        token: stored,
        reported_height,
    })
}
