use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use frau_port::Reply;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::cmd::{parse_duration, parse_json, runtime, LinkedPorts, RequestArgs, HOST_ORIGIN};
use crate::exit::{port_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_request_report, OutputFormat, RequestReport, ResponseRecord};

pub fn run(args: RequestArgs, format: OutputFormat) -> CliResult<i32> {
    if args.calls == 0 {
        return Err(CliError::new(USAGE, "--calls must be at least 1"));
    }
    let value = parse_json("--value", &args.value)?;
    let delay = args.delay.as_deref().map(parse_duration).transpose()?;
    let timeout = parse_duration(&args.timeout)?;

    let report = runtime()?.block_on(exchange(
        &args.request_type,
        value,
        args.calls,
        delay,
        timeout,
    ))?;
    print_request_report(&report, format);
    Ok(SUCCESS)
}

/// The frame calls `request_type` `calls` times; the host serves it.
async fn exchange(
    request_type: &str,
    value: Value,
    calls: usize,
    delay: Option<Duration>,
    timeout: Duration,
) -> CliResult<RequestReport> {
    let ports = LinkedPorts::new(HOST_ORIGIN)?;
    ports
        .host
        .open()
        .map_err(|err| port_error("open host", err))?;
    ports
        .frame
        .open()
        .map_err(|err| port_error("open frame", err))?;

    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    ports
        .host
        .on_request(request_type, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let value = value.clone();
            match delay {
                Some(delay) => Reply::deferred(async move {
                    tokio::time::sleep(delay).await;
                    value
                }),
                None => Reply::ready(value),
            }
        })
        .map_err(|err| port_error("register server", err))?;

    let pending = (0..calls)
        .map(|_| ports.frame.request(request_type))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| port_error("request failed", err))?;

    let deadline = Instant::now() + timeout;
    let mut responses = Vec::with_capacity(pending.len());
    for response in pending {
        let id = response.id();
        let value = tokio::time::timeout_at(deadline, response)
            .await
            .map_err(|_| {
                CliError::new(
                    TIMEOUT,
                    format!("request {request_type} #{id} timed out after {timeout:?}"),
                )
            })?
            .map_err(|err| port_error("request failed", err))?;
        debug!(%request_type, id, "response received");
        responses.push(ResponseRecord { id, value });
    }

    ports.host.close();
    ports.frame.close();

    Ok(RequestReport {
        request_type: request_type.to_string(),
        calls,
        server_invocations: invocations.load(Ordering::SeqCst),
        responses,
    })
}
