use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::cmd::{parse_duration, parse_json, runtime, EventArgs, LinkedPorts, HOST_ORIGIN};
use crate::exit::{port_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_deliveries, DeliveryRecord, OutputFormat};

pub fn run(args: EventArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = parse_json("--payload", &args.payload)?;
    let timeout = parse_duration(&args.timeout)?;

    let deliveries =
        runtime()?.block_on(emit(&args.event_type, payload, args.listeners, timeout))?;
    print_deliveries(&deliveries, format);
    Ok(SUCCESS)
}

/// The frame emits `event_type`; `listeners` handlers on the host record it.
async fn emit(
    event_type: &str,
    payload: Value,
    listeners: usize,
    timeout: Duration,
) -> CliResult<Vec<DeliveryRecord>> {
    let ports = LinkedPorts::new(HOST_ORIGIN)?;
    let (delivered, mut deliveries) = mpsc::unbounded_channel();
    for listener in 1..=listeners {
        let delivered = delivered.clone();
        let event_type_owned = event_type.to_string();
        ports.host.on(event_type, move |data| {
            let _ = delivered.send(DeliveryRecord {
                event_type: event_type_owned.clone(),
                listener,
                payload: data.clone(),
            });
        });
    }
    drop(delivered);

    ports
        .host
        .open()
        .map_err(|err| port_error("open host", err))?;
    ports
        .frame
        .send_event(event_type, &payload)
        .map_err(|err| port_error("send failed", err))?;

    let deadline = Instant::now() + timeout;
    let mut received = Vec::with_capacity(listeners);
    while received.len() < listeners {
        match tokio::time::timeout_at(deadline, deliveries.recv()).await {
            Ok(Some(delivery)) => received.push(delivery),
            Ok(None) => break,
            Err(_) => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!(
                        "{} of {listeners} listeners ran before {timeout:?}",
                        received.len()
                    ),
                ));
            }
        }
    }

    ports.host.close();
    Ok(received)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn listeners_run_in_registration_order() {
        let deliveries = runtime()
            .unwrap()
            .block_on(emit("ping", json!({ "n": 1 }), 3, Duration::from_secs(2)))
            .unwrap();

        let order: Vec<usize> = deliveries.iter().map(|d| d.listener).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(deliveries.iter().all(|d| d.payload == json!({ "n": 1 })));
    }

    #[test]
    fn no_listeners_is_not_an_error() {
        let deliveries = runtime()
            .unwrap()
            .block_on(emit("ping", Value::Null, 0, Duration::from_millis(50)))
            .unwrap();
        assert!(deliveries.is_empty());
    }
}
