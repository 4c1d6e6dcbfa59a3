//! Two in-process contexts: the host serves `time`, the frame calls it
//! before the server exists and still gets an answer.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use frau::port::{Port, PortConfig};
use frau::transport::MessageContext;
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let host_context = MessageContext::new("https://lms.example");
    let frame_context = MessageContext::new("https://tool.example");

    let host = Port::new(
        host_context.link(&frame_context),
        PortConfig::for_origin("https://tool.example")?,
    );
    let frame = Port::new(frame_context.link(&host_context), PortConfig::default());
    host.open()?;
    frame.open()?;

    host.on("navigate", |url| println!("host: navigate to {url}"));

    let pending = frame.request("time")?;
    frame.send_event("navigate", "/d2l/home")?;
    tokio::time::sleep(Duration::from_millis(20)).await;
    println!("host: {} request(s) waiting", host.waiting_requests("time"));

    host.on_request("time", || {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        json!(now)
    })?;

    println!("frame: time is {}", pending.await?);
    Ok(())
}
