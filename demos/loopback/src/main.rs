//! LAPB loopback demo
//!
//! Brings up a DTE and a DCE link over in-process channels, sends a batch of
//! I-frames from the DTE, and releases the link again.
//!
//! Environment variables:
//! - LAPB_MESSAGES: number of payloads to send (default 32)
//! - LAPB_DROP_EVERY: drop every Nth frame on the wire to force recovery
//!   through REJ and T1 (default 0, no loss)
//! - LAPB_EXTENDED: "1" for modulo 128 numbering
//! - RUST_LOG: tracing filter, e.g. `lapb_link=debug`

use std::env;
use std::error::Error;
use std::time::Duration;

use bytes::Bytes;
use lapb_link::prelude::*;
use tokio::sync::mpsc;
use tracing::{info, warn};

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Forward frames from one link to the other, optionally losing some.
fn wire(name: &'static str, mut from: mpsc::Receiver<Bytes>, to: LinkHandle, drop_every: usize) {
    tokio::spawn(async move {
        let mut count = 0usize;
        while let Some(frame) = from.recv().await {
            count += 1;
            if drop_every > 0 && count % drop_every == 0 {
                warn!(wire = name, len = frame.len(), "dropping frame");
                continue;
            }
            if to.frame_received(frame).await.is_err() {
                break;
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let messages: usize = env_or("LAPB_MESSAGES", 32);
    let drop_every: usize = env_or("LAPB_DROP_EVERY", 0);
    let extended = env::var("LAPB_EXTENDED").is_ok_and(|v| v == "1");

    let mut builder = LinkParamsBuilder::new()
        .t1(Duration::from_millis(500))
        .t2(Duration::from_millis(100));
    if extended {
        builder = builder.extended().window(32);
    }
    let dte_params = builder.build()?;
    let dce_params = LinkParams {
        mode: dte_params.mode.with_role(Role::Dce),
        ..dte_params
    };

    let (dte_out, dte_wire) = mpsc::channel(64);
    let (dce_out, dce_wire) = mpsc::channel(64);
    let (dte, mut dte_events) = spawn_link(dte_params, dte_out)?;
    let (dce, mut dce_events) = spawn_link(dce_params, dce_out)?;
    wire("dte->dce", dte_wire, dce.clone(), drop_every);
    wire("dce->dte", dce_wire, dte.clone(), drop_every);

    dte.connect().await?;
    while let Some(event) = dte_events.recv().await {
        match event {
            LinkEvent::ConnectConfirmed => break,
            LinkEvent::Disconnected(reason) => return Err(format!("connect failed: {reason}").into()),
            other => info!(?other, "dte event"),
        }
    }
    info!(extended, "link up");

    for n in 0..messages {
        dte.send(Bytes::from(format!("message {n}"))).await?;
    }

    let mut received = 0;
    while received < messages {
        match dce_events.recv().await {
            Some(LinkEvent::Data(payload)) => {
                info!(payload = %String::from_utf8_lossy(&payload), "dce received");
                received += 1;
            }
            Some(LinkEvent::Disconnected(reason)) => {
                return Err(format!("link lost: {reason}").into());
            }
            Some(other) => info!(?other, "dce event"),
            None => return Err("dce task stopped".into()),
        }
    }

    dte.disconnect().await?;
    while let Some(event) = dte_events.recv().await {
        if let LinkEvent::DisconnectConfirmed(reason) = event {
            info!(%reason, "link released");
            break;
        }
    }

    println!("delivered {received}/{messages} payloads");
    dte.shutdown().await?;
    dce.shutdown().await?;
    Ok(())
}
