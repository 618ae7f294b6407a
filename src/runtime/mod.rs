//! Tokio driver: one task per link.
//!
//! The task owns a [`Link`] and serialises everything that touches it
//! (received frames, local requests, timer deadlines) through a single
//! `select!` loop. Encoded frames go out on the `outbound` channel given to
//! [`spawn_link`]; indications come back as [`LinkEvent`]s.

use std::collections::VecDeque;

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace, warn};

use crate::core::{Delivery, DisconnectReason, LinkError, LinkResult, UpperLayer};
use crate::link::{Link, LinkParams};

/// Capacity of the request channel of a link task.
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the event channel of a link task. When it is full, received
/// I-frames are left unacknowledged until the application catches up.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something the application needs to know about a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Peer brought the link up.
    Connected,
    /// Our connect request completed.
    ConnectConfirmed,
    /// Link went down.
    Disconnected(DisconnectReason),
    /// Our disconnect request completed.
    DisconnectConfirmed(DisconnectReason),
    /// In-sequence payload from the peer.
    Data(Bytes),
}

enum Command {
    Connect(oneshot::Sender<LinkResult<()>>),
    Disconnect(oneshot::Sender<LinkResult<()>>),
    Send(Bytes, oneshot::Sender<LinkResult<()>>),
    Frame(Bytes),
    Shutdown,
}

/// Handle to a running link task.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    tx: mpsc::Sender<Command>,
}

impl LinkHandle {
    /// Start link establishment. Completion is reported as
    /// [`LinkEvent::ConnectConfirmed`].
    pub async fn connect(&self) -> LinkResult<()> {
        self.request(Command::Connect).await
    }

    /// Start link release. Completion is reported as
    /// [`LinkEvent::DisconnectConfirmed`].
    pub async fn disconnect(&self) -> LinkResult<()> {
        self.request(Command::Disconnect).await
    }

    /// Queue a payload for transmission.
    pub async fn send(&self, payload: Bytes) -> LinkResult<()> {
        self.request(|reply| Command::Send(payload, reply)).await
    }

    /// Hand a frame received from the transport to the link.
    pub async fn frame_received(&self, raw: Bytes) -> LinkResult<()> {
        self.tx
            .send(Command::Frame(raw))
            .await
            .map_err(|_| LinkError::Shutdown)
    }

    /// Stop the link task. Pending timers and queued data are dropped.
    pub async fn shutdown(&self) -> LinkResult<()> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| LinkError::Shutdown)
    }

    /// Check if the link task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<F>(&self, make: F) -> LinkResult<()>
    where
        F: FnOnce(oneshot::Sender<LinkResult<()>>) -> Command,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| LinkError::Shutdown)?;
        reply_rx.await.map_err(|_| LinkError::Shutdown)?
    }
}

/// Start a task driving one link.
///
/// Must be called from within a tokio runtime.
pub fn spawn_link(
    params: LinkParams,
    outbound: mpsc::Sender<Bytes>,
) -> LinkResult<(LinkHandle, mpsc::Receiver<LinkEvent>)> {
    let link = Link::new(params)?;
    let (tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    let driver = Driver {
        link,
        commands,
        outbound,
        upper: ChannelUpper {
            events: event_tx,
            backlog: VecDeque::new(),
        },
    };
    tokio::spawn(driver.run());

    Ok((LinkHandle { tx }, event_rx))
}

/// Upper layer that forwards to the event channel.
///
/// Data uses `try_send` so a full channel reads as congestion. Connection
/// events that do not fit wait in `backlog` until the task gets a permit,
/// without holding up requests. Data is refused while the backlog is
/// non-empty to keep events ordered.
struct ChannelUpper {
    events: mpsc::Sender<LinkEvent>,
    backlog: VecDeque<LinkEvent>,
}

impl ChannelUpper {
    fn emit(&mut self, event: LinkEvent) {
        if !self.backlog.is_empty() {
            self.backlog.push_back(event);
            return;
        }
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => self.backlog.push_back(event),
            Err(TrySendError::Closed(_)) => trace!("event receiver dropped"),
        }
    }
}

impl UpperLayer for ChannelUpper {
    fn connect_indication(&mut self) {
        self.emit(LinkEvent::Connected);
    }

    fn connect_confirmation(&mut self) {
        self.emit(LinkEvent::ConnectConfirmed);
    }

    fn disconnect_indication(&mut self, reason: DisconnectReason) {
        self.emit(LinkEvent::Disconnected(reason));
    }

    fn disconnect_confirmation(&mut self, reason: DisconnectReason) {
        self.emit(LinkEvent::DisconnectConfirmed(reason));
    }

    fn data_indication(&mut self, payload: Bytes) -> Delivery {
        if !self.backlog.is_empty() {
            return Delivery::Congested;
        }
        match self.events.try_send(LinkEvent::Data(payload)) {
            Ok(()) => Delivery::Accepted,
            Err(TrySendError::Full(_)) => Delivery::Congested,
            Err(TrySendError::Closed(_)) => {
                trace!("event receiver dropped, discarding payload");
                Delivery::Accepted
            }
        }
    }
}

struct Driver {
    link: Link,
    commands: mpsc::Receiver<Command>,
    outbound: mpsc::Sender<Bytes>,
    upper: ChannelUpper,
}

impl Driver {
    async fn run(mut self) {
        debug!(mode = ?self.link.params().mode, "link task started");
        loop {
            if self.flush().await.is_err() {
                warn!("outbound channel closed, stopping link task");
                break;
            }

            let deadline = self.link.poll_timeout().map(Instant::from_std);
            let timer = async {
                match deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            let events = self.upper.events.clone();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                () = timer => {
                    let now = Instant::now().into_std();
                    self.link.handle_timeout(now, &mut self.upper);
                }
                permit = events.reserve(), if !self.upper.backlog.is_empty() => {
                    match permit {
                        Ok(permit) => {
                            if let Some(event) = self.upper.backlog.pop_front() {
                                permit.send(event);
                            }
                        }
                        Err(_) => {
                            trace!("event receiver dropped");
                            self.upper.backlog.clear();
                        }
                    }
                }
            }
        }
        debug!(state = ?self.link.state(), "link task stopped");
    }

    fn handle(&mut self, command: Command) {
        let now = Instant::now().into_std();
        match command {
            Command::Connect(reply) => {
                let _ = reply.send(self.link.connect_request(now));
            }
            Command::Disconnect(reply) => {
                let _ = reply.send(self.link.disconnect_request(now));
            }
            Command::Send(payload, reply) => {
                let _ = reply.send(self.link.data_request(now, payload));
            }
            Command::Frame(raw) => self.link.data_input(now, raw, &mut self.upper),
            Command::Shutdown => {}
        }
    }

    async fn flush(&mut self) -> LinkResult<()> {
        while let Some(frame) = self.link.poll_transmit() {
            self.outbound
                .send(frame)
                .await
                .map_err(|_| LinkError::Shutdown)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::frame::Role;
    use crate::link::LinkParamsBuilder;

    /// Forward every frame from one link's outbound channel to another link.
    fn wire(mut from: mpsc::Receiver<Bytes>, to: LinkHandle) {
        tokio::spawn(async move {
            while let Some(frame) = from.recv().await {
                if to.frame_received(frame).await.is_err() {
                    break;
                }
            }
        });
    }

    fn pair() -> (
        (LinkHandle, mpsc::Receiver<LinkEvent>),
        (LinkHandle, mpsc::Receiver<LinkEvent>),
    ) {
        let (dte_out, dte_wire) = mpsc::channel(16);
        let (dce_out, dce_wire) = mpsc::channel(16);
        let dte = spawn_link(LinkParams::default(), dte_out).unwrap();
        let dce_params = LinkParamsBuilder::new().role(Role::Dce).build().unwrap();
        let dce = spawn_link(dce_params, dce_out).unwrap();
        wire(dte_wire, dce.0.clone());
        wire(dce_wire, dte.0.clone());
        (dte, dce)
    }

    #[tokio::test]
    async fn test_connect_send_disconnect() {
        let ((dte, mut dte_events), (dce, mut dce_events)) = pair();

        dte.connect().await.unwrap();
        assert_eq!(dte_events.recv().await, Some(LinkEvent::ConnectConfirmed));
        assert_eq!(dce_events.recv().await, Some(LinkEvent::Connected));

        dte.send(Bytes::from_static(b"ping")).await.unwrap();
        assert_eq!(
            dce_events.recv().await,
            Some(LinkEvent::Data(Bytes::from_static(b"ping")))
        );
        dce.send(Bytes::from_static(b"pong")).await.unwrap();
        assert_eq!(
            dte_events.recv().await,
            Some(LinkEvent::Data(Bytes::from_static(b"pong")))
        );

        dte.disconnect().await.unwrap();
        assert_eq!(
            dte_events.recv().await,
            Some(LinkEvent::DisconnectConfirmed(DisconnectReason::Ok))
        );
        assert_eq!(
            dce_events.recv().await,
            Some(LinkEvent::Disconnected(DisconnectReason::Ok))
        );
    }

    #[tokio::test]
    async fn test_request_errors() {
        let ((dte, _dte_events), _dce) = pair();
        assert_eq!(
            dte.send(Bytes::from_static(b"early")).await,
            Err(LinkError::NotConnected)
        );
        assert_eq!(dte.disconnect().await, Err(LinkError::NotConnected));
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let (out, _wire) = mpsc::channel(1);
        let params = LinkParams {
            t2: Duration::from_secs(10),
            ..LinkParams::default()
        };
        assert!(matches!(
            spawn_link(params, out),
            Err(LinkError::Config(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_times_out_without_peer() {
        let (out, mut wire) = mpsc::channel(64);
        let params = LinkParamsBuilder::new().n2(2).build().unwrap();
        let (link, mut events) = spawn_link(params, out).unwrap();

        link.connect().await.unwrap();
        assert_eq!(
            events.recv().await,
            Some(LinkEvent::Disconnected(DisconnectReason::TimedOut))
        );

        let mut sabms = 0;
        while let Ok(frame) = wire.try_recv() {
            assert_eq!(&frame[..], &[0x01, 0x3F]);
            sabms += 1;
        }
        assert_eq!(sabms, 3);
    }

    #[tokio::test]
    async fn test_requests_served_while_events_back_up() {
        let (out, _wire) = mpsc::channel(1024);
        let params = LinkParamsBuilder::new().role(Role::Dce).build().unwrap();
        let (link, mut events) = spawn_link(params, out).unwrap();

        // SABM, P=1, from the DTE
        link.frame_received(Bytes::from_static(&[0x01, 0x3F]))
            .await
            .unwrap();
        for n in 0..300u16 {
            let ns = (n % 8) as u8;
            link.frame_received(Bytes::from(vec![0x01, ns << 1, n as u8]))
                .await
                .unwrap();
        }
        // DISC, P=1: its indication has to wait behind a full channel
        link.frame_received(Bytes::from_static(&[0x01, 0x53]))
            .await
            .unwrap();

        let reply = tokio::time::timeout(
            Duration::from_secs(5),
            link.send(Bytes::from_static(b"late")),
        )
        .await
        .expect("link task stopped serving requests");
        assert_eq!(reply, Err(LinkError::NotConnected));

        assert_eq!(events.recv().await, Some(LinkEvent::Connected));
        let mut data = 0;
        loop {
            match events.recv().await {
                Some(LinkEvent::Data(_)) => data += 1,
                Some(LinkEvent::Disconnected(reason)) => {
                    assert_eq!(reason, DisconnectReason::Ok);
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(data, EVENT_CHANNEL_CAPACITY - 1);
    }

    #[tokio::test]
    async fn test_shutdown() {
        let (out, _wire) = mpsc::channel(1);
        let (link, mut events) = spawn_link(LinkParams::default(), out).unwrap();

        link.shutdown().await.unwrap();
        assert_eq!(events.recv().await, None);
        assert!(link.is_closed());
        assert_eq!(link.connect().await, Err(LinkError::Shutdown));
    }
}
