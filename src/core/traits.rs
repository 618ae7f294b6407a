//! Upper-layer interface.
//!
//! The layer above LAPB (typically the X.25 packet layer) implements
//! [`UpperLayer`] to learn about link establishment and release and to receive
//! in-sequence data.

use bytes::Bytes;

/// Outcome of handing a received I-frame payload to the upper layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Payload taken; the frame will be acknowledged.
    Accepted,
    /// Receiver cannot take the payload now; the frame is left
    /// unacknowledged so the peer retransmits it.
    Congested,
}

/// Why a link went down (or never came up).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Orderly release.
    Ok,
    /// Peer answered with DM: it was not connected.
    NotConnected,
    /// Peer refused our SABM/SABME.
    Refused,
    /// N2 retries of T1 exhausted.
    TimedOut,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DisconnectReason::Ok => "ok",
            DisconnectReason::NotConnected => "not connected",
            DisconnectReason::Refused => "refused",
            DisconnectReason::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// Callbacks from a link to the layer above it.
///
/// Connection callbacks are made after the link has entered its new state.
/// `data_indication` is made before V(R) advances: the payload only counts
/// as received once it returns [`Delivery::Accepted`].
///
/// Callbacks cannot reach back into the link that is calling them. Requests
/// raised from a callback have to be queued and issued afterwards.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use lapb_link::core::{Delivery, DisconnectReason, UpperLayer};
///
/// #[derive(Default)]
/// struct Collector {
///     up: bool,
///     received: Vec<Bytes>,
/// }
///
/// impl UpperLayer for Collector {
///     fn connect_indication(&mut self) {
///         self.up = true;
///     }
///
///     fn connect_confirmation(&mut self) {
///         self.up = true;
///     }
///
///     fn disconnect_indication(&mut self, _reason: DisconnectReason) {
///         self.up = false;
///     }
///
///     fn disconnect_confirmation(&mut self, _reason: DisconnectReason) {
///         self.up = false;
///     }
///
///     fn data_indication(&mut self, payload: Bytes) -> Delivery {
///         self.received.push(payload);
///         Delivery::Accepted
///     }
/// }
/// ```
pub trait UpperLayer {
    /// Peer established the link (we received SABM/SABME).
    fn connect_indication(&mut self);

    /// Our connect request was answered with UA.
    fn connect_confirmation(&mut self);

    /// Link released by the peer, refused, or timed out.
    fn disconnect_indication(&mut self, reason: DisconnectReason);

    /// Our disconnect request completed.
    fn disconnect_confirmation(&mut self, reason: DisconnectReason);

    /// In-sequence I-frame payload.
    fn data_indication(&mut self, payload: Bytes) -> Delivery;
}
