//! Per-link protocol state.

use bytes::Bytes;

use super::queue::TransmitQueue;
use crate::core::DisconnectReason;
use crate::frame::{Direction, Frame, FrameKind, FrmrRecord, Mode, Violation};

/// Link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkState {
    /// State 0: no link.
    #[default]
    Disconnected,
    /// State 1: SABM/SABME sent, waiting for UA.
    AwaitingConnection,
    /// State 2: DISC sent, waiting for UA or DM.
    AwaitingRelease,
    /// State 3: information transfer.
    DataTransfer,
    /// State 4: FRMR sent, waiting for the peer to reset the link.
    FrameReject,
}

impl LinkState {
    /// State number as used in the LAPB procedures.
    pub fn number(self) -> u8 {
        match self {
            LinkState::Disconnected => 0,
            LinkState::AwaitingConnection => 1,
            LinkState::AwaitingRelease => 2,
            LinkState::DataTransfer => 3,
            LinkState::FrameReject => 4,
        }
    }

    /// Check if the link is up (data may be queued).
    pub fn is_connected(self) -> bool {
        matches!(self, LinkState::DataTransfer | LinkState::FrameReject)
    }
}

/// Link condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Condition(u8);

impl Condition {
    /// No conditions.
    pub const NONE: Self = Self(0);
    /// Peer sent RNR.
    pub const PEER_BUSY: Self = Self(0x01);
    /// We sent REJ and have not yet received the expected N(S).
    pub const REJECT: Self = Self(0x02);
    /// An I-frame was received and not yet acknowledged.
    pub const ACK_PENDING: Self = Self(0x04);

    /// Check if all flags in `other` are set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the flags in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear the flags in `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Clear every flag.
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Check if no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Upper-layer notification requested by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Peer established the link.
    ConnectIndication,
    /// Our SABM/SABME was acknowledged.
    ConnectConfirmation,
    /// Link went down.
    DisconnectIndication(DisconnectReason),
    /// Our DISC completed.
    DisconnectConfirmation(DisconnectReason),
}

/// Side effect requested by the state machine.
///
/// The context never performs I/O itself; the caller encodes frames, runs
/// timers and talks to the upper layer according to these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send an unnumbered or supervisory frame. `nr` is used by S frames.
    Send {
        /// Frame type.
        kind: FrameKind,
        /// Poll/final bit.
        pf: bool,
        /// Command or response.
        cr: Direction,
        /// N(R) for supervisory frames.
        nr: u8,
    },
    /// Send an I-frame command.
    SendI {
        /// N(S).
        ns: u8,
        /// N(R).
        nr: u8,
        /// Payload.
        payload: Bytes,
    },
    /// Send FRMR describing a rejected frame.
    SendFrmr {
        /// Rejected frame.
        record: FrmrRecord,
        /// V(S) at the time of rejection.
        vs: u8,
        /// V(R) at the time of rejection.
        vr: u8,
    },
    /// (Re)start T1.
    StartT1,
    /// Start T1 unless it is already running.
    EnsureT1,
    /// Stop T1.
    StopT1,
    /// (Re)start T2.
    StartT2,
    /// Stop T2.
    StopT2,
    /// Hand an in-sequence payload to the upper layer. When accepted, the
    /// caller completes the frame with [`LinkContext::accept_iframe`].
    Deliver {
        /// Payload.
        payload: Bytes,
        /// Poll bit of the I-frame.
        pf: bool,
    },
    /// Notify the upper layer.
    Notify(Notification),
}

/// State of one data link.
///
/// All fields are mutated only through the transition engine, the timer
/// expiry handlers and the local request methods.
#[derive(Debug, Clone)]
pub struct LinkContext {
    pub(crate) state: LinkState,
    pub(crate) mode: Mode,
    pub(crate) window: u8,
    pub(crate) vs: u8,
    pub(crate) vr: u8,
    pub(crate) va: u8,
    pub(crate) condition: Condition,
    pub(crate) n2count: u32,
    pub(crate) n2: u32,
    pub(crate) frmr: Option<FrmrRecord>,
    pub(crate) queue: TransmitQueue,
}

impl LinkContext {
    /// Create a disconnected link context.
    pub fn new(mode: Mode, window: u8, n2: u32) -> Self {
        Self {
            state: LinkState::Disconnected,
            mode,
            window,
            vs: 0,
            vr: 0,
            va: 0,
            condition: Condition::NONE,
            n2count: 0,
            n2,
            frmr: None,
            queue: TransmitQueue::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Operating mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Window size.
    pub fn window(&self) -> u8 {
        self.window
    }

    /// V(S): next N(S) to send.
    pub fn vs(&self) -> u8 {
        self.vs
    }

    /// V(R): next N(S) expected.
    pub fn vr(&self) -> u8 {
        self.vr
    }

    /// V(A): oldest unacknowledged N(S).
    pub fn va(&self) -> u8 {
        self.va
    }

    /// Condition flags.
    pub fn condition(&self) -> Condition {
        self.condition
    }

    /// Retry counter.
    pub fn n2count(&self) -> u32 {
        self.n2count
    }

    /// Retry limit.
    pub fn n2(&self) -> u32 {
        self.n2
    }

    /// Saved rejected frame, while an FRMR is outstanding.
    pub fn frmr(&self) -> Option<&FrmrRecord> {
        self.frmr.as_ref()
    }

    /// Transmit queue.
    pub fn queue(&self) -> &TransmitQueue {
        &self.queue
    }

    /// Check if a SABM/SABME matches the configured numbering.
    pub(crate) fn mode_matches(&self, kind: FrameKind) -> bool {
        match kind {
            FrameKind::Sabm => !self.mode.is_extended(),
            FrameKind::Sabme => self.mode.is_extended(),
            _ => false,
        }
    }

    /// Set-mode command for our numbering.
    pub(crate) fn set_mode_kind(&self) -> FrameKind {
        if self.mode.is_extended() {
            FrameKind::Sabme
        } else {
            FrameKind::Sabm
        }
    }

    pub(crate) fn send(&self, out: &mut Vec<Action>, kind: FrameKind, pf: bool, cr: Direction) {
        out.push(Action::Send {
            kind,
            pf,
            cr,
            nr: self.vr,
        });
    }

    /// Zero the window and conditions on link (re)establishment. Frames that
    /// were sent but not acknowledged go back to the head of the queue and
    /// are renumbered from zero.
    pub(crate) fn reset_window(&mut self) {
        self.queue.requeue_unacked();
        self.vs = 0;
        self.vr = 0;
        self.va = 0;
        self.condition.clear();
        self.n2count = 0;
        self.frmr = None;
    }

    /// Send SABM/SABME and wait for UA.
    pub(crate) fn establish_data_link(&mut self, out: &mut Vec<Action>) {
        self.condition.clear();
        self.n2count = 0;
        self.send(out, self.set_mode_kind(), true, Direction::Command);
        out.push(Action::StartT1);
        out.push(Action::StopT2);
    }

    /// Answer a poll with RR, F=1.
    pub(crate) fn enquiry_response(&mut self, out: &mut Vec<Action>) {
        self.send(out, FrameKind::Rr, true, Direction::Response);
        self.condition.remove(Condition::ACK_PENDING);
    }

    /// Reject `frame` with FRMR and enter FrameReject.
    pub(crate) fn frame_reject(
        &mut self,
        frame: &Frame,
        violation: Violation,
        out: &mut Vec<Action>,
    ) {
        let record = FrmrRecord::new(frame, violation);
        self.frmr = Some(record);
        out.push(Action::SendFrmr {
            record,
            vs: self.vs,
            vr: self.vr,
        });
        out.push(Action::StartT1);
        out.push(Action::StopT2);
        self.state = LinkState::FrameReject;
        self.n2count = 0;
    }

    /// Drop all queued data and forget any saved reject.
    pub(crate) fn clear_queues(&mut self) {
        self.queue.clear();
        self.frmr = None;
    }
}
