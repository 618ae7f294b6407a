//! State transition engine.
//!
//! Every inbound frame is dispatched on `(state, frame kind)`. The handlers
//! mutate the [`LinkContext`] in place and describe their side effects as a
//! list of [`Action`]s, so the whole transition table can be exercised
//! without I/O or clocks.

use bytes::Bytes;
use tracing::{debug, trace, warn};

use super::context::{Action, Condition, LinkContext, LinkState, Notification};
use crate::core::{DisconnectReason, LinkError, LinkResult};
use crate::frame::{Direction, Frame, FrameKind, Violation};

impl LinkContext {
    /// Process one inbound frame.
    pub fn handle_frame(&mut self, frame: &Frame) -> Vec<Action> {
        trace!(
            state = ?self.state,
            kind = ?frame.kind,
            ns = frame.ns,
            nr = frame.nr,
            pf = frame.pf,
            cr = ?frame.cr,
            "frame received"
        );

        let before = self.state;
        let mut out = Vec::new();
        match self.state {
            LinkState::Disconnected => self.disconnected(frame, &mut out),
            LinkState::AwaitingConnection => self.awaiting_connection(frame, &mut out),
            LinkState::AwaitingRelease => self.awaiting_release(frame, &mut out),
            LinkState::DataTransfer => self.data_transfer(frame, &mut out),
            LinkState::FrameReject => self.frame_rejected(frame, &mut out),
        }
        if self.state != before {
            debug!(from = ?before, to = ?self.state, "link state changed");
        }
        out
    }

    fn disconnected(&mut self, frame: &Frame, out: &mut Vec<Action>) {
        match frame.kind {
            FrameKind::Sabm | FrameKind::Sabme => self.answer_set_mode(frame, out),
            FrameKind::Disc => self.send(out, FrameKind::Ua, frame.pf, Direction::Response),
            _ => {}
        }
    }

    fn awaiting_connection(&mut self, frame: &Frame, out: &mut Vec<Action>) {
        match frame.kind {
            FrameKind::Sabm | FrameKind::Sabme => {
                let reply = if self.mode_matches(frame.kind) {
                    FrameKind::Ua
                } else {
                    FrameKind::Dm
                };
                self.send(out, reply, frame.pf, Direction::Response);
            }
            FrameKind::Disc => self.send(out, FrameKind::Dm, frame.pf, Direction::Response),
            FrameKind::Ua if frame.pf => {
                out.push(Action::StopT1);
                out.push(Action::StopT2);
                self.reset_window();
                self.state = LinkState::DataTransfer;
                out.push(Action::Notify(Notification::ConnectConfirmation));
            }
            FrameKind::Dm if frame.pf => {
                self.clear_queues();
                self.state = LinkState::Disconnected;
                out.push(Action::StartT1);
                out.push(Action::StopT2);
                out.push(Action::Notify(Notification::DisconnectIndication(
                    DisconnectReason::Refused,
                )));
            }
            _ => {}
        }
    }

    fn awaiting_release(&mut self, frame: &Frame, out: &mut Vec<Action>) {
        match frame.kind {
            FrameKind::Sabm | FrameKind::Sabme => {
                self.send(out, FrameKind::Dm, frame.pf, Direction::Response)
            }
            FrameKind::Disc => self.send(out, FrameKind::Ua, frame.pf, Direction::Response),
            FrameKind::Ua if frame.pf => self.release_complete(DisconnectReason::Ok, out),
            FrameKind::Dm if frame.pf => {
                self.release_complete(DisconnectReason::NotConnected, out)
            }
            FrameKind::I | FrameKind::Rr | FrameKind::Rnr | FrameKind::Rej if frame.pf => {
                self.send(out, FrameKind::Dm, true, Direction::Response)
            }
            _ => {}
        }
    }

    fn release_complete(&mut self, reason: DisconnectReason, out: &mut Vec<Action>) {
        self.state = LinkState::Disconnected;
        out.push(Action::StartT1);
        out.push(Action::StopT2);
        out.push(Action::Notify(Notification::DisconnectConfirmation(reason)));
    }

    fn data_transfer(&mut self, frame: &Frame, out: &mut Vec<Action>) {
        match frame.kind {
            FrameKind::Sabm | FrameKind::Sabme => {
                if self.mode_matches(frame.kind) {
                    self.send(out, FrameKind::Ua, frame.pf, Direction::Response);
                    out.push(Action::StopT1);
                    out.push(Action::StopT2);
                    self.reset_window();
                } else {
                    self.send(out, FrameKind::Dm, frame.pf, Direction::Response);
                }
            }
            FrameKind::Disc => {
                self.clear_queues();
                self.send(out, FrameKind::Ua, frame.pf, Direction::Response);
                out.push(Action::StartT1);
                out.push(Action::StopT2);
                self.state = LinkState::Disconnected;
                out.push(Action::Notify(Notification::DisconnectIndication(
                    DisconnectReason::Ok,
                )));
            }
            FrameKind::Dm => {
                self.clear_queues();
                out.push(Action::StartT1);
                out.push(Action::StopT2);
                self.state = LinkState::Disconnected;
                out.push(Action::Notify(Notification::DisconnectIndication(
                    DisconnectReason::NotConnected,
                )));
            }
            FrameKind::Rnr => {
                self.condition.insert(Condition::PEER_BUSY);
                self.check_need_response(frame, out);
                if self.validate_nr(frame.nr) {
                    self.frames_acked(frame.nr);
                } else {
                    self.nr_violation(frame, out);
                }
            }
            FrameKind::Rr => {
                self.condition.remove(Condition::PEER_BUSY);
                self.check_need_response(frame, out);
                if self.validate_nr(frame.nr) {
                    self.check_iframes_acked(frame.nr, out);
                } else {
                    self.nr_violation(frame, out);
                }
            }
            FrameKind::Rej => {
                self.condition.remove(Condition::PEER_BUSY);
                self.check_need_response(frame, out);
                if self.validate_nr(frame.nr) {
                    self.frames_acked(frame.nr);
                    out.push(Action::StopT1);
                    self.n2count = 0;
                    self.queue.requeue_unacked();
                } else {
                    self.nr_violation(frame, out);
                }
            }
            FrameKind::I => self.iframe(frame, out),
            FrameKind::Frmr => {
                warn!(info = ?frame.info, "peer rejected a frame, resetting link");
                self.establish_data_link(out);
                self.state = LinkState::AwaitingConnection;
                self.queue.requeue_unacked();
            }
            FrameKind::Illegal => {
                let violation = frame.format_violation();
                warn!(control = ?frame.control, ?violation, "illegal frame");
                self.frame_reject(frame, violation, out);
            }
            FrameKind::Ua => {}
        }
    }

    fn iframe(&mut self, frame: &Frame, out: &mut Vec<Action>) {
        if !self.validate_nr(frame.nr) {
            self.nr_violation(frame, out);
            return;
        }
        if self.condition.contains(Condition::PEER_BUSY) {
            self.frames_acked(frame.nr);
        } else {
            self.check_iframes_acked(frame.nr, out);
        }

        if frame.ns == self.vr {
            out.push(Action::Deliver {
                payload: frame.info.clone(),
                pf: frame.pf,
            });
        } else if self.condition.contains(Condition::REJECT) {
            if frame.pf {
                self.enquiry_response(out);
            }
        } else {
            debug!(ns = frame.ns, vr = self.vr, "sequence gap, sending REJ");
            self.condition.insert(Condition::REJECT);
            self.send(out, FrameKind::Rej, frame.pf, Direction::Response);
            self.condition.remove(Condition::ACK_PENDING);
        }
    }

    fn frame_rejected(&mut self, frame: &Frame, out: &mut Vec<Action>) {
        if frame.kind.is_set_mode() {
            self.answer_set_mode(frame, out);
        }
    }

    /// SABM/SABME in a state where the link is not up: accept it if the
    /// numbering matches, refuse it with DM otherwise.
    fn answer_set_mode(&mut self, frame: &Frame, out: &mut Vec<Action>) {
        if !self.mode_matches(frame.kind) {
            self.send(out, FrameKind::Dm, frame.pf, Direction::Response);
            return;
        }
        self.send(out, FrameKind::Ua, frame.pf, Direction::Response);
        out.push(Action::StopT1);
        out.push(Action::StopT2);
        self.reset_window();
        self.state = LinkState::DataTransfer;
        out.push(Action::Notify(Notification::ConnectIndication));
    }

    fn check_need_response(&mut self, frame: &Frame, out: &mut Vec<Action>) {
        if frame.cr == Direction::Command && frame.pf {
            self.enquiry_response(out);
        }
    }

    fn nr_violation(&mut self, frame: &Frame, out: &mut Vec<Action>) {
        warn!(
            nr = frame.nr,
            va = self.va,
            vs = self.vs,
            "N(R) outside the send window"
        );
        self.frame_reject(frame, Violation::InvalidNr, out);
    }

    /// Complete an I-frame the upper layer accepted.
    ///
    /// Called by the driver after a [`Action::Deliver`] was answered with
    /// [`Delivery::Accepted`](crate::core::Delivery::Accepted).
    pub fn accept_iframe(&mut self, pf: bool) -> Vec<Action> {
        let mut out = Vec::new();
        self.vr = self.mode.modulus.next(self.vr);
        self.condition.remove(Condition::REJECT);
        if pf {
            self.enquiry_response(&mut out);
        } else if !self.condition.contains(Condition::ACK_PENDING) {
            self.condition.insert(Condition::ACK_PENDING);
            out.push(Action::StartT2);
        }
        out
    }

    /// Send as many queued I-frames as the window allows.
    pub fn kick(&mut self) -> Vec<Action> {
        let mut out = Vec::new();
        if self.state != LinkState::DataTransfer
            || self.condition.contains(Condition::PEER_BUSY)
            || !self.queue.has_pending()
        {
            return out;
        }

        let modulus = self.mode.modulus;
        let start = if self.queue.has_unacked() {
            self.vs
        } else {
            self.va
        };
        let end = modulus.add(self.va, self.window);
        if start == end {
            return out;
        }

        self.vs = start;
        while self.vs != end {
            let Some(payload) = self.queue.next_unsent() else {
                break;
            };
            trace!(ns = self.vs, nr = self.vr, len = payload.len(), "sending I-frame");
            out.push(Action::SendI {
                ns: self.vs,
                nr: self.vr,
                payload,
            });
            self.vs = modulus.next(self.vs);
        }

        self.condition.remove(Condition::ACK_PENDING);
        out.push(Action::EnsureT1);
        out
    }

    /// Local request to bring the link up.
    pub fn connect_request(&mut self) -> LinkResult<Vec<Action>> {
        let mut out = Vec::new();
        match self.state {
            LinkState::AwaitingConnection => {}
            LinkState::DataTransfer | LinkState::FrameReject => {
                return Err(LinkError::AlreadyConnected);
            }
            LinkState::Disconnected | LinkState::AwaitingRelease => {
                self.establish_data_link(&mut out);
                self.state = LinkState::AwaitingConnection;
                debug!("connecting");
            }
        }
        Ok(out)
    }

    /// Local request to take the link down.
    pub fn disconnect_request(&mut self) -> LinkResult<Vec<Action>> {
        let mut out = Vec::new();
        match self.state {
            LinkState::Disconnected => return Err(LinkError::NotConnected),
            LinkState::AwaitingConnection => {
                self.clear_queues();
                self.send(&mut out, FrameKind::Disc, true, Direction::Command);
                self.state = LinkState::Disconnected;
                out.push(Action::StartT1);
                debug!("connect abandoned");
            }
            LinkState::AwaitingRelease => {}
            LinkState::DataTransfer | LinkState::FrameReject => {
                self.clear_queues();
                self.n2count = 0;
                self.send(&mut out, FrameKind::Disc, true, Direction::Command);
                out.push(Action::StartT1);
                out.push(Action::StopT2);
                self.state = LinkState::AwaitingRelease;
                debug!("disconnecting");
            }
        }
        Ok(out)
    }

    /// Queue a payload for transmission and try to send it.
    pub fn data_request(&mut self, payload: Bytes) -> LinkResult<Vec<Action>> {
        if !self.state.is_connected() {
            return Err(LinkError::NotConnected);
        }
        self.queue.push(payload);
        Ok(self.kick())
    }
}
