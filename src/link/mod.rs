//! Data link: state, transition engine, timers and queues.
//!
//! [`Link`] is the sans-IO entry point. Feed it received frames with
//! [`Link::data_input`], local requests with [`Link::connect_request`] and
//! friends, drain outbound frames with [`Link::poll_transmit`], and call
//! [`Link::handle_timeout`] once the instant from [`Link::poll_timeout`] has
//! passed. Every method takes `&mut self`, so frame processing, requests and
//! timer expiry on one link never interleave.

mod context;
mod machine;
mod params;
mod queue;
mod table;
mod timers;
mod window;

pub use context::*;
pub use params::*;
pub use queue::*;
pub use table::*;
pub use timers::*;

use std::collections::VecDeque;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::core::{Delivery, LinkResult, UpperLayer};
use crate::frame::{Frame, decode, encode_control, encode_frmr, encode_iframe};

/// One LAPB data link.
#[derive(Debug)]
pub struct Link {
    ctx: LinkContext,
    params: LinkParams,
    timers: TimerTable,
    outbox: VecDeque<Bytes>,
}

impl Link {
    /// Create a disconnected link.
    pub fn new(params: LinkParams) -> LinkResult<Self> {
        params.validate()?;
        Ok(Self {
            ctx: LinkContext::new(params.mode, params.window, params.n2),
            params,
            timers: TimerTable::default(),
            outbox: VecDeque::new(),
        })
    }

    /// Current state.
    pub fn state(&self) -> LinkState {
        self.ctx.state()
    }

    /// Protocol state of the link.
    pub fn context(&self) -> &LinkContext {
        &self.ctx
    }

    /// Parameters in effect.
    pub fn params(&self) -> &LinkParams {
        &self.params
    }

    /// Replace the link parameters.
    ///
    /// Timers and N2 take effect immediately. Mode and window only change
    /// while the link is disconnected; otherwise the current ones are kept.
    pub fn set_params(&mut self, params: LinkParams) -> LinkResult<()> {
        params.validate()?;

        let mut params = params;
        if self.ctx.state == LinkState::Disconnected {
            self.ctx.mode = params.mode;
            self.ctx.window = params.window;
        } else if params.mode != self.params.mode || params.window != self.params.window {
            debug!(state = ?self.ctx.state, "link up, keeping mode and window");
            params.mode = self.params.mode;
            params.window = self.params.window;
        }
        self.ctx.n2 = params.n2;
        self.params = params;
        Ok(())
    }

    /// Process one received frame (address, control and information octets).
    ///
    /// Input that cannot be decoded is treated as an illegal frame.
    pub fn data_input<U>(&mut self, now: Instant, raw: Bytes, upper: &mut U)
    where
        U: UpperLayer + ?Sized,
    {
        let control = [
            raw.get(1).copied().unwrap_or(0),
            raw.get(2).copied().unwrap_or(0),
        ];
        let frame = match decode(self.ctx.mode, raw) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "undecodable frame");
                Frame::illegal(control)
            }
        };

        let actions = self.ctx.handle_frame(&frame);
        self.apply(now, actions, upper);
        let actions = self.ctx.kick();
        self.apply(now, actions, upper);
    }

    /// Ask for the link to be established.
    pub fn connect_request(&mut self, now: Instant) -> LinkResult<()> {
        let actions = self.ctx.connect_request()?;
        self.apply_local(now, actions);
        Ok(())
    }

    /// Ask for the link to be released.
    pub fn disconnect_request(&mut self, now: Instant) -> LinkResult<()> {
        let actions = self.ctx.disconnect_request()?;
        self.apply_local(now, actions);
        Ok(())
    }

    /// Queue a payload for transmission as an I-frame.
    pub fn data_request(&mut self, now: Instant, payload: Bytes) -> LinkResult<()> {
        let actions = self.ctx.data_request(payload)?;
        self.apply_local(now, actions);
        Ok(())
    }

    /// Next encoded frame to put on the wire.
    pub fn poll_transmit(&mut self) -> Option<Bytes> {
        self.outbox.pop_front()
    }

    /// Instant at which [`handle_timeout`](Self::handle_timeout) must be called.
    pub fn poll_timeout(&self) -> Option<Instant> {
        self.timers.next_timeout()
    }

    /// Fire every timer whose deadline is at or before `now`.
    pub fn handle_timeout<U>(&mut self, now: Instant, upper: &mut U)
    where
        U: UpperLayer + ?Sized,
    {
        while let Some(timer) = self.timers.expire_before(now) {
            trace!(?timer, state = ?self.ctx.state, "timer expired");
            let actions = match timer {
                Timer::T1 => self.ctx.on_t1_expiry(),
                Timer::T2 => self.ctx.on_t2_expiry(),
            };
            self.apply(now, actions, upper);
        }
        let actions = self.ctx.kick();
        self.apply(now, actions, upper);
    }

    fn apply<U>(&mut self, now: Instant, actions: Vec<Action>, upper: &mut U)
    where
        U: UpperLayer + ?Sized,
    {
        for action in actions {
            let Some(action) = self.execute(now, action) else {
                continue;
            };
            match action {
                Action::Deliver { payload, pf } => match upper.data_indication(payload) {
                    Delivery::Accepted => {
                        let more = self.ctx.accept_iframe(pf);
                        self.apply(now, more, upper);
                    }
                    Delivery::Congested => {
                        debug!(vr = self.ctx.vr, "upper layer congested, frame not acknowledged");
                    }
                },
                Action::Notify(notification) => match notification {
                    Notification::ConnectIndication => upper.connect_indication(),
                    Notification::ConnectConfirmation => upper.connect_confirmation(),
                    Notification::DisconnectIndication(reason) => {
                        upper.disconnect_indication(reason)
                    }
                    Notification::DisconnectConfirmation(reason) => {
                        upper.disconnect_confirmation(reason)
                    }
                },
                _ => {}
            }
        }
    }

    fn apply_local(&mut self, now: Instant, actions: Vec<Action>) {
        for action in actions {
            if let Some(action) = self.execute(now, action) {
                debug!(?action, "upper-layer action from a local request ignored");
            }
        }
    }

    /// Carry out frame and timer actions. Actions aimed at the upper layer
    /// are handed back.
    fn execute(&mut self, now: Instant, action: Action) -> Option<Action> {
        let mode = self.ctx.mode;
        match action {
            Action::Send { kind, pf, cr, nr } => {
                trace!(?kind, pf, ?cr, nr, "sending frame");
                self.outbox.push_back(encode_control(mode, kind, pf, cr, nr));
            }
            Action::SendI { ns, nr, payload } => {
                self.outbox
                    .push_back(encode_iframe(mode, ns, nr, false, &payload));
            }
            Action::SendFrmr { record, vs, vr } => {
                warn!(control = ?record.control, violation = ?record.violation, "sending FRMR");
                self.outbox.push_back(encode_frmr(mode, &record, vs, vr));
            }
            Action::StartT1 => self.timers.set(Timer::T1, now + self.params.t1),
            Action::EnsureT1 => {
                if !self.timers.is_running(Timer::T1) {
                    self.timers.set(Timer::T1, now + self.params.t1);
                }
            }
            Action::StopT1 => self.timers.stop(Timer::T1),
            Action::StartT2 => self.timers.set(Timer::T2, now + self.params.t2),
            Action::StopT2 => self.timers.stop(Timer::T2),
            action @ (Action::Deliver { .. } | Action::Notify(_)) => return Some(action),
        }
        None
    }
}
