//! T1/T2 deadlines and what happens when they pass.

use std::time::Instant;

use tracing::{debug, warn};

use super::context::{Action, Condition, LinkContext, LinkState, Notification};
use crate::core::DisconnectReason;
use crate::frame::{Direction, FrameKind, Role};

/// Link timers.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum Timer {
    /// Retransmission / response timer.
    T1 = 0,
    /// Acknowledgement delay timer.
    T2 = 1,
}

impl Timer {
    const VALUES: [Self; 2] = [Self::T1, Self::T2];
}

/// Keeps track of the pending deadline of each [`Timer`].
///
/// Nothing fires by itself: the owner asks for [`next_timeout`](Self::next_timeout)
/// and calls [`expire_before`](Self::expire_before) once that instant has passed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerTable {
    data: [Option<Instant>; Timer::VALUES.len()],
}

impl TimerTable {
    /// Arm `timer` to fire at `deadline`, replacing any earlier deadline.
    pub fn set(&mut self, timer: Timer, deadline: Instant) {
        self.data[timer as usize] = Some(deadline);
    }

    /// Deadline of `timer`, if armed.
    pub fn get(&self, timer: Timer) -> Option<Instant> {
        self.data[timer as usize]
    }

    /// Disarm `timer`. Stopping an idle timer is a no-op.
    pub fn stop(&mut self, timer: Timer) {
        self.data[timer as usize] = None;
    }

    /// Check if `timer` is armed.
    pub fn is_running(&self, timer: Timer) -> bool {
        self.data[timer as usize].is_some()
    }

    /// Earliest armed deadline.
    pub fn next_timeout(&self) -> Option<Instant> {
        self.data.iter().flatten().min().copied()
    }

    /// Disarm and return the earliest timer whose deadline is at or before `now`.
    pub fn expire_before(&mut self, now: Instant) -> Option<Timer> {
        let (timer, _) = Timer::VALUES
            .iter()
            .filter_map(|&t| self.get(t).map(|deadline| (t, deadline)))
            .filter(|&(_, deadline)| deadline <= now)
            .min_by_key(|&(_, deadline)| deadline)?;
        self.stop(timer);
        Some(timer)
    }
}

impl LinkContext {
    /// T1 ran out.
    ///
    /// Retries up to N2 times, then abandons the link.
    pub fn on_t1_expiry(&mut self) -> Vec<Action> {
        let mut out = Vec::new();

        if self.state == LinkState::Disconnected {
            if self.mode.role == Role::Dce {
                self.send(&mut out, FrameKind::Dm, false, Direction::Response);
                out.push(Action::StartT1);
            }
            return out;
        }

        if self.n2count >= self.n2 {
            warn!(state = ?self.state, n2 = self.n2, "retry limit reached, link down");
            self.clear_queues();
            let notification = match self.state {
                LinkState::AwaitingRelease => {
                    Notification::DisconnectConfirmation(DisconnectReason::TimedOut)
                }
                LinkState::DataTransfer => {
                    out.push(Action::StopT2);
                    Notification::DisconnectIndication(DisconnectReason::TimedOut)
                }
                _ => Notification::DisconnectIndication(DisconnectReason::TimedOut),
            };
            self.state = LinkState::Disconnected;
            out.push(Action::Notify(notification));
            return out;
        }

        self.n2count += 1;
        debug!(state = ?self.state, n2count = self.n2count, "T1 expired, retrying");
        match self.state {
            LinkState::AwaitingConnection => {
                self.send(&mut out, self.set_mode_kind(), true, Direction::Command);
            }
            LinkState::AwaitingRelease => {
                self.send(&mut out, FrameKind::Disc, true, Direction::Command);
            }
            LinkState::DataTransfer => {
                self.queue.requeue_unacked();
                out.extend(self.kick());
            }
            LinkState::FrameReject => {
                if let Some(record) = self.frmr {
                    out.push(Action::SendFrmr {
                        record,
                        vs: self.vs,
                        vr: self.vr,
                    });
                }
            }
            LinkState::Disconnected => {}
        }
        out.push(Action::StartT1);
        out
    }

    /// T2 ran out: acknowledge whatever arrived since the last ack.
    pub fn on_t2_expiry(&mut self) -> Vec<Action> {
        let mut out = Vec::new();
        if self.condition.contains(Condition::ACK_PENDING) {
            self.condition.remove(Condition::ACK_PENDING);
            self.send(&mut out, FrameKind::Rr, false, Direction::Response);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::frame::{Frame, Mode, Violation};

    fn ctx(state: LinkState) -> LinkContext {
        let mut ctx = LinkContext::new(Mode::basic(), 7, 3);
        ctx.state = state;
        ctx
    }

    #[test]
    fn test_timer_table() {
        let now = Instant::now();
        let mut timers = TimerTable::default();
        assert_eq!(timers.next_timeout(), None);
        assert_eq!(timers.expire_before(now), None);

        timers.set(Timer::T1, now + Duration::from_secs(5));
        timers.set(Timer::T2, now + Duration::from_secs(1));
        assert_eq!(timers.next_timeout(), Some(now + Duration::from_secs(1)));

        assert_eq!(timers.expire_before(now), None);
        assert_eq!(
            timers.expire_before(now + Duration::from_secs(10)),
            Some(Timer::T2)
        );
        assert!(!timers.is_running(Timer::T2));
        assert_eq!(
            timers.expire_before(now + Duration::from_secs(10)),
            Some(Timer::T1)
        );
        assert_eq!(timers.next_timeout(), None);

        // Stopping twice is harmless
        timers.stop(Timer::T1);
        timers.stop(Timer::T1);
        assert!(!timers.is_running(Timer::T1));
    }

    #[test]
    fn test_t1_disconnected_dce_sends_dm() {
        let mut dce = LinkContext::new(Mode::basic().with_role(Role::Dce), 7, 3);
        assert_eq!(
            dce.on_t1_expiry(),
            vec![
                Action::Send {
                    kind: FrameKind::Dm,
                    pf: false,
                    cr: Direction::Response,
                    nr: 0
                },
                Action::StartT1,
            ]
        );

        let mut dte = ctx(LinkState::Disconnected);
        assert!(dte.on_t1_expiry().is_empty());
    }

    #[test]
    fn test_t1_retries_sabm_then_gives_up() {
        let mut ctx = ctx(LinkState::AwaitingConnection);
        for attempt in 1..=3 {
            let out = ctx.on_t1_expiry();
            assert_eq!(
                out,
                vec![
                    Action::Send {
                        kind: FrameKind::Sabm,
                        pf: true,
                        cr: Direction::Command,
                        nr: 0
                    },
                    Action::StartT1,
                ]
            );
            assert_eq!(ctx.n2count(), attempt);
        }

        let out = ctx.on_t1_expiry();
        assert_eq!(ctx.state(), LinkState::Disconnected);
        assert_eq!(
            out,
            vec![Action::Notify(Notification::DisconnectIndication(
                DisconnectReason::TimedOut
            ))]
        );
    }

    #[test]
    fn test_t1_release_times_out() {
        let mut ctx = ctx(LinkState::AwaitingRelease);
        ctx.n2count = 3;
        let out = ctx.on_t1_expiry();
        assert_eq!(ctx.state(), LinkState::Disconnected);
        assert_eq!(
            out,
            vec![Action::Notify(Notification::DisconnectConfirmation(
                DisconnectReason::TimedOut
            ))]
        );
    }

    #[test]
    fn test_t1_release_resends_disc() {
        let mut ctx = ctx(LinkState::AwaitingRelease);
        let out = ctx.on_t1_expiry();
        assert_eq!(
            out[0],
            Action::Send {
                kind: FrameKind::Disc,
                pf: true,
                cr: Direction::Command,
                nr: 0
            }
        );
    }

    #[test]
    fn test_t1_data_transfer_retransmits() {
        let mut ctx = ctx(LinkState::DataTransfer);
        for _ in 0..2 {
            ctx.queue.push(Bytes::from_static(b"p"));
        }
        ctx.kick();
        assert_eq!(ctx.vs, 2);

        let out = ctx.on_t1_expiry();
        let resent: Vec<u8> = out
            .iter()
            .filter_map(|a| match a {
                Action::SendI { ns, .. } => Some(*ns),
                _ => None,
            })
            .collect();
        assert_eq!(resent, vec![0, 1]);
        assert_eq!(out.last(), Some(&Action::StartT1));
        assert_eq!(ctx.n2count(), 1);
    }

    #[test]
    fn test_t1_data_transfer_gives_up() {
        let mut ctx = ctx(LinkState::DataTransfer);
        ctx.queue.push(Bytes::from_static(b"p"));
        ctx.n2count = 3;

        let out = ctx.on_t1_expiry();
        assert_eq!(ctx.state(), LinkState::Disconnected);
        assert!(ctx.queue().is_empty());
        assert_eq!(
            out,
            vec![
                Action::StopT2,
                Action::Notify(Notification::DisconnectIndication(DisconnectReason::TimedOut)),
            ]
        );
    }

    #[test]
    fn test_t1_frame_reject_repeats_frmr() {
        let mut ctx = ctx(LinkState::DataTransfer);
        let frame = Frame::illegal([0x03, 0]);
        ctx.handle_frame(&frame);
        assert_eq!(ctx.state(), LinkState::FrameReject);

        let out = ctx.on_t1_expiry();
        assert_eq!(
            out,
            vec![
                Action::SendFrmr {
                    record: crate::frame::FrmrRecord::new(&frame, Violation::InvalidControl),
                    vs: 0,
                    vr: 0
                },
                Action::StartT1,
            ]
        );
    }

    #[test]
    fn test_t2_sends_rr_when_ack_pending() {
        let mut ctx = ctx(LinkState::DataTransfer);
        assert!(ctx.on_t2_expiry().is_empty());

        ctx.vr = 4;
        ctx.condition.insert(Condition::ACK_PENDING);
        assert_eq!(
            ctx.on_t2_expiry(),
            vec![Action::Send {
                kind: FrameKind::Rr,
                pf: false,
                cr: Direction::Response,
                nr: 4
            }]
        );
        assert!(!ctx.condition().contains(Condition::ACK_PENDING));
    }
}
