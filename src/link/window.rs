//! Sequence number validation and acknowledgement bookkeeping.

use super::context::{Action, LinkContext};

impl LinkContext {
    /// Check that `nr` acknowledges something we actually sent: it must lie
    /// in the circular interval `[V(A), V(S)]`.
    pub fn validate_nr(&self, nr: u8) -> bool {
        self.mode.modulus.in_range(nr, self.va, self.vs)
    }

    /// Advance V(A) to `nr`, releasing every frame it now covers.
    ///
    /// T1 is left alone; this is the path taken while the peer is busy.
    pub fn frames_acked(&mut self, nr: u8) {
        let covered = self.mode.modulus.distance(self.va, nr);
        if covered > 0 {
            self.queue.release(usize::from(covered));
        }
        self.va = nr;
    }

    /// Acknowledge up to `nr` while the peer is not busy.
    ///
    /// Nothing happens when `nr` acknowledges nothing new. Otherwise frames
    /// are released and the retry counter reset; T1 is stopped once
    /// everything outstanding is acknowledged and restarted otherwise.
    pub fn check_iframes_acked(&mut self, nr: u8, out: &mut Vec<Action>) {
        if nr == self.va {
            return;
        }
        self.frames_acked(nr);
        self.n2count = 0;
        if nr == self.vs {
            out.push(Action::StopT1);
        } else {
            out.push(Action::StartT1);
        }
    }
}
