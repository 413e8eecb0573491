//! Frame scheduler: at most one pending re-position per animation frame.
//!
//! `request` hands out a ticket only when no frame is pending; the host asks
//! for an animation frame and calls back with that ticket. Each request after
//! a run bumps the generation, so a late callback with an old ticket is
//! ignored.

#[derive(Debug, Default)]
pub struct FrameScheduler {
    generation: u64,
    pending: Option<u64>,
    coalesced: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a frame. Returns the ticket to request from the host, or
    /// `None` if a frame is already pending and this request was folded in.
    pub fn request(&mut self) -> Option<u64> {
        if self.pending.is_some() {
            self.coalesced += 1;
            return None;
        }
        self.generation += 1;
        self.pending = Some(self.generation);
        self.pending
    }

    /// Called from the host's frame callback. Returns whether the frame is
    /// still relevant and should run.
    pub fn run(&mut self, ticket: u64) -> bool {
        if self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            log::trace!("stale frame {ticket} ignored");
            false
        }
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Requests folded into an already pending frame.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}
