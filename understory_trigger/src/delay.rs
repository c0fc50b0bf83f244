// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Delay scheduler: one pending visibility request at a time.
//!
//! ## Semantics
//!
//! - Scheduling always cancels the outstanding timer first, whatever its target.
//! - A zero delay commits immediately and arms nothing.
//! - A non-zero delay arms a timer under a fresh [`TimerToken`]; only that token can fire.
//!
//! This gives "latest intent wins": a quick mouse-enter then mouse-leave never shows the overlay.
//!
//! ```
//! use understory_trigger::delay::{DelayScheduler, Scheduled};
//! use understory_trigger::types::Command;
//!
//! let mut s = DelayScheduler::new();
//! let mut out = Vec::new();
//! let Scheduled::Armed(show) = s.schedule(true, 100, &mut out) else { unreachable!() };
//! assert_eq!(s.schedule(false, 0, &mut out), Scheduled::Now(false));
//! assert_eq!(out.last(), Some(&Command::CancelTimer { token: show }));
//! // The superseded timer can no longer fire.
//! assert_eq!(s.fire(show), None);
//! ```

use alloc::vec::Vec;

use crate::types::{Command, Millis, TimerToken};

/// Outcome of [`DelayScheduler::schedule`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scheduled {
    /// Zero delay: commit this target now.
    Now(bool),
    /// A timer was armed; wait for it to fire.
    Armed(TimerToken),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Pending {
    token: TimerToken,
    target: bool,
}

/// Single-slot timer discipline.
#[derive(Clone, Debug, Default)]
pub struct DelayScheduler {
    pending: Option<Pending>,
    next_token: u64,
}

impl DelayScheduler {
    /// Create a scheduler with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Target of the armed timer, if any.
    pub fn pending_target(&self) -> Option<bool> {
        self.pending.map(|p| p.target)
    }

    /// Request `target` after `delay_ms`, replacing any outstanding request.
    pub fn schedule(
        &mut self,
        target: bool,
        delay_ms: Millis,
        out: &mut Vec<Command>,
    ) -> Scheduled {
        self.cancel(out);
        if delay_ms == 0 {
            return Scheduled::Now(target);
        }
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.pending = Some(Pending { token, target });
        tracing::trace!(visible = target, delay_ms, token = token.0, "arming delay timer");
        out.push(Command::ArmTimer { token, delay_ms });
        Scheduled::Armed(token)
    }

    /// Cancel the outstanding timer. No effect when nothing is pending.
    pub fn cancel(&mut self, out: &mut Vec<Command>) {
        if let Some(p) = self.pending.take() {
            out.push(Command::CancelTimer { token: p.token });
        }
    }

    /// A timer fired. Returns the target to commit if `token` is the current one.
    ///
    /// The slot is cleared on success.
    pub fn fire(&mut self, token: TimerToken) -> Option<bool> {
        match self.pending {
            Some(p) if p.token == token => {
                self.pending = None;
                Some(p.target)
            }
            _ => {
                tracing::trace!(token = token.0, "ignoring stale timer");
                None
            }
        }
    }
}
