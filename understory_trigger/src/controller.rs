// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trigger controller: the visibility state machine for one anchor/overlay pair.
//!
//! ## States
//!
//! The controller is `Hidden` or `Visible` (the committed value). While a delay timer is armed
//! or a gate request is outstanding it is additionally "transition pending".
//!
//! ## Commit protocol
//!
//! 1. An interaction is classified by the [action model](crate::action) into a show or hide
//!    intent, or ignored.
//! 2. The intent goes through the [delay scheduler](crate::delay). Zero delays commit at once;
//!    otherwise a timer is armed and the host reports it via [`Controller::timer_fired`].
//! 3. A commit asks the host to run the `beforeVisibleChange` gate
//!    ([`Command::RequestGate`]). The host reports the outcome with [`Controller::resolve_gate`].
//! 4. Only the most recent gate ticket may commit, and only if the committed value still differs
//!    from its target. Older resolutions are discarded.
//! 5. A passing gate emits [`Command::Present`] under a fresh [`PresentToken`]. Presentations can
//!    finish in any order, so [`Controller::overlay_settled`] only reports the latest token.
//!
//! ## Outside dismissal
//!
//! While visible, the controller keeps a document pointer-down subscription
//! ([`Command::SubscribeOutside`]). A pointer-down whose target is outside the anchor, the overlay,
//! and every overlay nested in it closes the overlay immediately, unless a non-closable mask is
//! shown. Pointer-down is used rather than click so that content removed during a click inside
//! the overlay is never mistaken for an outside target.
//!
//! ## Lifetime
//!
//! After [`Controller::destroy`] every operation is a no-op, including gate resolutions that
//! arrive late.
//!
//! ```
//! use understory_trigger::action::Triggers;
//! use understory_trigger::config::TriggerConfig;
//! use understory_trigger::containment::{ParentLookup, TreeContainment};
//! use understory_trigger::controller::Controller;
//! use understory_trigger::types::{Command, EventKind, InteractionEvent};
//!
//! struct Flat;
//! impl ParentLookup<u32> for Flat {
//!     fn parent_of(&self, _: &u32) -> Option<u32> { None }
//! }
//!
//! let config = TriggerConfig::with_triggers(Triggers::for_action("click"));
//! let mut c = Controller::new(config, TreeContainment::new(Flat, 1));
//!
//! let cmds = c.handle_interaction(&InteractionEvent::new(EventKind::Click, 1, 0)).unwrap();
//! let [Command::RequestGate { ticket, target: true }] = cmds.as_slice() else { unreachable!() };
//!
//! let cmds = c.resolve_gate(*ticket, Ok(()));
//! assert_eq!(cmds[0], Command::VisibleChanged(true));
//! assert!(c.is_visible());
//! ```

use alloc::vec::Vec;
use core::marker::PhantomData;

use crate::config::TriggerConfig;
use crate::containment::{ContainmentQuery, is_outside};
use crate::delay::{DelayScheduler, Scheduled};
use crate::error::{TriggerError, Veto};
use crate::types::{
    Command, EventKind, GateTicket, InteractionEvent, Millis, PresentToken, Presentation,
    TimerToken,
};

/// A click within this many milliseconds of a focus is treated as a side effect of that focus.
pub const FOCUS_CLICK_WINDOW_MS: Millis = 20;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct PendingGate {
    ticket: GateTicket,
    target: bool,
}

/// Timestamps of the last physical click, touch and focus on the anchor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct Debounce {
    last_click: Option<Millis>,
    last_touch: Option<Millis>,
    last_focus: Option<Millis>,
}

impl Debounce {
    /// Consume the recorded timestamps for a click at `at`.
    ///
    /// Returns true when the click should be suppressed.
    fn consume_click(&mut self, at: Millis) -> bool {
        let suppress = self.last_focus.is_some_and(|focus| {
            let physical = [self.last_click, self.last_touch]
                .into_iter()
                .flatten()
                .min_by_key(|t| t.abs_diff(focus))
                .unwrap_or(at);
            physical.abs_diff(focus) < FOCUS_CLICK_WINDOW_MS
        });
        *self = Self::default();
        suppress
    }
}

/// Visibility controller for one anchor and its overlay.
///
/// `K` is the host's node reference type and `C` its [`ContainmentQuery`].
pub struct Controller<K, C> {
    config: TriggerConfig,
    containment: C,
    committed: bool,
    scheduler: DelayScheduler,
    gate: Option<PendingGate>,
    next_ticket: u64,
    debounce: Debounce,
    outside_subscribed: bool,
    mounted: bool,
    next_present: u64,
    presenting: Option<(PresentToken, bool)>,
    last_settled: Option<bool>,
    alive: bool,
    _phantom: PhantomData<fn(&K)>,
}

impl<K, C> core::fmt::Debug for Controller<K, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("committed", &self.committed)
            .field("pending_timer", &self.scheduler.pending_target())
            .field("pending_gate", &self.gate)
            .field("alive", &self.alive)
            .finish_non_exhaustive()
    }
}

impl<K, C: ContainmentQuery<K>> Controller<K, C> {
    /// Create a controller. Call [`Controller::attach`] once the anchor is mounted.
    pub fn new(config: TriggerConfig, containment: C) -> Self {
        Self {
            committed: config.initial_visible,
            config,
            containment,
            scheduler: DelayScheduler::new(),
            gate: None,
            next_ticket: 0,
            debounce: Debounce::default(),
            outside_subscribed: false,
            mounted: false,
            next_present: 0,
            presenting: None,
            last_settled: None,
            alive: true,
            _phantom: PhantomData,
        }
    }

    /// The configuration this controller was built with.
    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// The containment capability.
    pub fn containment(&self) -> &C {
        &self.containment
    }

    /// Mutable access to the containment capability, e.g. to record the mounted overlay root.
    pub fn containment_mut(&mut self) -> &mut C {
        &mut self.containment
    }

    /// Current committed visibility.
    pub fn is_visible(&self) -> bool {
        self.committed
    }

    /// Target of the outstanding transition: the armed timer first, then the in-flight gate.
    pub fn pending_target(&self) -> Option<bool> {
        self.scheduler
            .pending_target()
            .or(self.gate.map(|g| g.target))
    }

    /// Whether [`Controller::destroy`] has not been called yet.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Initial effects for an overlay that starts visible.
    pub fn attach(&mut self) -> Vec<Command> {
        let mut out = Vec::new();
        if self.alive && self.committed && !self.mounted {
            self.apply_presentation(true, &mut out);
        }
        out
    }

    /// Classify an interaction and request the resulting visibility.
    ///
    /// Document pointer-down events are routed to [`Controller::on_outside_pointer_down`].
    pub fn handle_interaction(
        &mut self,
        event: &InteractionEvent<K>,
    ) -> Result<Vec<Command>, TriggerError<C::Error>> {
        let mut out = Vec::new();
        if !self.alive {
            return Ok(out);
        }
        let triggers = self.config.triggers;
        let kind = event.kind;
        match kind {
            EventKind::MouseDown => self.debounce.last_click = Some(event.timestamp),
            EventKind::TouchStart => self.debounce.last_touch = Some(event.timestamp),
            EventKind::Click => {
                if !triggers.handles_click() {
                    return Ok(out);
                }
                if self.debounce.consume_click(event.timestamp) {
                    tracing::debug!(at = event.timestamp, "suppressing click caused by focus");
                    return Ok(out);
                }
                let next = !self.committed;
                let allowed = if next {
                    triggers.should_show_on(kind)
                } else {
                    triggers.should_hide_on(kind)
                };
                if allowed {
                    self.request_into(next, 0, &mut out);
                }
            }
            EventKind::MouseEnter => {
                if triggers.should_show_on(kind) {
                    self.request_into(true, self.config.delay_for(kind), &mut out);
                }
            }
            EventKind::MouseLeave => {
                if triggers.should_hide_on(kind) {
                    self.request_into(false, self.config.delay_for(kind), &mut out);
                }
            }
            EventKind::OverlayMouseEnter => {
                // Moving from the anchor into the overlay keeps it open.
                if triggers.should_show_on(kind) {
                    self.scheduler.cancel(&mut out);
                }
            }
            EventKind::OverlayMouseLeave => {
                if !triggers.should_hide_on(kind) {
                    return Ok(out);
                }
                if let Some(related) = &event.related {
                    let inside = self
                        .containment
                        .overlay_contains(related)
                        .map_err(TriggerError::Containment)?;
                    if inside {
                        return Ok(out);
                    }
                }
                self.request_into(false, self.config.delay_for(kind), &mut out);
            }
            EventKind::Focus => {
                self.scheduler.cancel(&mut out);
                if triggers.should_show_on(kind) {
                    self.debounce.last_focus = Some(event.timestamp);
                    self.request_into(true, self.config.delay_for(kind), &mut out);
                }
            }
            EventKind::Blur => {
                self.scheduler.cancel(&mut out);
                if triggers.should_hide_on(kind) {
                    self.request_into(false, self.config.delay_for(kind), &mut out);
                }
            }
            EventKind::DocumentPointerDown => return self.on_outside_pointer_down(event),
        }
        Ok(out)
    }

    /// Request `target` after `delay_ms`.
    ///
    /// A no-op when `target` is already committed and nothing is pending; otherwise it replaces
    /// any pending request.
    pub fn request_visibility(&mut self, target: bool, delay_ms: Millis) -> Vec<Command> {
        let mut out = Vec::new();
        if self.alive {
            self.request_into(target, delay_ms, &mut out);
        }
        out
    }

    /// Hide immediately, as outside dismissal does.
    pub fn close(&mut self) -> Vec<Command> {
        self.request_visibility(false, 0)
    }

    /// Start the gated commit of `target` now, cancelling any armed timer.
    pub fn commit(&mut self, target: bool) -> Vec<Command> {
        let mut out = Vec::new();
        if self.alive {
            self.commit_into(target, &mut out);
        }
        out
    }

    /// The timer armed under `token` elapsed.
    pub fn timer_fired(&mut self, token: TimerToken) -> Vec<Command> {
        let mut out = Vec::new();
        if !self.alive {
            return out;
        }
        if let Some(target) = self.scheduler.fire(token) {
            self.commit_into(target, &mut out);
        }
        out
    }

    /// The gate for `ticket` settled.
    pub fn resolve_gate(&mut self, ticket: GateTicket, outcome: Result<(), Veto>) -> Vec<Command> {
        let mut out = Vec::new();
        if !self.alive {
            tracing::trace!(ticket = ticket.0, "controller destroyed; dropping gate outcome");
            return out;
        }
        let gate = match self.gate {
            Some(g) if g.ticket == ticket => g,
            _ => {
                tracing::debug!(ticket = ticket.0, "discarding superseded gate outcome");
                return out;
            }
        };
        self.gate = None;
        match outcome {
            Err(veto) => {
                tracing::debug!(visible = gate.target, %veto, "transition vetoed");
                out.push(Command::Vetoed(veto));
            }
            Ok(()) if self.committed == gate.target => {
                tracing::trace!(visible = gate.target, "gate passed but state already settled");
            }
            Ok(()) => self.apply_commit(gate.target, &mut out),
        }
        out
    }

    /// A pointer went down somewhere in the document.
    ///
    /// Only acts while visible. Never delayed.
    pub fn on_outside_pointer_down(
        &mut self,
        event: &InteractionEvent<K>,
    ) -> Result<Vec<Command>, TriggerError<C::Error>> {
        let mut out = Vec::new();
        if !self.alive || !self.committed {
            return Ok(out);
        }
        if !self.config.outside_dismissable() {
            tracing::trace!("mask is not closable; ignoring outside pointer-down");
            return Ok(out);
        }
        if is_outside(&self.containment, &event.target).map_err(TriggerError::Containment)? {
            tracing::debug!(at = event.timestamp, "dismissing on outside pointer-down");
            self.request_into(false, 0, &mut out);
        }
        Ok(out)
    }

    /// The host finished the presentation issued under `token`.
    ///
    /// Only the latest presentation counts; one that was superseded while in progress is ignored.
    /// Emits [`Command::AfterVisibleChange`] when the settled visibility differs from the last
    /// reported value.
    pub fn overlay_settled(&mut self, token: PresentToken) -> Vec<Command> {
        let mut out = Vec::new();
        if !self.alive {
            return out;
        }
        match self.presenting {
            Some((latest, visible)) if latest == token => {
                self.presenting = None;
                if self.last_settled != Some(visible) {
                    self.last_settled = Some(visible);
                    out.push(Command::AfterVisibleChange(visible));
                }
            }
            _ => tracing::debug!(token = token.0, "ignoring superseded presentation"),
        }
        out
    }

    /// Controlled mode: the host sets the committed visibility.
    pub fn set_visible(&mut self, visible: bool) -> Vec<Command> {
        let mut out = Vec::new();
        if self.alive && self.committed != visible {
            self.committed = visible;
            self.apply_presentation(visible, &mut out);
        }
        out
    }

    /// Tear down: cancel the timer, abandon any gate, and release host resources.
    pub fn destroy(&mut self) -> Vec<Command> {
        let mut out = Vec::new();
        if !self.alive {
            return out;
        }
        self.alive = false;
        self.scheduler.cancel(&mut out);
        if let Some(g) = self.gate.take() {
            tracing::trace!(ticket = g.ticket.0, "abandoning gate on destroy");
        }
        if self.outside_subscribed {
            self.outside_subscribed = false;
            out.push(Command::UnsubscribeOutside);
        }
        if self.mounted {
            self.mounted = false;
            out.push(Command::RemoveContainer);
        }
        out
    }

    fn request_into(&mut self, target: bool, delay_ms: Millis, out: &mut Vec<Command>) {
        if target == self.committed && self.pending_target().is_none() {
            tracing::trace!(visible = target, "visibility already settled");
            return;
        }
        match self.scheduler.schedule(target, delay_ms, out) {
            Scheduled::Now(target) => self.commit_into(target, out),
            Scheduled::Armed(_) => {}
        }
    }

    fn commit_into(&mut self, target: bool, out: &mut Vec<Command>) {
        self.scheduler.cancel(out);
        if self.gate.is_some_and(|g| g.target == target) {
            return;
        }
        if target == self.committed {
            if let Some(g) = self.gate.take() {
                tracing::debug!(ticket = g.ticket.0, "superseding in-flight gate");
            }
            return;
        }
        let ticket = GateTicket(self.next_ticket);
        self.next_ticket += 1;
        self.gate = Some(PendingGate { ticket, target });
        tracing::debug!(visible = target, ticket = ticket.0, "requesting visibility gate");
        out.push(Command::RequestGate { ticket, target });
    }

    fn apply_commit(&mut self, target: bool, out: &mut Vec<Command>) {
        out.push(Command::VisibleChanged(target));
        if self.config.controlled {
            // The host decides; `set_visible` applies the change.
            return;
        }
        self.committed = target;
        self.apply_presentation(target, out);
    }

    fn apply_presentation(&mut self, visible: bool, out: &mut Vec<Command>) {
        if visible {
            self.mounted = true;
            let show = Presentation::Show {
                z_index: self.config.z_index,
                container_class: self.config.container_class.clone(),
            };
            self.present(show, out);
            if !self.outside_subscribed {
                self.outside_subscribed = true;
                out.push(Command::SubscribeOutside);
            }
        } else {
            if self.mounted {
                let hide = Presentation::Hide {
                    destroy: self.config.destroy_on_hide,
                };
                self.present(hide, out);
            }
            if self.outside_subscribed {
                self.outside_subscribed = false;
                out.push(Command::UnsubscribeOutside);
            }
        }
    }

    fn present(&mut self, presentation: Presentation, out: &mut Vec<Command>) {
        let token = PresentToken(self.next_present);
        self.next_present += 1;
        self.presenting = Some((token, presentation.is_visible()));
        out.push(Command::Present {
            token,
            presentation,
        });
    }
}
