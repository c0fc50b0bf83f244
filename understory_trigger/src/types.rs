// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for the trigger: interaction events, tokens, and the commands the controller emits.
//!
//! ## Overview
//!
//! An Event Source turns raw host input into [`InteractionEvent`] values and feeds them to the
//! [`Controller`](crate::controller::Controller). The controller never performs side effects itself;
//! every operation returns a list of [`Command`] values the host executes in order.

use alloc::string::String;

use crate::error::Veto;

/// Monotonic timestamp in milliseconds.
pub type Millis = u64;

/// Kinds of normalized interaction the controller understands.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    /// Click on the anchor.
    Click,
    /// Mouse button pressed on the anchor.
    MouseDown,
    /// Touch started on the anchor.
    TouchStart,
    /// Pointer entered the anchor.
    MouseEnter,
    /// Pointer left the anchor.
    MouseLeave,
    /// Pointer entered the overlay.
    OverlayMouseEnter,
    /// Pointer left the overlay.
    OverlayMouseLeave,
    /// Anchor gained focus.
    Focus,
    /// Anchor lost focus.
    Blur,
    /// Pointer pressed anywhere in the document.
    DocumentPointerDown,
}

/// A normalized interaction delivered by the Event Source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionEvent<K> {
    /// What happened.
    pub kind: EventKind,
    /// Node the event was dispatched to.
    pub target: K,
    /// Node the pointer moved to, for leave events (`relatedTarget` in DOM terms).
    pub related: Option<K>,
    /// When it happened.
    pub timestamp: Millis,
}

impl<K> InteractionEvent<K> {
    /// Create an event without a related node.
    pub fn new(kind: EventKind, target: K, timestamp: Millis) -> Self {
        Self {
            kind,
            target,
            related: None,
            timestamp,
        }
    }

    /// Attach the node the pointer moved to.
    #[must_use]
    pub fn with_related(mut self, related: K) -> Self {
        self.related = Some(related);
        self
    }
}

/// Identifies the single armed delay timer.
///
/// A fired timer whose token is no longer current is ignored.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

/// Identifies one `beforeVisibleChange` gate request.
///
/// Only the most recently issued ticket may commit.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct GateTicket(pub u64);

/// Identifies one presentation request.
///
/// Only the most recent presentation can report that it settled.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PresentToken(pub u64);

/// What the host should do with the overlay.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Presentation {
    /// Mount the overlay if needed and make it visible.
    Show {
        /// Stacking override from the configuration.
        z_index: Option<i32>,
        /// Class name for the overlay container, e.g. `understory-popup-container`.
        container_class: String,
    },
    /// Hide the overlay, unmounting its content when `destroy` is set.
    Hide {
        /// Drop the overlay content instead of keeping it mounted.
        destroy: bool,
    },
}

impl Presentation {
    /// Whether this presentation makes the overlay visible.
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Show { .. })
    }
}

/// A side effect requested by the controller.
///
/// Commands are emitted in the order they must be executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Arm the delay timer; call [`Controller::timer_fired`](crate::controller::Controller::timer_fired)
    /// with `token` after `delay_ms`.
    ArmTimer {
        /// Token to report back.
        token: TimerToken,
        /// Delay in milliseconds.
        delay_ms: Millis,
    },
    /// Cancel a previously armed timer.
    CancelTimer {
        /// Token of the timer to cancel.
        token: TimerToken,
    },
    /// Run the `beforeVisibleChange` gate and report the outcome with
    /// [`Controller::resolve_gate`](crate::controller::Controller::resolve_gate).
    RequestGate {
        /// Ticket to report back.
        ticket: GateTicket,
        /// Visibility the gate is asked about.
        target: bool,
    },
    /// The gate rejected a transition; forward to the host's rejection handler.
    Vetoed(Veto),
    /// Notify `onVisibleChange`.
    VisibleChanged(bool),
    /// Present or hide the overlay; report completion with
    /// [`Controller::overlay_settled`](crate::controller::Controller::overlay_settled).
    Present {
        /// Token to report back.
        token: PresentToken,
        /// What to present.
        presentation: Presentation,
    },
    /// Notify `afterVisibleChange`.
    AfterVisibleChange(bool),
    /// Start listening for document pointer-down events.
    SubscribeOutside,
    /// Stop listening for document pointer-down events.
    UnsubscribeOutside,
    /// Tear down the overlay container.
    RemoveContainer,
}
